// 📂 Loader - Yearly CSV files → one combined table
// Stage 1: read each year's appointments file, tag rows with the year, concatenate.

use crate::columns::ColumnMatcher;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

pub const YEAR_COLUMN: &str = "year";

// ============================================================================
// RAW TABLE
// ============================================================================

/// Untyped table: every cell is kept as text exactly as read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        RawTable {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Read a CSV file as text cells; invalid UTF-8 is replaced, not rejected
    pub fn read_csv(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .byte_headers()?
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut table = RawTable::new(headers);
        let width = table.headers.len();

        for result in reader.byte_records() {
            let record = result?;
            let mut row: Vec<String> = record
                .iter()
                .take(width)
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
                .collect();
            row.resize(width, String::new());
            table.rows.push(row);
        }

        Ok(table)
    }
}

// ============================================================================
// COMBINER
// ============================================================================

/// Per-file outcome of a combine run
#[derive(Debug, Clone, PartialEq)]
pub struct CombineSummary {
    pub rows_per_year: Vec<(i32, usize)>,
    pub missing_years: Vec<i32>,
}

pub struct Combiner<'a> {
    config: &'a PipelineConfig,
    matcher: ColumnMatcher,
}

impl<'a> Combiner<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Combiner {
            config,
            matcher: ColumnMatcher::new(&config.columns),
        }
    }

    /// Load every configured year and concatenate into one table.
    ///
    /// Each file's aliased headers are renamed to their canonical names first,
    /// so `Org` in one year and `organization` in another land in one column.
    /// Headers are then unioned in order of first appearance. A `year` column
    /// is appended when no file carries one; blank year cells get the file's year.
    pub fn combine(&self) -> Result<(RawTable, CombineSummary)> {
        let mut loaded: Vec<(i32, RawTable)> = Vec::new();
        let mut missing_years = Vec::new();

        for year in self.config.years() {
            let path = self.config.input_path(year);
            match RawTable::read_csv(&path) {
                Ok(mut table) => {
                    canonicalize_headers(&mut table, &self.matcher);
                    println!("✓ {}: {} rows", path.display(), table.len());
                    loaded.push((year, table));
                }
                Err(PipelineError::MissingFile { path }) if !self.config.require_all_years => {
                    tracing::warn!(year, path = %path.display(), "yearly file not found, skipping");
                    println!("⚠️  {} not found, skipping {}", path.display(), year);
                    missing_years.push(year);
                }
                Err(e) => return Err(e),
            }
        }

        if loaded.is_empty() {
            return Err(PipelineError::MissingFile {
                path: self.config.input_dir.clone(),
            });
        }

        let combined = concat_tables(&loaded);
        let summary = CombineSummary {
            rows_per_year: loaded.iter().map(|(y, t)| (*y, t.len())).collect(),
            missing_years,
        };

        Ok((combined, summary))
    }
}

fn canonicalize_headers(table: &mut RawTable, matcher: &ColumnMatcher) {
    let mapping = matcher.resolve(&table.headers);
    for m in mapping.iter() {
        if table.headers[m.index] != m.canonical {
            tracing::debug!(header = %m.header, canonical = m.canonical, "header renamed");
            table.headers[m.index] = m.canonical.to_string();
        }
    }
}

fn concat_tables(tables: &[(i32, RawTable)]) -> RawTable {
    let mut headers: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (_, table) in tables {
        for header in &table.headers {
            if !positions.contains_key(header) {
                positions.insert(header.clone(), headers.len());
                headers.push(header.clone());
            }
        }
    }

    let year_index = match positions.get(YEAR_COLUMN) {
        Some(&i) => i,
        None => {
            headers.push(YEAR_COLUMN.to_string());
            headers.len() - 1
        }
    };

    let mut combined = RawTable::new(headers);
    let width = combined.headers.len();

    for (year, table) in tables {
        let targets: Vec<usize> = table.headers.iter().map(|h| positions[h]).collect();

        for row in &table.rows {
            let mut out = vec![String::new(); width];
            for (cell, &target) in row.iter().zip(&targets) {
                // First occurrence wins when a file repeats a header
                if out[target].is_empty() {
                    out[target] = cell.clone();
                }
            }
            if out[year_index].trim().is_empty() {
                out[year_index] = year.to_string();
            }
            combined.rows.push(out);
        }
    }

    combined
}
