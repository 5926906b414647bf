// 🧾 Appointment Records - Stage 2 column selection
// Projects the combined table onto the five semantic columns and coerces values.

use crate::columns::ColumnMatcher;
use crate::config::ColumnAliases;
use crate::errors::Result;
use crate::loader::RawTable;
use crate::output;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "position", "organization", "year"];

// ============================================================================
// APPOINTMENT RECORD
// ============================================================================

/// One person holding a position at an organization in a given year
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub name: String,
    pub position: String,
    pub organization: String,
    pub reappointed: bool,
    pub year: i32,
}

impl AppointmentRecord {
    pub fn new(name: &str, position: &str, organization: &str, year: i32, reappointed: bool) -> Self {
        AppointmentRecord {
            name: name.to_string(),
            position: position.to_string(),
            organization: organization.to_string(),
            reappointed,
            year,
        }
    }
}

/// Read a key-columns style table, failing fast when a canonical column is absent
pub fn read_records(path: &Path) -> Result<Vec<AppointmentRecord>> {
    let mut required = REQUIRED_COLUMNS.to_vec();
    required.push("reappointed");
    output::read_rows(path, &required)
}

// ============================================================================
// VALUE COERCION
// ============================================================================

/// How a raw reappointed cell was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagValue {
    True,
    False,
    Unrecognized,
}

pub fn parse_flag(raw: &str) -> FlagValue {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" | "t" | "1.0" => FlagValue::True,
        "false" | "no" | "n" | "0" | "f" | "0.0" | "" | "nan" => FlagValue::False,
        _ => FlagValue::Unrecognized,
    }
}

/// Integer years, or float text with no fractional part ("2013.0")
pub fn parse_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Ok(year) = trimmed.parse::<i32>() {
        return Some(year);
    }

    let value = trimmed.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 && value.abs() < i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

// ============================================================================
// COLUMN SELECTOR
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionStats {
    pub input_rows: usize,
    pub dropped_bad_year: usize,
    pub unrecognized_flags: usize,
    /// Source header each canonical column was read from
    pub resolved: BTreeMap<String, String>,
    pub reappointed_column_missing: bool,
}

pub struct ColumnSelector {
    matcher: ColumnMatcher,
}

impl ColumnSelector {
    pub fn new(aliases: &ColumnAliases) -> Self {
        ColumnSelector {
            matcher: ColumnMatcher::new(aliases),
        }
    }

    /// Extract the semantic columns. Missing required columns are fatal; rows
    /// with an unparseable year are dropped and counted.
    pub fn select(&self, table: &RawTable) -> Result<(Vec<AppointmentRecord>, SelectionStats)> {
        let mapping = self.matcher.resolve(&table.headers);
        mapping.require(&REQUIRED_COLUMNS, &table.headers)?;

        let mut stats = SelectionStats {
            input_rows: table.len(),
            ..SelectionStats::default()
        };
        for canonical in REQUIRED_COLUMNS.iter().chain(["reappointed"].iter()) {
            if let Some(m) = mapping.get(canonical) {
                stats.resolved.insert(canonical.to_string(), m.header.clone());
            }
        }

        let name_idx = mapping.index_of("name").unwrap_or_default();
        let position_idx = mapping.index_of("position").unwrap_or_default();
        let org_idx = mapping.index_of("organization").unwrap_or_default();
        let year_idx = mapping.index_of("year").unwrap_or_default();
        let flag_idx = mapping.index_of("reappointed");

        if flag_idx.is_none() {
            stats.reappointed_column_missing = true;
            tracing::warn!("no reappointed column found; all flags start false");
        }

        let cell = |row: &Vec<String>, idx: usize| row.get(idx).map(|s| s.trim()).unwrap_or("").to_string();

        let mut records = Vec::with_capacity(table.len());
        for row in &table.rows {
            let year = match parse_year(&cell(row, year_idx)) {
                Some(year) => year,
                None => {
                    stats.dropped_bad_year += 1;
                    continue;
                }
            };

            let reappointed = match flag_idx.map(|i| parse_flag(&cell(row, i))) {
                Some(FlagValue::True) => true,
                Some(FlagValue::Unrecognized) => {
                    stats.unrecognized_flags += 1;
                    false
                }
                Some(FlagValue::False) | None => false,
            };

            records.push(AppointmentRecord {
                name: cell(row, name_idx),
                position: cell(row, position_idx),
                organization: cell(row, org_idx),
                reappointed,
                year,
            });
        }

        if stats.dropped_bad_year > 0 {
            tracing::warn!(dropped = stats.dropped_bad_year, "rows dropped: unparseable year");
            println!("⚠️  Dropped {} row(s) with an unparseable year", stats.dropped_bad_year);
        }

        Ok((records, stats))
    }
}
