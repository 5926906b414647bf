// ✅ Data Quality Engine - checks over the selected appointment records
// Runs after column selection. Nothing here aborts the pipeline: findings are
// reported with a severity and written next to the key-columns table.

use crate::records::{AppointmentRecord, SelectionStats};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub rule_name: String,
    pub field: String,
    pub message: String,
    /// Rows the rule failed on (0 when passed)
    pub affected_rows: usize,
    pub severity: Severity,
}

impl ValidationResult {
    pub fn pass(rule_name: &str, field: &str, message: &str) -> Self {
        ValidationResult {
            passed: true,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            affected_rows: 0,
            severity: Severity::Info,
        }
    }

    pub fn fail(
        rule_name: &str,
        field: &str,
        message: &str,
        affected_rows: usize,
        severity: Severity,
    ) -> Self {
        ValidationResult {
            passed: false,
            rule_name: rule_name.to_string(),
            field: field.to_string(),
            message: message.to_string(),
            affected_rows,
            severity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Rows were lost or cannot be grouped
    Warning,  // Data is questionable or incomplete
    Info,     // Data is valid
}

// ============================================================================
// QUALITY REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub input_rows: usize,
    pub rows_per_year: BTreeMap<i32, usize>,
    pub validations: Vec<ValidationResult>,
    pub passed_count: usize,
    pub failed_count: usize,
    /// Share of rules passed (0.0 - 1.0)
    pub overall_quality: f64,
}

impl QualityReport {
    pub fn summary(&self) -> String {
        format!(
            "Quality: {:.1}%, {} of {} rows kept, {} failed check(s) ({} critical)",
            self.overall_quality * 100.0,
            self.total_rows,
            self.input_rows,
            self.failed_count,
            self.issues_with(Severity::Critical)
        )
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues_with(Severity::Critical) > 0
    }

    fn issues_with(&self, severity: Severity) -> usize {
        self.validations
            .iter()
            .filter(|v| !v.passed && v.severity == severity)
            .count()
    }
}

// ============================================================================
// DATA QUALITY ENGINE
// ============================================================================

pub struct DataQualityEngine {
    /// Expected year range (inclusive)
    start_year: i32,
    end_year: i32,
}

impl DataQualityEngine {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        DataQualityEngine {
            start_year,
            end_year,
        }
    }

    pub fn validate(&self, records: &[AppointmentRecord], stats: &SelectionStats) -> QualityReport {
        let mut rows_per_year = BTreeMap::new();
        for record in records {
            *rows_per_year.entry(record.year).or_insert(0) += 1;
        }

        let validations = vec![
            self.validate_not_blank(records, "name", |r| &r.name),
            self.validate_not_blank(records, "position", |r| &r.position),
            self.validate_not_blank(records, "organization", |r| &r.organization),
            self.validate_year_range(records),
            self.validate_year_coverage(&rows_per_year),
            self.validate_dropped_rows(stats),
            self.validate_flags(stats),
            self.validate_duplicates(records),
        ];

        let passed_count = validations.iter().filter(|v| v.passed).count();
        let failed_count = validations.len() - passed_count;

        QualityReport {
            total_rows: records.len(),
            input_rows: stats.input_rows,
            rows_per_year,
            overall_quality: passed_count as f64 / validations.len() as f64,
            validations,
            passed_count,
            failed_count,
        }
    }

    // ========================================================================
    // VALIDATION RULES
    // ========================================================================

    fn validate_not_blank<F>(&self, records: &[AppointmentRecord], field: &str, get: F) -> ValidationResult
    where
        F: Fn(&AppointmentRecord) -> &String,
    {
        let blank = records.iter().filter(|r| get(r).trim().is_empty()).count();
        let rule = format!("{}_not_blank", field);

        if blank == 0 {
            ValidationResult::pass(&rule, field, &format!("Every row has a {}", field))
        } else {
            // Blank identity fields keep the row out of reappointment marking
            ValidationResult::fail(
                &rule,
                field,
                &format!("{} row(s) have a blank {}", blank, field),
                blank,
                Severity::Warning,
            )
        }
    }

    fn validate_year_range(&self, records: &[AppointmentRecord]) -> ValidationResult {
        let outside = records
            .iter()
            .filter(|r| r.year < self.start_year || r.year > self.end_year)
            .count();

        if outside == 0 {
            ValidationResult::pass("year_in_range", "year", "All years inside the configured range")
        } else {
            ValidationResult::fail(
                "year_in_range",
                "year",
                &format!(
                    "{} row(s) fall outside {}-{}",
                    outside, self.start_year, self.end_year
                ),
                outside,
                Severity::Warning,
            )
        }
    }

    fn validate_year_coverage(&self, rows_per_year: &BTreeMap<i32, usize>) -> ValidationResult {
        let missing: Vec<String> = (self.start_year..=self.end_year)
            .filter(|y| !rows_per_year.contains_key(y))
            .map(|y| y.to_string())
            .collect();

        if missing.is_empty() {
            ValidationResult::pass("year_coverage", "year", "Every configured year has rows")
        } else {
            ValidationResult::fail(
                "year_coverage",
                "year",
                &format!("No rows for: {}", missing.join(", ")),
                0,
                Severity::Warning,
            )
        }
    }

    fn validate_dropped_rows(&self, stats: &SelectionStats) -> ValidationResult {
        if stats.dropped_bad_year == 0 {
            ValidationResult::pass("year_parseable", "year", "Every year value parsed")
        } else {
            ValidationResult::fail(
                "year_parseable",
                "year",
                &format!("{} row(s) dropped: unparseable year", stats.dropped_bad_year),
                stats.dropped_bad_year,
                Severity::Critical,
            )
        }
    }

    fn validate_flags(&self, stats: &SelectionStats) -> ValidationResult {
        if stats.reappointed_column_missing {
            return ValidationResult::fail(
                "reappointed_present",
                "reappointed",
                "No reappointed column; flags come from repeat detection only",
                0,
                Severity::Warning,
            );
        }

        if stats.unrecognized_flags == 0 {
            ValidationResult::pass("reappointed_recognized", "reappointed", "All flags recognized")
        } else {
            ValidationResult::fail(
                "reappointed_recognized",
                "reappointed",
                &format!(
                    "{} unrecognized reappointed value(s) read as false",
                    stats.unrecognized_flags
                ),
                stats.unrecognized_flags,
                Severity::Warning,
            )
        }
    }

    fn validate_duplicates(&self, records: &[AppointmentRecord]) -> ValidationResult {
        let mut seen = HashSet::new();
        let duplicates = records.iter().filter(|r| !seen.insert(*r)).count();

        if duplicates == 0 {
            ValidationResult::pass("no_exact_duplicates", "*", "No exact duplicate rows")
        } else {
            ValidationResult::fail(
                "no_exact_duplicates",
                "*",
                &format!("{} exact duplicate row(s)", duplicates),
                duplicates,
                Severity::Info,
            )
        }
    }
}
