// ⚙️ Pipeline Configuration
// Every path, year bound and alias list lives here and is passed to each stage explicitly.

use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Output artifact file names, one per stage
pub mod artifacts {
    pub const COMBINED: &str = "step1_combined_appointments.csv";
    pub const KEY_COLUMNS: &str = "step2_key_columns_data.csv";
    pub const DATA_QUALITY: &str = "step2_data_quality.json";
    pub const REPEATS_MARKED: &str = "step3_repeats_marked.csv";
    pub const EMPLOYEE_COUNTS: &str = "step4_employee_counts.csv";
    pub const REAPPOINTMENT_COUNTS: &str = "step5_reappointment_counts.csv";
    pub const REAPPOINTMENT_RATES: &str = "step6_reappointment_rates.csv";
    pub const YEARLY_MAX: &str = "step7_yearly_max_rates.csv";
    pub const ANNUAL_PROPORTIONS: &str = "step8_annual_proportions.csv";
    pub const REGRESSION_TEXT: &str = "step9_regression_results.txt";
    pub const REGRESSION_JSON: &str = "step9_regression_results.json";
}

// ============================================================================
// COLUMN ALIASES
// ============================================================================

/// Canonical column name -> accepted header aliases (case-insensitive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnAliases {
    pub name: Vec<String>,
    pub position: Vec<String>,
    pub organization: Vec<String>,
    pub reappointed: Vec<String>,
    pub year: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for ColumnAliases {
    fn default() -> Self {
        ColumnAliases {
            name: strings(&["name", "full name", "appointee", "person", "member"]),
            position: strings(&["position", "title", "role", "job"]),
            organization: strings(&[
                "organization",
                "organisation",
                "org",
                "agency",
                "department",
                "body",
                "board",
            ]),
            reappointed: strings(&["reappointed", "reappointment", "re-appointed", "reappt"]),
            year: strings(&["year", "source_year"]),
        }
    }
}

impl ColumnAliases {
    /// (canonical, aliases) pairs in resolution order
    pub fn entries(&self) -> [(&'static str, &[String]); 5] {
        [
            ("name", &self.name),
            ("position", &self.position),
            ("organization", &self.organization),
            ("reappointed", &self.reappointed),
            ("year", &self.year),
        ]
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the yearly source CSVs
    pub input_dir: PathBuf,

    /// Directory every stage artifact is written to
    pub output_dir: PathBuf,

    /// First year (inclusive)
    pub start_year: i32,

    /// Last year (inclusive)
    pub end_year: i32,

    /// Yearly file name, `{year}` is substituted
    pub file_pattern: String,

    /// Treat a missing yearly file as fatal instead of skipping it
    pub require_all_years: bool,

    /// p-value threshold for declaring a trend significant
    pub significance_level: f64,

    /// |standardized residual| above which a year is an outlier
    pub outlier_threshold: f64,

    /// Minimum annual points for the regression
    pub min_regression_points: usize,

    pub columns: ColumnAliases,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input_dir: PathBuf::from("raw_data"),
            output_dir: PathBuf::from("analysis_data"),
            start_year: 2013,
            end_year: 2024,
            file_pattern: "appointments_{year}.csv".to_string(),
            require_all_years: false,
            significance_level: 0.05,
            outlier_threshold: 2.0,
            min_regression_points: 3,
            columns: ColumnAliases::default(),
        }
    }
}

impl PipelineConfig {
    /// Load config from a TOML file; absent keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        let config: PipelineConfig = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_year > self.end_year {
            return Err(PipelineError::Config(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }

        if !self.file_pattern.contains("{year}") {
            return Err(PipelineError::Config(format!(
                "file_pattern '{}' must contain {{year}}",
                self.file_pattern
            )));
        }

        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(PipelineError::Config(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            )));
        }

        if self.outlier_threshold <= 0.0 {
            return Err(PipelineError::Config(format!(
                "outlier_threshold must be positive, got {}",
                self.outlier_threshold
            )));
        }

        if self.min_regression_points < 3 {
            return Err(PipelineError::Config(format!(
                "min_regression_points must be at least 3, got {}",
                self.min_regression_points
            )));
        }

        Ok(())
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start_year..=self.end_year
    }

    pub fn input_path(&self, year: i32) -> PathBuf {
        self.input_dir
            .join(self.file_pattern.replace("{year}", &year.to_string()))
    }

    pub fn output_path(&self, artifact: &str) -> PathBuf {
        self.output_dir.join(artifact)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.years().count(), 12);
        assert_eq!(
            config.input_path(2015),
            PathBuf::from("raw_data/appointments_2015.csv")
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: PipelineConfig = toml::from_str(
            r#"
start_year = 2020
end_year = 2022

[columns]
organization = ["ministry"]
"#,
        )
        .unwrap();

        assert_eq!(config.start_year, 2020);
        assert_eq!(config.output_dir, PathBuf::from("analysis_data"));
        assert_eq!(config.columns.organization, vec!["ministry".to_string()]);
        assert_eq!(config.columns.name, ColumnAliases::default().name);
    }

    #[test]
    fn test_reversed_years_rejected() {
        let config = PipelineConfig {
            start_year: 2024,
            end_year: 2013,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_pattern_without_placeholder_rejected() {
        let config = PipelineConfig {
            file_pattern: "appointments.csv".to_string(),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "input_dir = \"data/in\"\nrequire_all_years = true").unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.input_dir, PathBuf::from("data/in"));
        assert!(config.require_all_years);
    }

    #[test]
    fn test_from_missing_file() {
        let result = PipelineConfig::from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(PipelineError::MissingFile { .. })));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = PipelineConfig::default();
        let parsed: PipelineConfig = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
