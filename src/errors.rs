// ❗ Pipeline Errors
// Structural problems (missing files/columns, too little data) are fatal.
// Data-quality problems never end up here: they are counted and recovered locally.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// An expected input file or directory does not exist
    #[error("missing input file: {}", path.display())]
    MissingFile { path: PathBuf },

    /// Required semantic column(s) could not be resolved
    #[error(
        "missing required column(s): {} (available: {})",
        missing.join(", "),
        available.join(", ")
    )]
    MissingColumn {
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Regression attempted with too few points
    #[error("insufficient data for regression: {found} point(s), at least {required} required")]
    InsufficientData { found: usize, required: usize },

    /// Every point shares the same year, so no line can be fitted
    #[error("cannot fit a trend: all {points} points share the same year")]
    DegenerateYears { points: usize },

    /// A distribution could not be constructed for the given parameters
    #[error("statistics error: {0}")]
    Statistics(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl PipelineError {
    pub fn missing_column(missing: &[&str], available: &[String]) -> Self {
        PipelineError::MissingColumn {
            missing: missing.iter().map(|s| s.to_string()).collect(),
            available: available.to_vec(),
        }
    }

    /// True for the errors the pipeline treats as structural (bad inputs, not bad code)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingFile { .. }
                | PipelineError::MissingColumn { .. }
                | PipelineError::InsufficientData { .. }
                | PipelineError::DegenerateYears { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
