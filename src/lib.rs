// Reappointment Trends - Core Library
// Exposes the pipeline stages for the CLI and integration tests

pub mod errors;
pub mod config;
pub mod columns;        // Column alias resolution
pub mod loader;         // Stage 1: combine yearly files
pub mod records;        // Stage 2: key columns
pub mod data_quality;   // Stage 2 report
pub mod reappointment;  // Stage 3: mark repeats
pub mod aggregation;    // Stages 4-6: org/year counts and rates
pub mod yearly_max;     // Stage 7
pub mod annual;         // Stage 8
pub mod regression;     // Stage 9
pub mod report;
pub mod output;
pub mod pipeline;

// Re-export commonly used types
pub use errors::{PipelineError, Result};
pub use config::{artifacts, ColumnAliases, PipelineConfig};
pub use columns::{ColumnMapping, ColumnMatch, ColumnMatcher, MatchKind};
pub use loader::{CombineSummary, Combiner, RawTable};
pub use records::{AppointmentRecord, ColumnSelector, SelectionStats};
pub use data_quality::{DataQualityEngine, QualityReport, Severity, ValidationResult};
pub use reappointment::{GroupKey, MarkingSummary, ReappointmentMarker};
pub use aggregation::{OrgYearAggregator, OrgYearCount, OrgYearRate, OrgYearReappointments};
pub use yearly_max::{YearlyMax, YearlyMaxFinder};
pub use annual::{AnnualProportion, AnnualProportionCalculator};
pub use regression::{ConfidenceInterval, RegressionResult, Residual, TrendDirection, TrendRegressor};
pub use pipeline::{Pipeline, RunSummary, Stage};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
