// 🔗 Pipeline - nine stages, one config
// Each stage takes and returns explicit tables and writes its artifact once the
// full result is in memory. `run_stage` replays a single stage from the previous
// stage's artifact on disk.

use crate::aggregation::{OrgYearAggregator, OrgYearCount, OrgYearRate, OrgYearReappointments};
use crate::annual::{AnnualProportion, AnnualProportionCalculator};
use crate::config::{artifacts, PipelineConfig};
use crate::data_quality::{DataQualityEngine, QualityReport};
use crate::errors::Result;
use crate::loader::{Combiner, RawTable};
use crate::output;
use crate::reappointment::{MarkingSummary, ReappointmentMarker};
use crate::records::{read_records, AppointmentRecord, ColumnSelector};
use crate::regression::{RegressionResult, TrendRegressor};
use crate::report::{self, RegressionDocument};
use crate::yearly_max::{YearlyMax, YearlyMaxFinder};
use chrono::Utc;
use std::fmt;

// ============================================================================
// STAGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Stage {
    Combine,
    Select,
    Mark,
    Counts,
    Reappointments,
    Rates,
    YearlyMax,
    Annual,
    Regress,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Combine,
        Stage::Select,
        Stage::Mark,
        Stage::Counts,
        Stage::Reappointments,
        Stage::Rates,
        Stage::YearlyMax,
        Stage::Annual,
        Stage::Regress,
    ];

    pub fn number(&self) -> usize {
        Stage::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Combine => "Combine yearly files",
            Stage::Select => "Select key columns",
            Stage::Mark => "Mark reappointments",
            Stage::Counts => "Count appointments per organization and year",
            Stage::Reappointments => "Count reappointments per organization and year",
            Stage::Rates => "Compute reappointment rates",
            Stage::YearlyMax => "Find highest-rate organization per year",
            Stage::Annual => "Compute annual proportions",
            Stage::Regress => "Fit trend regression",
        }
    }

    /// Artifact the stage writes
    pub fn artifact(&self) -> &'static str {
        match self {
            Stage::Combine => artifacts::COMBINED,
            Stage::Select => artifacts::KEY_COLUMNS,
            Stage::Mark => artifacts::REPEATS_MARKED,
            Stage::Counts => artifacts::EMPLOYEE_COUNTS,
            Stage::Reappointments => artifacts::REAPPOINTMENT_COUNTS,
            Stage::Rates => artifacts::REAPPOINTMENT_RATES,
            Stage::YearlyMax => artifacts::YEARLY_MAX,
            Stage::Annual => artifacts::ANNUAL_PROPORTIONS,
            Stage::Regress => artifacts::REGRESSION_TEXT,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {}: {}", self.number(), self.title())
    }
}

const RATE_COLUMNS: [&str; 5] = ["organization", "year", "total_appointments", "reappointments", "rate"];
const ANNUAL_COLUMNS: [&str; 4] = ["year", "total_appointments", "total_reappointments", "proportion"];

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub combined_rows: usize,
    pub quality: QualityReport,
    pub marking: MarkingSummary,
    pub rates: Vec<OrgYearRate>,
    pub yearly_max: Vec<YearlyMax>,
    pub annual: Vec<AnnualProportion>,
    pub regression: RegressionResult,
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Pipeline { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn banner(stage: Stage) {
        println!("\n{}", stage);
        println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    fn written(&self, artifact: &str, rows: usize) {
        println!("✓ Wrote {} ({} rows)", self.config.output_path(artifact).display(), rows);
    }

    /// Stage 1
    pub fn combine(&self) -> Result<RawTable> {
        Self::banner(Stage::Combine);
        let (table, summary) = Combiner::new(&self.config).combine()?;

        output::write_table(&self.config.output_path(artifacts::COMBINED), &table)?;
        println!(
            "✓ Combined {} rows from {} file(s)",
            table.len(),
            summary.rows_per_year.len()
        );
        self.written(artifacts::COMBINED, table.len());

        Ok(table)
    }

    /// Stage 2, plus the data quality report over its output
    pub fn select(&self, combined: &RawTable) -> Result<(Vec<AppointmentRecord>, QualityReport)> {
        Self::banner(Stage::Select);
        let selector = ColumnSelector::new(&self.config.columns);
        let (records, stats) = selector.select(combined)?;

        for (canonical, header) in &stats.resolved {
            println!("  {:<13} ← {}", canonical, header);
        }

        let quality = DataQualityEngine::new(self.config.start_year, self.config.end_year)
            .validate(&records, &stats);
        for failed in quality.validations.iter().filter(|v| !v.passed) {
            tracing::warn!(rule = %failed.rule_name, "{}", failed.message);
        }
        println!("✓ {}", quality.summary());

        output::write_rows(&self.config.output_path(artifacts::KEY_COLUMNS), &records)?;
        output::write_json(&self.config.output_path(artifacts::DATA_QUALITY), &quality)?;
        self.written(artifacts::KEY_COLUMNS, records.len());

        Ok((records, quality))
    }

    /// Stage 3
    pub fn mark(&self, records: &[AppointmentRecord]) -> Result<(Vec<AppointmentRecord>, MarkingSummary)> {
        Self::banner(Stage::Mark);
        let (marked, summary) = ReappointmentMarker::new().mark(records);

        println!(
            "✓ {} groups, {} with repeats; {} rows newly flagged ({} → {} reappointments)",
            summary.groups,
            summary.repeat_groups,
            summary.newly_flagged,
            summary.flagged_before,
            summary.flagged_after
        );
        if summary.unidentifiable_rows > 0 {
            println!(
                "⚠️  {} row(s) with a blank name, position or organization left unmarked",
                summary.unidentifiable_rows
            );
        }

        output::write_rows(&self.config.output_path(artifacts::REPEATS_MARKED), &marked)?;
        self.written(artifacts::REPEATS_MARKED, marked.len());

        Ok((marked, summary))
    }

    /// Stage 4
    pub fn counts(&self, marked: &[AppointmentRecord]) -> Result<Vec<OrgYearCount>> {
        Self::banner(Stage::Counts);
        let totals = OrgYearAggregator::count_appointments(marked);

        output::write_rows(&self.config.output_path(artifacts::EMPLOYEE_COUNTS), &totals)?;
        self.written(artifacts::EMPLOYEE_COUNTS, totals.len());

        Ok(totals)
    }

    /// Stage 5
    pub fn reappointment_counts(&self, marked: &[AppointmentRecord]) -> Result<Vec<OrgYearReappointments>> {
        Self::banner(Stage::Reappointments);
        let counts = OrgYearAggregator::count_reappointments(marked);

        output::write_rows(&self.config.output_path(artifacts::REAPPOINTMENT_COUNTS), &counts)?;
        self.written(artifacts::REAPPOINTMENT_COUNTS, counts.len());

        Ok(counts)
    }

    /// Stage 6
    pub fn rates(
        &self,
        totals: &[OrgYearCount],
        reappointments: &[OrgYearReappointments],
    ) -> Result<Vec<OrgYearRate>> {
        Self::banner(Stage::Rates);
        let rates = OrgYearAggregator::rates(totals, reappointments);

        output::write_rows(&self.config.output_path(artifacts::REAPPOINTMENT_RATES), &rates)?;
        self.written(artifacts::REAPPOINTMENT_RATES, rates.len());

        Ok(rates)
    }

    /// Stage 7
    pub fn yearly_max(&self, rates: &[OrgYearRate]) -> Result<Vec<YearlyMax>> {
        Self::banner(Stage::YearlyMax);
        let winners = YearlyMaxFinder::find(rates);

        for w in &winners {
            println!("  {}  {:<40} {:>6.1}%", w.year, w.organization, w.rate * 100.0);
        }

        output::write_rows(&self.config.output_path(artifacts::YEARLY_MAX), &winners)?;
        self.written(artifacts::YEARLY_MAX, winners.len());

        Ok(winners)
    }

    /// Stage 8
    pub fn annual(&self, marked: &[AppointmentRecord]) -> Result<Vec<AnnualProportion>> {
        Self::banner(Stage::Annual);
        let annual = AnnualProportionCalculator::calculate_in_range(
            marked,
            self.config.start_year,
            self.config.end_year,
        );

        let missing = AnnualProportionCalculator::missing_years(
            &annual,
            self.config.start_year,
            self.config.end_year,
        );
        if !missing.is_empty() {
            tracing::warn!(?missing, "years without appointments are absent from the proportions");
            println!("⚠️  No appointments for year(s): {:?}", missing);
        }

        output::write_rows(&self.config.output_path(artifacts::ANNUAL_PROPORTIONS), &annual)?;
        self.written(artifacts::ANNUAL_PROPORTIONS, annual.len());

        Ok(annual)
    }

    /// Stage 9
    pub fn regress(&self, annual: &[AnnualProportion]) -> Result<RegressionResult> {
        Self::banner(Stage::Regress);
        let result = TrendRegressor::from_config(&self.config).fit_annual(annual)?;

        let generated_at = Utc::now();
        let text = report::render_text(annual, &result, generated_at);
        let document = RegressionDocument {
            generated_at,
            annual_proportions: annual,
            regression: &result,
            conclusion: report::conclusion(&result),
        };

        output::write_atomic(&self.config.output_path(artifacts::REGRESSION_TEXT), text.as_bytes())?;
        output::write_json(&self.config.output_path(artifacts::REGRESSION_JSON), &document)?;

        println!("✓ slope {:.6}, R² {:.4}, p {:.4}", result.slope, result.r_squared, result.p_value);
        println!("✓ {}", document.conclusion);
        println!(
            "✓ Wrote {}",
            self.config.output_path(artifacts::REGRESSION_TEXT).display()
        );

        Ok(result)
    }

    /// All nine stages in order
    pub fn run(&self) -> Result<RunSummary> {
        let combined = self.combine()?;
        let (records, quality) = self.select(&combined)?;
        let (marked, marking) = self.mark(&records)?;
        let totals = self.counts(&marked)?;
        let reappointments = self.reappointment_counts(&marked)?;
        let rates = self.rates(&totals, &reappointments)?;
        let yearly_max = self.yearly_max(&rates)?;
        let annual = self.annual(&marked)?;
        let regression = self.regress(&annual)?;

        Ok(RunSummary {
            combined_rows: combined.len(),
            quality,
            marking,
            rates,
            yearly_max,
            annual,
            regression,
        })
    }

    /// Run one stage from the artifacts of the stages before it
    pub fn run_stage(&self, stage: Stage) -> Result<()> {
        let path = |artifact: &str| self.config.output_path(artifact);

        match stage {
            Stage::Combine => {
                self.combine()?;
            }
            Stage::Select => {
                let combined = RawTable::read_csv(&path(artifacts::COMBINED))?;
                self.select(&combined)?;
            }
            Stage::Mark => {
                let records = read_records(&path(artifacts::KEY_COLUMNS))?;
                self.mark(&records)?;
            }
            Stage::Counts => {
                let marked = read_records(&path(artifacts::REPEATS_MARKED))?;
                self.counts(&marked)?;
            }
            Stage::Reappointments => {
                let marked = read_records(&path(artifacts::REPEATS_MARKED))?;
                self.reappointment_counts(&marked)?;
            }
            Stage::Rates => {
                let totals: Vec<OrgYearCount> = output::read_rows(
                    &path(artifacts::EMPLOYEE_COUNTS),
                    &["organization", "year", "total_appointments"],
                )?;
                let reappointments: Vec<OrgYearReappointments> = output::read_rows(
                    &path(artifacts::REAPPOINTMENT_COUNTS),
                    &["organization", "year", "reappointments"],
                )?;
                self.rates(&totals, &reappointments)?;
            }
            Stage::YearlyMax => {
                let rates: Vec<OrgYearRate> =
                    output::read_rows(&path(artifacts::REAPPOINTMENT_RATES), &RATE_COLUMNS)?;
                self.yearly_max(&rates)?;
            }
            Stage::Annual => {
                let marked = read_records(&path(artifacts::REPEATS_MARKED))?;
                self.annual(&marked)?;
            }
            Stage::Regress => {
                let annual: Vec<AnnualProportion> =
                    output::read_rows(&path(artifacts::ANNUAL_PROPORTIONS), &ANNUAL_COLUMNS)?;
                self.regress(&annual)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PipelineError;

    #[test]
    fn test_stage_numbers_and_artifacts() {
        assert_eq!(Stage::Combine.number(), 1);
        assert_eq!(Stage::Regress.number(), 9);
        assert_eq!(Stage::Rates.artifact(), "step6_reappointment_rates.csv");
        assert_eq!(Stage::YearlyMax.to_string(), "Step 7: Find highest-rate organization per year");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = PipelineConfig {
            start_year: 2030,
            ..PipelineConfig::default()
        };
        assert!(matches!(Pipeline::new(config), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_stage_without_input_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            output_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        let pipeline = Pipeline::new(config).unwrap();

        let err = pipeline.run_stage(Stage::Mark).unwrap_err();

        assert!(matches!(err, PipelineError::MissingFile { .. }));
        assert!(!dir.path().join(artifacts::REPEATS_MARKED).exists());
    }

    #[test]
    fn test_regress_stage_needs_three_years() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            output_dir: dir.path().to_path_buf(),
            ..PipelineConfig::default()
        };
        std::fs::write(
            dir.path().join(artifacts::ANNUAL_PROPORTIONS),
            "year,total_appointments,total_reappointments,proportion\n2013,10,1,0.1\n2014,10,2,0.2\n",
        )
        .unwrap();

        let err = Pipeline::new(config).unwrap().run_stage(Stage::Regress).unwrap_err();

        assert!(matches!(err, PipelineError::InsufficientData { found: 2, .. }));
        assert!(!dir.path().join(artifacts::REGRESSION_TEXT).exists());
    }
}
