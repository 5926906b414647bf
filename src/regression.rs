//! Trend regression (stage 9)
//!
//! Ordinary least squares of the annual reappointment proportion against year,
//! with the usual inference and residual diagnostics:
//!
//! - slope, intercept, Pearson r and R²
//! - two-sided p-value for slope = 0 from Student's t with n - 2 degrees of freedom (statrs)
//! - standard error of the slope and its 95% confidence interval
//! - Durbin-Watson over year-ordered residuals
//! - outlier years by standardized residual

use crate::annual::AnnualProportion;
use crate::config::PipelineConfig;
use crate::errors::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

/// Residual scale below which a fit is treated as exact. Proportions live in
/// [0, 1], so anything smaller is floating-point noise.
const RESIDUAL_EPSILON: f64 = 1e-12;

const CONFIDENCE_LEVEL: f64 = 0.95;

// ============================================================================
// RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Residual {
    pub year: i32,
    pub observed: f64,
    pub fitted: f64,
    pub residual: f64,
    pub standardized: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r: f64,
    pub r_squared: f64,
    pub std_err: f64,
    pub t_statistic: f64,
    pub p_value: f64,
    pub confidence_interval: ConfidenceInterval,
    /// None when the residuals are all zero
    pub durbin_watson: Option<f64>,
    pub residuals: Vec<Residual>,
    pub outlier_years: Vec<i32>,
    pub direction: TrendDirection,
    pub significant: bool,
    pub significance_level: f64,
}

impl RegressionResult {
    pub fn predict(&self, year: i32) -> f64 {
        self.slope * year as f64 + self.intercept
    }

    /// Slope expressed in percentage points per year
    pub fn annual_change_pp(&self) -> f64 {
        self.slope * 100.0
    }

    pub fn autocorrelation(&self) -> &'static str {
        match self.durbin_watson {
            None => "undefined (exact fit)",
            Some(dw) if dw < 1.5 => "positive autocorrelation",
            Some(dw) if dw > 2.5 => "negative autocorrelation",
            Some(_) => "no significant autocorrelation",
        }
    }
}

// ============================================================================
// TREND REGRESSOR
// ============================================================================

pub struct TrendRegressor {
    /// p-value threshold for significance (default: 0.05)
    pub significance_level: f64,

    /// |standardized residual| above which a year is an outlier (default: 2.0)
    pub outlier_threshold: f64,

    /// Minimum points for a fit (default: 3)
    pub min_points: usize,
}

impl TrendRegressor {
    pub fn new() -> Self {
        TrendRegressor {
            significance_level: 0.05,
            outlier_threshold: 2.0,
            min_points: 3,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        TrendRegressor {
            significance_level: config.significance_level,
            outlier_threshold: config.outlier_threshold,
            min_points: config.min_regression_points.max(3),
        }
    }

    pub fn fit_annual(&self, annual: &[AnnualProportion]) -> Result<RegressionResult> {
        let points: Vec<(i32, f64)> = annual.iter().map(|a| (a.year, a.proportion)).collect();
        self.fit(&points)
    }

    /// Fit `proportion = slope * year + intercept` over (year, proportion) points
    pub fn fit(&self, points: &[(i32, f64)]) -> Result<RegressionResult> {
        let required = self.min_points.max(3);
        if points.len() < required {
            return Err(PipelineError::InsufficientData {
                found: points.len(),
                required,
            });
        }

        let mut points = points.to_vec();
        points.sort_by_key(|(year, _)| *year);

        let n = points.len();
        let nf = n as f64;
        let xs: Vec<f64> = points.iter().map(|(x, _)| *x as f64).collect();
        let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();

        let mean_x = xs.iter().sum::<f64>() / nf;
        let mean_y = ys.iter().sum::<f64>() / nf;

        let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
        let syy: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
        let sxy: f64 = xs
            .iter()
            .zip(&ys)
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();

        if sxx == 0.0 {
            return Err(PipelineError::DegenerateYears { points: n });
        }

        let slope = sxy / sxx;
        let intercept = mean_y - slope * mean_x;

        let r = if syy > 0.0 {
            (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        // Fitted values around the means keep precision for year-sized x
        let fitted: Vec<f64> = xs.iter().map(|x| mean_y + slope * (x - mean_x)).collect();
        let raw_residuals: Vec<f64> = ys.iter().zip(&fitted).map(|(y, f)| y - f).collect();
        let sse: f64 = raw_residuals.iter().map(|e| e * e).sum();

        let df = (n - 2) as f64;
        let exact_fit = (sse / nf).sqrt() < RESIDUAL_EPSILON;
        let std_err = if exact_fit { 0.0 } else { (sse / df / sxx).sqrt() };

        let t_dist = StudentsT::new(0.0, 1.0, df)
            .map_err(|e| PipelineError::Statistics(format!("t-distribution (df={}): {}", df, e)))?;

        let (t_statistic, p_value) = if std_err > 0.0 {
            let t = slope / std_err;
            let p = 2.0 * (1.0 - t_dist.cdf(t.abs()));
            (t, p.clamp(0.0, 1.0))
        } else if slope == 0.0 {
            (0.0, 1.0)
        } else {
            (f64::INFINITY.copysign(slope), 0.0)
        };

        let t_critical = t_dist.inverse_cdf(1.0 - (1.0 - CONFIDENCE_LEVEL) / 2.0);
        let margin = t_critical * std_err;
        let confidence_interval = ConfidenceInterval {
            level: CONFIDENCE_LEVEL,
            lower: slope - margin,
            upper: slope + margin,
        };

        let durbin_watson = if exact_fit {
            None
        } else {
            let diffs: f64 = raw_residuals
                .windows(2)
                .map(|w| (w[1] - w[0]).powi(2))
                .sum();
            Some(diffs / sse)
        };

        let scale = sample_std_dev(&raw_residuals);
        let residuals: Vec<Residual> = points
            .iter()
            .zip(fitted.iter().zip(&raw_residuals))
            .map(|((year, observed), (fitted, residual))| Residual {
                year: *year,
                observed: *observed,
                fitted: *fitted,
                residual: *residual,
                standardized: if scale < RESIDUAL_EPSILON { 0.0 } else { residual / scale },
            })
            .collect();

        let outlier_years = residuals
            .iter()
            .filter(|r| r.standardized.abs() > self.outlier_threshold)
            .map(|r| r.year)
            .collect();

        let direction = if slope > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        };

        tracing::debug!(slope, intercept, r_squared = r * r, p_value, "trend fitted");

        Ok(RegressionResult {
            n,
            slope,
            intercept,
            r,
            r_squared: r * r,
            std_err,
            t_statistic,
            p_value,
            confidence_interval,
            durbin_watson,
            residuals,
            outlier_years,
            direction,
            significant: p_value < self.significance_level,
            significance_level: self.significance_level,
        })
    }
}

impl Default for TrendRegressor {
    fn default() -> Self {
        Self::new()
    }
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
