// 📝 Regression Report - stage 9 artifact
// Renders the fitted trend as a plain-text report and a JSON document.

use crate::annual::AnnualProportion;
use crate::regression::RegressionResult;
use chrono::{DateTime, Utc};
use serde::Serialize;

const RULE: &str = "============================================================";

/// JSON shape of the report: inputs and fit side by side
#[derive(Debug, Serialize)]
pub struct RegressionDocument<'a> {
    pub generated_at: DateTime<Utc>,
    pub annual_proportions: &'a [AnnualProportion],
    pub regression: &'a RegressionResult,
    pub conclusion: String,
}

pub fn conclusion(result: &RegressionResult) -> String {
    let significance = if result.significant {
        "statistically significant"
    } else {
        "not statistically significant"
    };

    format!(
        "The government-wide reappointment proportion is {} by {:.4} percentage points per year \
         ({}, p = {:.4} at alpha = {}).",
        result.direction,
        result.annual_change_pp().abs(),
        significance,
        result.p_value,
        result.significance_level
    )
}

pub fn render_text(
    annual: &[AnnualProportion],
    result: &RegressionResult,
    generated_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        "REAPPOINTMENT TREND ANALYSIS".to_string(),
        RULE.to_string(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        String::new(),
    ];

    lines.push("DATA".to_string());
    lines.push(format!(
        "{:<6} {:>12} {:>16} {:>12}",
        "Year", "Total", "Reappointments", "Proportion"
    ));
    lines.extend(annual.iter().map(|row| {
        format!(
            "{:<6} {:>12} {:>16} {:>11.2}%",
            row.year,
            row.total_appointments,
            row.total_reappointments,
            row.proportion * 100.0
        )
    }));
    lines.push(String::new());

    lines.extend([
        "MODEL".to_string(),
        format!(
            "Equation: proportion = {:.6} * year + {:.6}",
            result.slope, result.intercept
        ),
        format!("Points (n):            {}", result.n),
        format!("Slope:                 {:.6}", result.slope),
        format!("Intercept:             {:.6}", result.intercept),
        format!("Correlation (r):       {:.4}", result.r),
        format!("R-squared:             {:.4}", result.r_squared),
        format!("Std. error (slope):    {:.6}", result.std_err),
        format!("t statistic:           {:.4}", result.t_statistic),
        format!("p-value:               {:.6}", result.p_value),
        format!(
            "{:.0}% CI (slope):        [{:.6}, {:.6}]",
            result.confidence_interval.level * 100.0,
            result.confidence_interval.lower,
            result.confidence_interval.upper
        ),
        String::new(),
    ]);

    lines.push("DIAGNOSTICS".to_string());
    let dw = match result.durbin_watson {
        Some(dw) => format!("{:.4}", dw),
        None => "n/a".to_string(),
    };
    lines.push(format!("Durbin-Watson:         {} ({})", dw, result.autocorrelation()));
    if result.outlier_years.is_empty() {
        lines.push("Outliers:              none".to_string());
    } else {
        lines.push("Outliers:".to_string());
        lines.extend(
            result
                .residuals
                .iter()
                .filter(|r| result.outlier_years.contains(&r.year))
                .map(|r| {
                    format!(
                        "  {}  residual {:+.6}  standardized {:+.2}",
                        r.year, r.residual, r.standardized
                    )
                }),
        );
    }
    lines.push(String::new());

    lines.extend([
        "CONCLUSION".to_string(),
        format!("Trend direction:       {}", result.direction),
        format!(
            "Significant:           {}",
            if result.significant { "yes" } else { "no" }
        ),
        conclusion(result),
    ]);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regression::TrendRegressor;
    use chrono::TimeZone;

    fn annual() -> Vec<AnnualProportion> {
        [(2020, 10, 1), (2021, 10, 2), (2022, 10, 3)]
            .iter()
            .map(|&(year, total, reapp)| AnnualProportion {
                year,
                total_appointments: total,
                total_reappointments: reapp,
                proportion: reapp as f64 / total as f64,
            })
            .collect()
    }

    #[test]
    fn test_text_report_sections() {
        let annual = annual();
        let result = TrendRegressor::new().fit_annual(&annual).unwrap();
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        let text = render_text(&annual, &result, at);

        assert!(text.contains("Generated: 2024-06-01 12:00:00 UTC"));
        assert!(text.contains("Equation: proportion = 0.100000 * year + -201.900000"));
        assert!(text.contains("R-squared:             1.0000"));
        assert!(text.contains("Durbin-Watson:         n/a"));
        assert!(text.contains("Outliers:              none"));
        assert!(text.contains("Trend direction:       increasing"));
        assert!(text.contains("2021"));
    }

    #[test]
    fn test_text_report_lists_outliers() {
        let annual = annual();
        let mut result = TrendRegressor::new().fit_annual(&annual).unwrap();
        result.durbin_watson = Some(1.2);
        result.residuals[1].residual = 0.05;
        result.residuals[1].standardized = 2.5;
        result.outlier_years = vec![2021];

        let text = render_text(&annual, &result, Utc::now());

        assert!(text.contains("Durbin-Watson:         1.2000 (positive autocorrelation)"));
        assert!(text.contains("Outliers:\n  2021  residual +0.050000  standardized +2.50\n"));
        assert!(text.ends_with("per year (statistically significant, p = 0.0000 at alpha = 0.05).\n"));
    }

    #[test]
    fn test_conclusion_sentence() {
        let result = TrendRegressor::new().fit_annual(&annual()).unwrap();
        let sentence = conclusion(&result);

        assert!(sentence.starts_with("The government-wide reappointment proportion is increasing"));
        assert!(sentence.contains("10.0000 percentage points per year"));
        assert!(sentence.contains("statistically significant"));
        assert!(!sentence.contains("not statistically"));
    }

    #[test]
    fn test_json_document() {
        let annual = annual();
        let result = TrendRegressor::new().fit_annual(&annual).unwrap();
        let doc = RegressionDocument {
            generated_at: Utc::now(),
            annual_proportions: &annual,
            regression: &result,
            conclusion: conclusion(&result),
        };

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["regression"]["direction"], "Increasing");
        assert_eq!(json["annual_proportions"].as_array().unwrap().len(), 3);
        assert!(json["regression"]["durbin_watson"].is_null());
    }
}
