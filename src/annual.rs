// 📅 Annual Proportions - stage 8
// Government-wide reappointment proportion per year, summed over raw appointment rows.

use crate::aggregation::rate;
use crate::records::AppointmentRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualProportion {
    pub year: i32,
    pub total_appointments: u64,
    pub total_reappointments: u64,
    pub proportion: f64,
}

pub struct AnnualProportionCalculator;

impl AnnualProportionCalculator {
    /// One row per year present in `records`, ascending. Years with no rows
    /// are absent from the output rather than zero-filled.
    pub fn calculate(records: &[AppointmentRecord]) -> Vec<AnnualProportion> {
        let mut per_year: BTreeMap<i32, (u64, u64)> = BTreeMap::new();
        for record in records {
            let entry = per_year.entry(record.year).or_insert((0, 0));
            entry.0 += 1;
            if record.reappointed {
                entry.1 += 1;
            }
        }

        per_year
            .into_iter()
            .map(|(year, (total, reappointed))| AnnualProportion {
                year,
                total_appointments: total,
                total_reappointments: reappointed,
                proportion: rate(reappointed, total),
            })
            .collect()
    }

    /// Like `calculate`, restricted to rows whose year lies in `start..=end`
    pub fn calculate_in_range(records: &[AppointmentRecord], start: i32, end: i32) -> Vec<AnnualProportion> {
        let in_range: Vec<AppointmentRecord> = records
            .iter()
            .filter(|r| (start..=end).contains(&r.year))
            .cloned()
            .collect();

        let excluded = records.len() - in_range.len();
        if excluded > 0 {
            tracing::warn!(excluded, start, end, "rows outside the year range left out of annual proportions");
        }

        Self::calculate(&in_range)
    }

    /// Years in `start..=end` with no row in `proportions`
    pub fn missing_years(proportions: &[AnnualProportion], start: i32, end: i32) -> Vec<i32> {
        (start..=end)
            .filter(|y| !proportions.iter().any(|p| p.year == *y))
            .collect()
    }
}
