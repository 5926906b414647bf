// 🏆 Yearly-Max Finder - stage 7
// One winning organization per year by reappointment rate.
//
// Tie-break order: highest rate, then most total appointments, then the
// lexicographically smallest organization name. That is a strict total
// order over distinct organizations, so every year has exactly one winner.

use crate::aggregation::OrgYearRate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyMax {
    pub year: i32,
    pub organization: String,
    pub rate: f64,
    pub total_appointments: u64,
    pub reappointments: u64,
}

/// `Ordering::Less` means `a` ranks ahead of `b`
pub fn rank(a: &OrgYearRate, b: &OrgYearRate) -> Ordering {
    b.rate
        .total_cmp(&a.rate)
        .then_with(|| b.total_appointments.cmp(&a.total_appointments))
        .then_with(|| a.organization.cmp(&b.organization))
}

pub struct YearlyMaxFinder;

impl YearlyMaxFinder {
    /// Winners sorted by year; years without cells produce no row
    pub fn find(rates: &[OrgYearRate]) -> Vec<YearlyMax> {
        let mut best: BTreeMap<i32, &OrgYearRate> = BTreeMap::new();

        for cell in rates {
            if cell.rate.is_nan() {
                tracing::warn!(organization = %cell.organization, year = cell.year, "NaN rate skipped");
                continue;
            }

            best.entry(cell.year)
                .and_modify(|current| {
                    if rank(cell, *current) == Ordering::Less {
                        *current = cell;
                    }
                })
                .or_insert(cell);
        }

        best.into_values()
            .map(|cell| YearlyMax {
                year: cell.year,
                organization: cell.organization.clone(),
                rate: cell.rate,
                total_appointments: cell.total_appointments,
                reappointments: cell.reappointments,
            })
            .collect()
    }
}
