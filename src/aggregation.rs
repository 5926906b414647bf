// 📊 Org-Year Aggregation - stages 4, 5 and 6
// Appointment totals, reappointment counts and rates per (organization, year).

use crate::records::AppointmentRecord;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// TABLE ROWS
// ============================================================================

/// Stage 4 row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgYearCount {
    pub organization: String,
    pub year: i32,
    pub total_appointments: u64,
}

/// Stage 5 row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgYearReappointments {
    pub organization: String,
    pub year: i32,
    pub reappointments: u64,
}

/// Stage 6 row: one org-year cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgYearRate {
    pub organization: String,
    pub year: i32,
    pub total_appointments: u64,
    pub reappointments: u64,
    pub rate: f64,
}

/// Reappointments over total; 0/0 is 0
pub fn rate(reappointments: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        reappointments as f64 / total as f64
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

/// Organization and year are compared verbatim: two spellings are two rows
pub struct OrgYearAggregator;

impl OrgYearAggregator {
    /// Row count per (organization, year), sorted by organization then year
    pub fn count_appointments(records: &[AppointmentRecord]) -> Vec<OrgYearCount> {
        let mut counts: BTreeMap<(&str, i32), u64> = BTreeMap::new();
        for record in records {
            *counts.entry((record.organization.as_str(), record.year)).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|((organization, year), total_appointments)| OrgYearCount {
                organization: organization.to_string(),
                year,
                total_appointments,
            })
            .collect()
    }

    /// Flagged rows per (organization, year); only cells with at least one flag appear
    pub fn count_reappointments(records: &[AppointmentRecord]) -> Vec<OrgYearReappointments> {
        let mut counts: BTreeMap<(&str, i32), u64> = BTreeMap::new();
        for record in records.iter().filter(|r| r.reappointed) {
            *counts.entry((record.organization.as_str(), record.year)).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|((organization, year), reappointments)| OrgYearReappointments {
                organization: organization.to_string(),
                year,
                reappointments,
            })
            .collect()
    }

    /// Left join of totals with reappointment counts; a cell with no
    /// reappointment row gets 0 rather than being dropped
    pub fn rates(
        totals: &[OrgYearCount],
        reappointments: &[OrgYearReappointments],
    ) -> Vec<OrgYearRate> {
        let lookup: BTreeMap<(&str, i32), u64> = reappointments
            .iter()
            .map(|r| ((r.organization.as_str(), r.year), r.reappointments))
            .collect();

        let known: BTreeSet<(&str, i32)> = totals
            .iter()
            .map(|t| (t.organization.as_str(), t.year))
            .collect();
        let unmatched = lookup.keys().filter(|k| !known.contains(*k)).count();
        if unmatched > 0 {
            tracing::warn!(unmatched, "reappointment cells without a matching total were ignored");
        }

        let mut rows: Vec<OrgYearRate> = totals
            .iter()
            .map(|t| {
                let reappointments = lookup
                    .get(&(t.organization.as_str(), t.year))
                    .copied()
                    .unwrap_or(0);
                OrgYearRate {
                    organization: t.organization.clone(),
                    year: t.year,
                    total_appointments: t.total_appointments,
                    reappointments,
                    rate: rate(reappointments, t.total_appointments),
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            a.organization
                .cmp(&b.organization)
                .then(a.year.cmp(&b.year))
        });

        rows
    }

    /// Stages 4-6 in one pass over the records
    pub fn aggregate(records: &[AppointmentRecord]) -> Vec<OrgYearRate> {
        let totals = Self::count_appointments(records);
        let reappointments = Self::count_reappointments(records);
        Self::rates(&totals, &reappointments)
    }
}
