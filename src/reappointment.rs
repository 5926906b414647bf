// 🔁 Reappointment Marker - Detect repeat appointees
// Every occurrence of a (name, position, organization) after its earliest year is a reappointment.

use crate::records::AppointmentRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// GROUP KEY
// ============================================================================

/// Normalized identity of an appointment: lower-cased, trimmed triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub name: String,
    pub position: String,
    pub organization: String,
}

impl GroupKey {
    pub fn from_record(record: &AppointmentRecord) -> Self {
        GroupKey {
            name: normalize(&record.name),
            position: normalize(&record.position),
            organization: normalize(&record.organization),
        }
    }

    /// A key with any blank component does not identify a person in a role
    pub fn is_identifiable(&self) -> bool {
        !self.name.is_empty() && !self.position.is_empty() && !self.organization.is_empty()
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

// ============================================================================
// MARKING SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkingSummary {
    /// Rows that entered marking
    pub total_rows: usize,

    /// Distinct identifiable groups
    pub groups: usize,

    /// Groups with more than one occurrence
    pub repeat_groups: usize,

    /// Rows skipped because the key had a blank component
    pub unidentifiable_rows: usize,

    /// Rows flagged true by the source before marking
    pub flagged_before: usize,

    /// Rows flagged true after marking
    pub flagged_after: usize,

    /// Rows turned from false to true by marking
    pub newly_flagged: usize,
}

// ============================================================================
// REAPPOINTMENT MARKER
// ============================================================================

pub struct ReappointmentMarker;

impl ReappointmentMarker {
    pub fn new() -> Self {
        ReappointmentMarker
    }

    /// Return a copy of `records` with `reappointed` set by repeat detection.
    ///
    /// Rows are grouped by normalized (name, position, organization) and
    /// ordered by year with a stable sort, so equal years keep input order.
    /// Every member after the first is flagged. Flags are only ever added:
    /// a `true` from the source survives, including on a group's first row.
    pub fn mark(&self, records: &[AppointmentRecord]) -> (Vec<AppointmentRecord>, MarkingSummary) {
        let mut marked = records.to_vec();
        let mut groups: HashMap<GroupKey, Vec<usize>> = HashMap::new();
        let mut unidentifiable_rows = 0;

        for (index, record) in records.iter().enumerate() {
            let key = GroupKey::from_record(record);
            if key.is_identifiable() {
                groups.entry(key).or_default().push(index);
            } else {
                unidentifiable_rows += 1;
            }
        }

        let mut repeat_groups = 0;
        let mut newly_flagged = 0;

        for indices in groups.values_mut() {
            if indices.len() < 2 {
                continue;
            }
            repeat_groups += 1;

            // Indices were pushed in input order; stable sort keeps it for equal years
            indices.sort_by_key(|&i| records[i].year);

            for &i in &indices[1..] {
                if !marked[i].reappointed {
                    marked[i].reappointed = true;
                    newly_flagged += 1;
                }
            }
        }

        let summary = MarkingSummary {
            total_rows: records.len(),
            groups: groups.len(),
            repeat_groups,
            unidentifiable_rows,
            flagged_before: records.iter().filter(|r| r.reappointed).count(),
            flagged_after: marked.iter().filter(|r| r.reappointed).count(),
            newly_flagged,
        };

        tracing::debug!(?summary, "reappointment marking complete");

        (marked, summary)
    }
}

impl Default for ReappointmentMarker {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
