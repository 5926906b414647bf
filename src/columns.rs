// 🔎 Column Matching - Aliases as Data
// Resolves heterogeneous source headers to canonical column names.

use crate::config::ColumnAliases;
use crate::errors::{PipelineError, Result};
use std::collections::HashMap;

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// Header equals an alias (case-insensitive, trimmed)
    Exact,
    /// Header contains an alias
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMatch {
    pub canonical: &'static str,
    pub header: String,
    pub index: usize,
    pub kind: MatchKind,
}

/// Canonical name -> matched source column
#[derive(Debug, Clone, Default)]
pub struct ColumnMapping {
    matches: HashMap<&'static str, ColumnMatch>,
}

impl ColumnMapping {
    pub fn index_of(&self, canonical: &str) -> Option<usize> {
        self.matches.get(canonical).map(|m| m.index)
    }

    pub fn get(&self, canonical: &str) -> Option<&ColumnMatch> {
        self.matches.get(canonical)
    }

    /// Fail with `MissingColumn` unless every name in `required` resolved
    pub fn require(&self, required: &[&str], headers: &[String]) -> Result<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|c| !self.matches.contains_key(*c))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::missing_column(&missing, headers))
        }
    }

    /// Resolved columns in header order
    pub fn iter(&self) -> impl Iterator<Item = &ColumnMatch> {
        let mut matches: Vec<&ColumnMatch> = self.matches.values().collect();
        matches.sort_by_key(|m| m.index);
        matches.into_iter()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

// ============================================================================
// COLUMN MATCHER
// ============================================================================

pub struct ColumnMatcher {
    /// (canonical, lower-cased aliases) in resolution order
    aliases: Vec<(&'static str, Vec<String>)>,
}

impl ColumnMatcher {
    pub fn new(aliases: &ColumnAliases) -> Self {
        let aliases = aliases
            .entries()
            .iter()
            .map(|(canonical, list)| {
                let lowered = list
                    .iter()
                    .map(|a| a.trim().to_lowercase())
                    .filter(|a| !a.is_empty())
                    .collect();
                (*canonical, lowered)
            })
            .collect();

        ColumnMatcher { aliases }
    }

    /// Resolve headers in two passes: exact alias matches for every canonical
    /// name first, then substring matches for whatever is still unresolved.
    /// A header is claimed by at most one canonical name.
    pub fn resolve(&self, headers: &[String]) -> ColumnMapping {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut claimed = vec![false; headers.len()];
        let mut mapping = ColumnMapping::default();

        for &(canonical, ref aliases) in &self.aliases {
            let found = aliases.iter().find_map(|alias| {
                normalized
                    .iter()
                    .enumerate()
                    .find(|(i, h)| !claimed[*i] && *h == alias)
                    .map(|(i, _)| i)
            });

            if let Some(index) = found {
                claimed[index] = true;
                mapping.matches.insert(
                    canonical,
                    ColumnMatch {
                        canonical,
                        header: headers[index].clone(),
                        index,
                        kind: MatchKind::Exact,
                    },
                );
            }
        }

        for &(canonical, ref aliases) in &self.aliases {
            if mapping.matches.contains_key(canonical) {
                continue;
            }

            let found = aliases.iter().find_map(|alias| {
                normalized
                    .iter()
                    .enumerate()
                    .find(|(i, h)| !claimed[*i] && h.contains(alias.as_str()))
                    .map(|(i, _)| i)
            });

            if let Some(index) = found {
                claimed[index] = true;
                tracing::debug!(
                    canonical,
                    header = %headers[index],
                    "column resolved by substring"
                );
                mapping.matches.insert(
                    canonical,
                    ColumnMatch {
                        canonical,
                        header: headers[index].clone(),
                        index,
                        kind: MatchKind::Substring,
                    },
                );
            }
        }

        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let matcher = ColumnMatcher::new(&ColumnAliases::default());
        let cols = headers(&["Name", " POSITION ", "Organization", "Reappointed", "year"]);
        let mapping = matcher.resolve(&cols);

        assert_eq!(mapping.len(), 5);
        assert_eq!(mapping.index_of("position"), Some(1));
        assert_eq!(mapping.get("name").unwrap().kind, MatchKind::Exact);
    }

    #[test]
    fn test_substring_fallback() {
        let matcher = ColumnMatcher::new(&ColumnAliases::default());
        let cols = headers(&["Appointee Name", "Position Title", "Parent Organization", "year"]);
        let mapping = matcher.resolve(&cols);

        assert_eq!(mapping.index_of("name"), Some(0));
        assert_eq!(mapping.index_of("position"), Some(1));
        assert_eq!(mapping.index_of("organization"), Some(2));
        assert_eq!(mapping.get("organization").unwrap().kind, MatchKind::Substring);
        assert_eq!(mapping.index_of("reappointed"), None);
    }

    #[test]
    fn test_exact_match_wins_over_earlier_substring() {
        let matcher = ColumnMatcher::new(&ColumnAliases::default());
        // "organization_name" would satisfy "name" by substring, but "name" exists exactly
        let cols = headers(&["organization_name", "name", "position", "org", "year"]);
        let mapping = matcher.resolve(&cols);

        assert_eq!(mapping.index_of("name"), Some(1));
        assert_eq!(mapping.index_of("organization"), Some(3));
    }

    #[test]
    fn test_header_claimed_once() {
        let matcher = ColumnMatcher::new(&ColumnAliases::default());
        let cols = headers(&["board member", "role", "year"]);
        let mapping = matcher.resolve(&cols);

        // "name" finds "member" first; organization cannot reuse the same header
        assert_eq!(mapping.index_of("name"), Some(0));
        assert_eq!(mapping.index_of("organization"), None);
    }

    #[test]
    fn test_custom_aliases() {
        let aliases = ColumnAliases {
            organization: vec!["Ministry".to_string()],
            ..ColumnAliases::default()
        };
        let matcher = ColumnMatcher::new(&aliases);
        let mapping = matcher.resolve(&headers(&["name", "position", "MINISTRY", "year"]));

        assert_eq!(mapping.index_of("organization"), Some(2));
    }

    #[test]
    fn test_require_reports_missing_and_available() {
        let matcher = ColumnMatcher::new(&ColumnAliases::default());
        let cols = headers(&["name", "position", "year"]);
        let mapping = matcher.resolve(&cols);

        let err = mapping
            .require(&["name", "position", "organization", "year"], &cols)
            .unwrap_err();

        match err {
            PipelineError::MissingColumn { missing, available } => {
                assert_eq!(missing, vec!["organization".to_string()]);
                assert_eq!(available, cols);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
