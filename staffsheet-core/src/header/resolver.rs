//! Column role resolution: one role per column, one column per role.

use super::labels::LabelMatch;
use crate::model::{ColumnMapping, FieldRole};
use serde::Serialize;
use std::collections::BTreeMap;

/// A label match proposed for a column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnCandidate {
    /// 1-based column
    pub column: u32,
    /// Label text as it appears in the sheet
    pub label: String,
    pub matched: LabelMatch,
}

/// Two columns competed for the same role; the weaker one was left unmapped
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleConflict {
    pub role: FieldRole,
    pub kept_column: u32,
    pub kept_confidence: f64,
    pub dropped_column: u32,
    pub dropped_confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Mappings ordered by column
    pub mappings: Vec<ColumnMapping>,
    pub conflicts: Vec<RoleConflict>,
}

impl Resolution {
    pub fn role_column(&self, role: FieldRole) -> Option<u32> {
        self.mappings
            .iter()
            .find(|m| m.role == role)
            .map(|m| m.column)
    }

    /// Mean confidence of the kept mappings, 0 when nothing is mapped
    pub fn confidence(&self) -> f64 {
        if self.mappings.is_empty() {
            return 0.0;
        }
        self.mappings.iter().map(|m| m.confidence).sum::<f64>() / self.mappings.len() as f64
    }
}

/// Resolve raw candidates into a conflict-free column mapping.
///
/// A column with several candidates keeps its strongest one (earlier
/// candidate on ties). A role claimed by several columns stays with the
/// highest confidence, leftmost column on ties; the others are demoted to
/// unmapped and reported as conflicts.
pub fn resolve(candidates: &[ColumnCandidate]) -> Resolution {
    let mut per_column: BTreeMap<u32, &ColumnCandidate> = BTreeMap::new();
    for candidate in candidates {
        per_column
            .entry(candidate.column)
            .and_modify(|current| {
                if candidate.matched.confidence > current.matched.confidence {
                    *current = candidate;
                }
            })
            .or_insert(candidate);
    }

    let mut per_role: BTreeMap<FieldRole, &ColumnCandidate> = BTreeMap::new();
    let mut conflicts = Vec::new();
    // Columns ascend, so on equal confidence the kept column is the leftmost
    for candidate in per_column.values().copied() {
        let role = candidate.matched.role;
        match per_role.get(&role).copied() {
            None => {
                per_role.insert(role, candidate);
            }
            Some(current) => {
                let (kept, dropped) = if candidate.matched.confidence > current.matched.confidence {
                    (candidate, current)
                } else {
                    (current, candidate)
                };
                conflicts.push(RoleConflict {
                    role,
                    kept_column: kept.column,
                    kept_confidence: kept.matched.confidence,
                    dropped_column: dropped.column,
                    dropped_confidence: dropped.matched.confidence,
                });
                per_role.insert(role, kept);
            }
        }
    }

    let mut mappings: Vec<ColumnMapping> = per_role
        .values()
        .map(|c| ColumnMapping {
            column: c.column,
            role: c.matched.role,
            confidence: c.matched.confidence,
            kind: c.matched.kind,
            label: c.label.clone(),
        })
        .collect();
    mappings.sort_by_key(|m| m.column);

    Resolution {
        mappings,
        conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchKind;

    fn candidate(column: u32, role: FieldRole, confidence: f64) -> ColumnCandidate {
        ColumnCandidate {
            column,
            label: format!("col{}", column),
            matched: LabelMatch {
                role,
                confidence,
                kind: MatchKind::Synonym,
                label_chars: 2,
            },
        }
    }

    #[test]
    fn test_distinct_roles_pass_through() {
        let resolution = resolve(&[
            candidate(3, FieldRole::WorkHours, 1.0),
            candidate(1, FieldRole::Name, 1.0),
        ]);

        assert!(resolution.conflicts.is_empty());
        assert_eq!(resolution.mappings.len(), 2);
        assert_eq!(resolution.mappings[0].column, 1);
        assert_eq!(resolution.role_column(FieldRole::WorkHours), Some(3));
        assert_eq!(resolution.confidence(), 1.0);
    }

    #[test]
    fn test_higher_confidence_wins_role_conflict() {
        let resolution = resolve(&[
            candidate(2, FieldRole::HourlyRate, 0.55),
            candidate(5, FieldRole::HourlyRate, 1.0),
        ]);

        assert_eq!(resolution.role_column(FieldRole::HourlyRate), Some(5));
        assert_eq!(resolution.mappings.len(), 1);
        assert_eq!(
            resolution.conflicts,
            vec![RoleConflict {
                role: FieldRole::HourlyRate,
                kept_column: 5,
                kept_confidence: 1.0,
                dropped_column: 2,
                dropped_confidence: 0.55,
            }]
        );
    }

    #[test]
    fn test_tie_keeps_leftmost_column() {
        let resolution = resolve(&[
            candidate(7, FieldRole::Name, 0.85),
            candidate(4, FieldRole::Name, 0.85),
        ]);
        assert_eq!(resolution.role_column(FieldRole::Name), Some(4));
        assert_eq!(resolution.conflicts[0].dropped_column, 7);
    }

    #[test]
    fn test_one_role_per_column() {
        let resolution = resolve(&[
            candidate(2, FieldRole::BillingAmount, 0.5),
            candidate(2, FieldRole::BillingRate, 1.0),
        ]);
        assert_eq!(resolution.mappings.len(), 1);
        assert_eq!(resolution.mappings[0].role, FieldRole::BillingRate);
        assert!(resolution.conflicts.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let resolution = resolve(&[]);
        assert!(resolution.mappings.is_empty());
        assert_eq!(resolution.confidence(), 0.0);
    }
}
