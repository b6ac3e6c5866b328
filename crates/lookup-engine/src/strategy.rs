use std::collections::BTreeSet;

use lookup_model::Row;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when a strategy request is malformed.
///
/// These are structural errors: they abort the resolution run before any row
/// is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("unknown duplicate-resolution strategy '{name}'")]
    UnknownStrategy { name: String },
    #[error("strategy 'user_specific' requires a non-empty set of row indices")]
    MissingIndices,
    #[error("strategy '{name}' does not accept row indices")]
    InvalidArgument { name: String },
}

/// Policy deciding which rows of a duplicate group survive resolution.
///
/// The set of policies is closed: adding one is a compile-time change, and
/// unrecognized wire names are rejected at the boundary by [`parse`]
/// rather than deep in the pipeline.
///
/// [`parse`]: ResolutionStrategy::parse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStrategy {
    /// Keep the first row of the group, in input order.
    KeepFirst,
    /// Keep the last row of the group, in input order.
    KeepLast,
    /// Drop the entire group, not just the excess rows.
    RemoveAll,
    /// Keep exactly the rows whose position in the originally uploaded file
    /// is in the set. Positions are 0-based data-row indices and always
    /// refer to the original upload, never to a previously resolved table.
    UserSpecific(BTreeSet<usize>),
}

impl ResolutionStrategy {
    /// Parse a wire-format strategy name (`keep_first`, `keep_last`,
    /// `remove_all`, `user_specific`) plus its optional index argument.
    pub fn parse(
        name: &str,
        indices: Option<BTreeSet<usize>>,
    ) -> Result<ResolutionStrategy, StrategyError> {
        let has_indices = indices.as_ref().is_some_and(|set| !set.is_empty());
        match name {
            "user_specific" => match indices {
                Some(set) if !set.is_empty() => Ok(ResolutionStrategy::UserSpecific(set)),
                _ => Err(StrategyError::MissingIndices),
            },
            "keep_first" | "keep_last" | "remove_all" if has_indices => {
                Err(StrategyError::InvalidArgument {
                    name: name.to_string(),
                })
            }
            "keep_first" => Ok(ResolutionStrategy::KeepFirst),
            "keep_last" => Ok(ResolutionStrategy::KeepLast),
            "remove_all" => Ok(ResolutionStrategy::RemoveAll),
            _ => Err(StrategyError::UnknownStrategy {
                name: name.to_string(),
            }),
        }
    }

    /// Wire-format name of this strategy.
    pub fn name(&self) -> &'static str {
        match self {
            ResolutionStrategy::KeepFirst => "keep_first",
            ResolutionStrategy::KeepLast => "keep_last",
            ResolutionStrategy::RemoveAll => "remove_all",
            ResolutionStrategy::UserSpecific(_) => "user_specific",
        }
    }

    /// Resolve one duplicate group.
    ///
    /// `cluster` holds every row sharing one (group, key) pair, in input
    /// order. Returns the surviving subset, also in input order.
    pub fn resolve(&self, cluster: &[Row]) -> Vec<Row> {
        match self {
            ResolutionStrategy::KeepFirst => cluster.first().cloned().into_iter().collect(),
            ResolutionStrategy::KeepLast => cluster.last().cloned().into_iter().collect(),
            ResolutionStrategy::RemoveAll => Vec::new(),
            ResolutionStrategy::UserSpecific(keep) => cluster
                .iter()
                .filter(|row| keep.contains(&row.source_index()))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster() -> Vec<Row> {
        vec![
            Row::new(0, vec!["A".into(), "k1".into(), "1".into()]),
            Row::new(3, vec!["A".into(), "k1".into(), "2".into()]),
            Row::new(7, vec!["A".into(), "k1".into(), "3".into()]),
        ]
    }

    #[test]
    fn cardinality_per_strategy() {
        let rows = cluster();
        assert_eq!(ResolutionStrategy::KeepFirst.resolve(&rows).len(), 1);
        assert_eq!(ResolutionStrategy::KeepLast.resolve(&rows).len(), 1);
        assert_eq!(ResolutionStrategy::RemoveAll.resolve(&rows).len(), 0);

        let keep = ResolutionStrategy::UserSpecific([3, 7, 99].into());
        assert_eq!(keep.resolve(&rows).len(), 2);
    }

    #[test]
    fn keep_first_and_last_pick_input_order_endpoints() {
        let rows = cluster();
        assert_eq!(
            ResolutionStrategy::KeepFirst.resolve(&rows)[0].source_index(),
            0
        );
        assert_eq!(
            ResolutionStrategy::KeepLast.resolve(&rows)[0].source_index(),
            7
        );
    }

    #[test]
    fn user_specific_matches_on_source_index_not_cluster_position() {
        let rows = cluster();
        let kept = ResolutionStrategy::UserSpecific([1, 2].into()).resolve(&rows);
        // Cluster positions 1 and 2 hold source indices 3 and 7; nothing
        // carries source index 1 or 2, so nothing survives.
        assert!(kept.is_empty());
    }

    #[test]
    fn parse_accepts_the_wire_names() {
        assert_eq!(
            ResolutionStrategy::parse("keep_first", None).unwrap(),
            ResolutionStrategy::KeepFirst
        );
        assert_eq!(
            ResolutionStrategy::parse("keep_last", None).unwrap(),
            ResolutionStrategy::KeepLast
        );
        assert_eq!(
            ResolutionStrategy::parse("remove_all", None).unwrap(),
            ResolutionStrategy::RemoveAll
        );
        assert_eq!(
            ResolutionStrategy::parse("user_specific", Some([4].into())).unwrap(),
            ResolutionStrategy::UserSpecific([4].into())
        );
    }

    #[test]
    fn parse_rejects_bad_requests() {
        assert_eq!(
            ResolutionStrategy::parse("keep_some", None).unwrap_err(),
            StrategyError::UnknownStrategy {
                name: "keep_some".to_string()
            }
        );
        assert_eq!(
            ResolutionStrategy::parse("user_specific", None).unwrap_err(),
            StrategyError::MissingIndices
        );
        assert_eq!(
            ResolutionStrategy::parse("user_specific", Some(BTreeSet::new())).unwrap_err(),
            StrategyError::MissingIndices
        );
        assert_eq!(
            ResolutionStrategy::parse("keep_first", Some([1].into())).unwrap_err(),
            StrategyError::InvalidArgument {
                name: "keep_first".to_string()
            }
        );
    }
}
