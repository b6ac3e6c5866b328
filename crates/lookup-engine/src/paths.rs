use std::collections::HashMap;

use lookup_model::{LookupDraft, LookupEntry, ROOT_ASSET_PATH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-group failures during parent-path assignment.
///
/// These are cataloged, not thrown: one uncovered group never aborts the
/// batch, so the caller gets every compiled entry plus the list of groups it
/// still has to map.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum AssignError {
    #[error("group '{group}' has no parent path mapping")]
    UncoveredGroup { group: String },
}

/// Caller-supplied mapping from group name to tree path.
///
/// Keys may be either the raw group name or the derived
/// `<group>_LookupString` entry name; the raw group name wins when both are
/// present. The map is built by the operator between the resolution request
/// and the compile request, so it arrives as plain JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParentPathMap {
    paths: HashMap<String, String>,
}

impl ParentPathMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group: impl Into<String>, path: impl Into<String>) {
        self.paths.insert(group.into(), path.into());
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Look up the path for a draft: exact group name first, then the
    /// derived entry name.
    pub fn path_for(&self, draft: &LookupDraft) -> Option<&str> {
        self.paths
            .get(&draft.group)
            .or_else(|| self.paths.get(&draft.name))
            .map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParentPathMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            paths: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// What to do with a group the parent-path map does not cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathFallback {
    /// Catalog the group as an [`AssignError::UncoveredGroup`] failure.
    Strict,
    /// Substitute the root-level sentinel path (`Root Asset`).
    RootAsset,
}

/// Result of parent-path assignment: finished entries for covered groups,
/// plus the per-group failures for uncovered ones.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub entries: Vec<LookupEntry>,
    pub failures: Vec<AssignError>,
}

/// Attach a parent path to every draft.
///
/// Covered groups always compile, whatever happens to their neighbors;
/// uncovered groups either fall back to [`ROOT_ASSET_PATH`] or land in
/// `failures`, depending on `fallback`.
pub fn assign_parent_paths(
    drafts: Vec<LookupDraft>,
    paths: &ParentPathMap,
    fallback: PathFallback,
) -> Assignment {
    let mut assignment = Assignment::default();
    for draft in drafts {
        match paths.path_for(&draft) {
            Some(path) => {
                let path = path.to_string();
                assignment
                    .entries
                    .push(LookupEntry::from_draft(draft, path));
            }
            None => match fallback {
                PathFallback::RootAsset => {
                    log::warn!(
                        "group '{}' has no parent path mapping, inserting under '{ROOT_ASSET_PATH}'",
                        draft.group
                    );
                    assignment
                        .entries
                        .push(LookupEntry::from_draft(draft, ROOT_ASSET_PATH));
                }
                PathFallback::Strict => {
                    assignment.failures.push(AssignError::UncoveredGroup {
                        group: draft.group,
                    });
                }
            },
        }
    }
    assignment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(group: &str) -> LookupDraft {
        LookupDraft {
            group: group.to_string(),
            name: lookup_model::lookup_name(group),
            formula: "[]".to_string(),
        }
    }

    #[test]
    fn covered_groups_compile_even_when_others_fail() {
        let paths: ParentPathMap =
            [("Pump", "Reactor Plant >> Reactor 1")].into_iter().collect();
        let assignment = assign_parent_paths(
            vec![draft("Pump"), draft("Valve")],
            &paths,
            PathFallback::Strict,
        );
        assert_eq!(assignment.entries.len(), 1);
        assert_eq!(assignment.entries[0].parent_path, "Reactor Plant >> Reactor 1");
        assert_eq!(
            assignment.failures,
            vec![AssignError::UncoveredGroup {
                group: "Valve".to_string()
            }]
        );
    }

    #[test]
    fn empty_map_without_fallback_emits_nothing() {
        let assignment = assign_parent_paths(
            vec![draft("Pump")],
            &ParentPathMap::new(),
            PathFallback::Strict,
        );
        assert!(assignment.entries.is_empty());
        assert_eq!(assignment.failures.len(), 1);
    }

    #[test]
    fn root_fallback_covers_everything() {
        let assignment = assign_parent_paths(
            vec![draft("Pump"), draft("Valve")],
            &ParentPathMap::new(),
            PathFallback::RootAsset,
        );
        assert!(assignment.failures.is_empty());
        assert!(assignment
            .entries
            .iter()
            .all(|e| e.parent_path == ROOT_ASSET_PATH));
    }

    #[test]
    fn derived_entry_name_is_accepted_as_a_key() {
        let paths: ParentPathMap = [("Heat_Exchanger_LookupString", "Plant >> Exchangers")]
            .into_iter()
            .collect();
        let assignment = assign_parent_paths(
            vec![draft("Heat Exchanger")],
            &paths,
            PathFallback::Strict,
        );
        assert_eq!(assignment.entries[0].parent_path, "Plant >> Exchangers");
    }
}
