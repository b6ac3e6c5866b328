use serde::{Deserialize, Serialize};

/// Segment separator in the external asset tree's addressing scheme.
pub const PATH_SEPARATOR: &str = " >> ";

/// Default parent path used when the caller opts into root fallback.
pub const ROOT_ASSET_PATH: &str = "Root Asset";

/// `Formula Parameters` carries no bound variables in the current design.
pub const EMPTY_PARAMETERS: &str = "{}";

/// Fixed output schema of an emitted lookup table, in column order.
pub const LOOKUP_COLUMNS: [&str; 4] = ["Name", "Formula", "Formula Parameters", "Parent Path"];

/// Derive the lookup entry name for a group: spaces become underscores and
/// the `_LookupString` suffix is appended.
///
/// The derivation is deterministic so the same upload always produces the
/// same entry names, which callers rely on when keying parent-path maps.
pub fn lookup_name(group: &str) -> String {
    format!("{}_LookupString", group.replace(' ', "_"))
}

/// Join path segments using the tree service's `>>` convention.
pub fn join_path<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(PATH_SEPARATOR)
}

/// Split a path on `>>`, trimming whitespace around each segment so
/// `A >> B` and `A>>B` address the same node.
pub fn split_path(path: &str) -> Vec<String> {
    path.split(">>")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Compiler output for one group, before a parent path is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupDraft {
    /// Original group name, used to key the parent-path map.
    pub group: String,
    /// Derived entry name (`<group>_LookupString`).
    pub name: String,
    /// Compiled list-of-pairs formula literal.
    pub formula: String,
}

/// One finished lookup record, ready for export or tree insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Formula")]
    pub formula: String,
    #[serde(rename = "Formula Parameters")]
    pub formula_parameters: String,
    #[serde(rename = "Parent Path")]
    pub parent_path: String,
}

impl LookupEntry {
    /// Finish a draft by attaching its parent path.
    pub fn from_draft(draft: LookupDraft, parent_path: impl Into<String>) -> Self {
        Self {
            name: draft.name,
            formula: draft.formula,
            formula_parameters: EMPTY_PARAMETERS.to_string(),
            parent_path: parent_path.into(),
        }
    }
}
