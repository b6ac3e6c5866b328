use std::collections::HashMap;

use lookup_model::{RowTable, SchemaError};
use serde::{Deserialize, Serialize};

/// One group's ordered key/value pairs, drawn from the resolved row table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTable {
    pub group: String,
    /// (key, value) pairs in first-seen row order. Values are plain string
    /// coercions; a blank or missing value cell stays in the list as `""` so
    /// the pair count always matches the group's row count.
    pub pairs: Vec<(String, String)>,
}

/// Partition a resolved row table by the group column and collect each
/// group's ordered key/value pairs.
///
/// Groups come out in first-seen order, pairs in first-seen row order; no
/// externally imposed sort is applied. Fails fast with
/// [`SchemaError::MissingColumn`] if any of the three columns is absent.
pub fn aggregate_groups(
    table: &RowTable,
    group_column: &str,
    key_column: &str,
    value_column: &str,
) -> Result<Vec<GroupTable>, SchemaError> {
    table.require_columns(&[group_column, key_column, value_column])?;

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupTable> = Vec::new();

    for row in table.rows() {
        let group = table.value(row, group_column).unwrap_or_default().to_string();
        let key = table.value(row, key_column).unwrap_or_default().to_string();
        let value = table
            .value(row, value_column)
            .unwrap_or_default()
            .to_string();

        let slot = *index.entry(group.clone()).or_insert_with(|| {
            groups.push(GroupTable {
                group,
                pairs: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].pairs.push((key, value));
    }

    Ok(groups)
}
