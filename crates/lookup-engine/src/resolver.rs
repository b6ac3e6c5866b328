use std::collections::{BTreeSet, HashMap};

use lookup_model::{Row, RowTable, SchemaError};
use serde::Serialize;

use crate::strategy::ResolutionStrategy;

/// All rows sharing one (group, key) pair, where that pair occurs more than
/// once. Computed fresh from the current row table, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCluster {
    pub group: String,
    pub key: String,
    pub rows: Vec<Row>,
}

/// Result of duplicate detection, in first-seen (group, key) order.
///
/// The hosting service returns this to the operator for review before a
/// resolution strategy is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DuplicateReport {
    pub clusters: Vec<DuplicateCluster>,
}

impl DuplicateReport {
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Total number of duplicated rows across all clusters.
    pub fn row_count(&self) -> usize {
        self.clusters.iter().map(|c| c.rows.len()).sum()
    }
}

fn column_index(table: &RowTable, column: &str) -> Result<usize, SchemaError> {
    table
        .column_index(column)
        .ok_or_else(|| SchemaError::MissingColumn {
            column: column.to_string(),
        })
}

/// Partition `rows` by the field at `index`, preserving first-seen order.
fn partition_by(rows: &[Row], index: usize) -> Vec<(String, Vec<Row>)> {
    let mut order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Row>> = HashMap::new();
    for row in rows {
        let value = row.value(index).to_string();
        let bucket = buckets.entry(value.clone()).or_insert_with(|| {
            order.push(value);
            Vec::new()
        });
        bucket.push(row.clone());
    }
    order
        .into_iter()
        .map(|value| {
            let rows = buckets.remove(&value).unwrap_or_default();
            (value, rows)
        })
        .collect()
}

/// Find every row whose (group, key) value pair occurs more than once.
///
/// Fails fast with [`SchemaError::MissingColumn`] before any row is examined.
pub fn find_duplicates(
    table: &RowTable,
    group_column: &str,
    key_column: &str,
) -> Result<DuplicateReport, SchemaError> {
    let group_idx = column_index(table, group_column)?;
    let key_idx = column_index(table, key_column)?;

    let mut clusters = Vec::new();
    for (group, rows) in partition_by(table.rows(), group_idx) {
        for (key, cluster) in partition_by(&rows, key_idx) {
            if cluster.len() > 1 {
                clusters.push(DuplicateCluster {
                    group: group.clone(),
                    key,
                    rows: cluster,
                });
            }
        }
    }
    Ok(DuplicateReport { clusters })
}

/// Apply `strategy` to every duplicate cluster of `table`.
///
/// Rows are partitioned by the group column (stable, first-seen group
/// order), then by key within each group. Singleton clusters pass through
/// unchanged; each duplicate cluster is replaced by the strategy's output at
/// the position of the key's first occurrence. Downstream aggregation treats
/// that first-occurrence order as the canonical key order, so it must
/// survive resolution intact.
pub fn resolve_duplicates(
    table: &RowTable,
    group_column: &str,
    key_column: &str,
    strategy: &ResolutionStrategy,
) -> Result<RowTable, SchemaError> {
    let group_idx = column_index(table, group_column)?;
    let key_idx = column_index(table, key_column)?;

    let mut resolved: Vec<Row> = Vec::new();
    for (group, rows) in partition_by(table.rows(), group_idx) {
        let mut kept = 0usize;
        for (_key, cluster) in partition_by(&rows, key_idx) {
            if cluster.len() == 1 {
                resolved.extend(cluster);
                kept += 1;
            } else {
                let survivors = strategy.resolve(&cluster);
                kept += survivors.len();
                resolved.extend(survivors);
            }
        }
        log::debug!(
            "group '{group}': {} of {} rows survive {} resolution",
            kept,
            rows.len(),
            strategy.name()
        );
    }
    Ok(table.with_rows(resolved))
}

/// Drop the rows whose position in the originally uploaded file is listed in
/// `indices`, keeping everything else in order.
///
/// This is the explicit-review path: the operator inspects a
/// [`DuplicateReport`] and names the rows to discard instead of delegating
/// to a strategy.
pub fn remove_rows(table: &RowTable, indices: &BTreeSet<usize>) -> RowTable {
    let kept = table
        .rows()
        .iter()
        .filter(|row| !indices.contains(&row.source_index()))
        .cloned()
        .collect();
    table.with_rows(kept)
}
