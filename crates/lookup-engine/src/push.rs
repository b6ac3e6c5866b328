use lookup_model::LookupEntry;
use serde::{Deserialize, Serialize};

/// One "insert node" operation for the external asset-tree service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertNode {
    pub name: String,
    pub formula: String,
    pub formula_parameters: String,
    pub parent_path: String,
}

impl From<&LookupEntry> for InsertNode {
    fn from(entry: &LookupEntry) -> Self {
        Self {
            name: entry.name.clone(),
            formula: entry.formula.clone(),
            formula_parameters: entry.formula_parameters.clone(),
            parent_path: entry.parent_path.clone(),
        }
    }
}

/// Seam to the external asset-tree service.
///
/// The service is a black box that accepts insert operations and answers
/// success or failure per node; everything behind it (addressing, batching,
/// the wire protocol) is its own concern.
pub trait TreeInserter {
    fn insert_node(&mut self, op: &InsertNode) -> Result<(), String>;
}

/// Outcome of inserting one lookup entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeOutcome {
    pub name: String,
    pub parent_path: String,
    /// `None` on success, otherwise the service's failure message.
    pub error: Option<String>,
}

/// Per-node results of pushing a lookup table to the tree service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub outcomes: Vec<NodeOutcome>,
}

impl PushReport {
    pub fn inserted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.inserted()
    }
}

/// Issue one insert operation per entry and collect per-node outcomes.
///
/// Failures are surfaced, never retried; a failed node does not stop the
/// rest of the batch.
pub fn push_entries(inserter: &mut dyn TreeInserter, entries: &[LookupEntry]) -> PushReport {
    let mut report = PushReport::default();
    for entry in entries {
        let op = InsertNode::from(entry);
        let result = inserter.insert_node(&op);
        if let Err(message) = &result {
            log::warn!(
                "tree service rejected '{}' under '{}': {message}",
                op.name,
                op.parent_path
            );
        }
        report.outcomes.push(NodeOutcome {
            name: op.name,
            parent_path: op.parent_path,
            error: result.err(),
        });
    }
    report
}
