use std::io::BufRead;

use lookup_model::{
    import_csv_rows, CsvImportError, CsvOptions, LookupDraft, LookupEntry, RowTable, SchemaError,
};
use serde::Serialize;
use thiserror::Error;

use crate::aggregate::{aggregate_groups, GroupTable};
use crate::compile::{compile_lookups, CompileError};
use crate::paths::{assign_parent_paths, AssignError, ParentPathMap, PathFallback};
use crate::resolver::{find_duplicates, resolve_duplicates, DuplicateReport};
use crate::strategy::{ResolutionStrategy, StrategyError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline step requires state '{expected}' but the session is in state '{actual}'")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Strategy(#[from] StrategyError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Csv(#[from] CsvImportError),
}

/// Stage artifacts of one pipeline run.
///
/// Transitions only move forward; each state owns the artifact the next step
/// consumes, so a step invoked out of order has nothing to work on and is
/// rejected with [`PipelineError::InvalidState`].
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Loaded {
        table: RowTable,
    },
    Resolved {
        table: RowTable,
        group_column: String,
        key_column: String,
    },
    Aggregated {
        groups: Vec<GroupTable>,
        drafts: Vec<LookupDraft>,
    },
    PathAssigned {
        entries: Vec<LookupEntry>,
        failures: Vec<AssignError>,
    },
    Emitted,
}

impl PipelineState {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineState::Loaded { .. } => "Loaded",
            PipelineState::Resolved { .. } => "Resolved",
            PipelineState::Aggregated { .. } => "Aggregated",
            PipelineState::PathAssigned { .. } => "PathAssigned",
            PipelineState::Emitted => "Emitted",
        }
    }
}

/// Terminal output of a pipeline run: the compiled lookup table plus the
/// per-group failures cataloged along the way.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmitOutput {
    pub entries: Vec<LookupEntry>,
    pub failures: Vec<AssignError>,
}

/// Drives one row table through
/// `Loaded → Resolved → Aggregated → PathAssigned → Emitted`.
///
/// The pipeline is synchronous and single-threaded: each step fully consumes
/// its input before the next begins, and a structural error leaves the state
/// untouched so the caller can correct the request and retry without
/// re-uploading data.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupPipeline {
    state: PipelineState,
}

impl LookupPipeline {
    /// Start a pipeline from an already-imported row table.
    pub fn new(table: RowTable) -> Self {
        Self {
            state: PipelineState::Loaded { table },
        }
    }

    /// Start a pipeline by importing a CSV upload.
    pub fn from_csv<R: BufRead>(reader: R, options: CsvOptions) -> Result<Self, PipelineError> {
        Ok(Self::new(import_csv_rows(reader, options)?))
    }

    /// Re-enter a pipeline at `Resolved`, e.g. from a persisted artifact.
    ///
    /// The group/key columns are re-validated against the table since the
    /// artifact file does not carry them.
    pub fn from_resolved(
        table: RowTable,
        group_column: impl Into<String>,
        key_column: impl Into<String>,
    ) -> Result<Self, PipelineError> {
        let group_column = group_column.into();
        let key_column = key_column.into();
        table.require_columns(&[&group_column, &key_column])?;
        Ok(Self {
            state: PipelineState::Resolved {
                table,
                group_column,
                key_column,
            },
        })
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// The resolved row table, once the pipeline has passed `Resolved`.
    pub fn resolved_table(&self) -> Option<&RowTable> {
        match &self.state {
            PipelineState::Resolved { table, .. } => Some(table),
            _ => None,
        }
    }

    /// Group key/value tables, once the pipeline has aggregated.
    pub fn group_tables(&self) -> Option<&[GroupTable]> {
        match &self.state {
            PipelineState::Aggregated { groups, .. } => Some(groups),
            _ => None,
        }
    }

    /// Compiled drafts awaiting parent paths.
    pub fn drafts(&self) -> Option<&[LookupDraft]> {
        match &self.state {
            PipelineState::Aggregated { drafts, .. } => Some(drafts),
            _ => None,
        }
    }

    /// Duplicate report over the loaded table. Read-only: does not advance
    /// the state machine.
    pub fn duplicates(
        &self,
        group_column: &str,
        key_column: &str,
    ) -> Result<DuplicateReport, PipelineError> {
        match &self.state {
            PipelineState::Loaded { table } => {
                Ok(find_duplicates(table, group_column, key_column)?)
            }
            other => Err(PipelineError::InvalidState {
                expected: "Loaded",
                actual: other.name(),
            }),
        }
    }

    /// `Loaded → Resolved`: apply a duplicate-resolution strategy.
    pub fn resolve(
        &mut self,
        group_column: &str,
        key_column: &str,
        strategy: &ResolutionStrategy,
    ) -> Result<(), PipelineError> {
        match &self.state {
            PipelineState::Loaded { table } => {
                let resolved = resolve_duplicates(table, group_column, key_column, strategy)?;
                self.state = PipelineState::Resolved {
                    table: resolved,
                    group_column: group_column.to_string(),
                    key_column: key_column.to_string(),
                };
                Ok(())
            }
            other => Err(PipelineError::InvalidState {
                expected: "Loaded",
                actual: other.name(),
            }),
        }
    }

    /// `Resolved → Aggregated`: partition by group and compile each group's
    /// formula. The group/key columns bound at [`resolve`] are reused.
    ///
    /// [`resolve`]: LookupPipeline::resolve
    pub fn aggregate(&mut self, value_column: &str) -> Result<(), PipelineError> {
        match &self.state {
            PipelineState::Resolved {
                table,
                group_column,
                key_column,
            } => {
                let groups = aggregate_groups(table, group_column, key_column, value_column)?;
                let drafts = compile_lookups(&groups)?;
                self.state = PipelineState::Aggregated { groups, drafts };
                Ok(())
            }
            other => Err(PipelineError::InvalidState {
                expected: "Resolved",
                actual: other.name(),
            }),
        }
    }

    /// `Aggregated → PathAssigned`: attach caller-supplied parent paths.
    pub fn assign_paths(
        &mut self,
        paths: &ParentPathMap,
        fallback: PathFallback,
    ) -> Result<(), PipelineError> {
        match &self.state {
            PipelineState::Aggregated { drafts, .. } => {
                let assignment = assign_parent_paths(drafts.clone(), paths, fallback);
                self.state = PipelineState::PathAssigned {
                    entries: assignment.entries,
                    failures: assignment.failures,
                };
                Ok(())
            }
            other => Err(PipelineError::InvalidState {
                expected: "Aggregated",
                actual: other.name(),
            }),
        }
    }

    /// `PathAssigned → Emitted`: hand over the final lookup table.
    pub fn emit(&mut self) -> Result<EmitOutput, PipelineError> {
        match std::mem::replace(&mut self.state, PipelineState::Emitted) {
            PipelineState::PathAssigned { entries, failures } => {
                Ok(EmitOutput { entries, failures })
            }
            other => {
                let actual = other.name();
                self.state = other;
                Err(PipelineError::InvalidState {
                    expected: "PathAssigned",
                    actual,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookup_model::Row;

    fn table() -> RowTable {
        RowTable::new(
            vec!["Group".into(), "Key".into(), "Value".into()],
            vec![
                Row::new(0, vec!["A".into(), "k1".into(), "1".into()]),
                Row::new(1, vec!["A".into(), "k1".into(), "2".into()]),
                Row::new(2, vec!["A".into(), "k2".into(), "3".into()]),
            ],
        )
    }

    #[test]
    fn full_run_reaches_emitted() {
        let mut pipeline = LookupPipeline::new(table());
        pipeline
            .resolve("Group", "Key", &ResolutionStrategy::KeepFirst)
            .unwrap();
        pipeline.aggregate("Value").unwrap();
        let paths: ParentPathMap = [("A", "Plant >> Unit 1")].into_iter().collect();
        pipeline.assign_paths(&paths, PathFallback::Strict).unwrap();
        let output = pipeline.emit().unwrap();

        assert_eq!(pipeline.state_name(), "Emitted");
        assert_eq!(output.entries.len(), 1);
        assert_eq!(output.entries[0].name, "A_LookupString");
        assert_eq!(output.entries[0].formula, "[['k1', '1'], ['k2', '3']]");
        assert_eq!(output.entries[0].formula_parameters, "{}");
        assert_eq!(output.entries[0].parent_path, "Plant >> Unit 1");
        assert!(output.failures.is_empty());
    }

    #[test]
    fn aggregated_state_exposes_groups_and_drafts() {
        let mut pipeline = LookupPipeline::new(table());
        assert!(pipeline.group_tables().is_none());
        pipeline
            .resolve("Group", "Key", &ResolutionStrategy::KeepFirst)
            .unwrap();
        pipeline.aggregate("Value").unwrap();

        let groups = pipeline.group_tables().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].pairs.len(), 2);
        let drafts = pipeline.drafts().unwrap();
        assert_eq!(drafts[0].name, "A_LookupString");
    }

    #[test]
    fn steps_out_of_order_are_rejected() {
        let mut pipeline = LookupPipeline::new(table());
        let err = pipeline.aggregate("Value").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidState {
                expected: "Resolved",
                actual: "Loaded"
            }
        ));
        // The failed step leaves the state untouched.
        assert_eq!(pipeline.state_name(), "Loaded");
    }

    #[test]
    fn structural_error_keeps_the_state_for_a_retry() {
        let mut pipeline = LookupPipeline::new(table());
        let err = pipeline
            .resolve("Grp", "Key", &ResolutionStrategy::KeepFirst)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Schema(_)));
        assert_eq!(pipeline.state_name(), "Loaded");
        pipeline
            .resolve("Group", "Key", &ResolutionStrategy::KeepFirst)
            .unwrap();
        assert_eq!(pipeline.state_name(), "Resolved");
    }

    #[test]
    fn uncovered_groups_surface_in_the_emit_report() {
        let mut pipeline = LookupPipeline::new(table());
        pipeline
            .resolve("Group", "Key", &ResolutionStrategy::KeepFirst)
            .unwrap();
        pipeline.aggregate("Value").unwrap();
        pipeline
            .assign_paths(&ParentPathMap::new(), PathFallback::Strict)
            .unwrap();
        let output = pipeline.emit().unwrap();
        assert!(output.entries.is_empty());
        assert_eq!(
            output.failures,
            vec![AssignError::UncoveredGroup {
                group: "A".to_string()
            }]
        );
    }
}
