//! `lookup-engine` implements the duplicate-resolution and lookup-compilation
//! pipeline over [`lookup_model`] row tables.
//!
//! The flow mirrors the operator workflow the engine serves:
//! raw rows → duplicate detection → strategy-driven resolution → group
//! aggregation → formula compilation → parent-path assignment → emitted
//! lookup entries → (external) tree insertion.
//!
//! Resolution and path assignment are temporally separate requests in the
//! hosting service (an operator reviews duplicates before supplying paths),
//! so pipeline state lives in a [`SessionStore`] keyed by session id, with a
//! per-session CSV artifact as the handoff between the two phases.

mod aggregate;
mod compile;
mod paths;
mod pipeline;
mod push;
mod resolver;
mod session;
mod strategy;

pub use aggregate::{aggregate_groups, GroupTable};
pub use compile::{compile_formula, compile_lookups, parse_formula, CompileError};
pub use paths::{assign_parent_paths, AssignError, Assignment, ParentPathMap, PathFallback};
pub use pipeline::{EmitOutput, LookupPipeline, PipelineError, PipelineState};
pub use push::{push_entries, InsertNode, NodeOutcome, PushReport, TreeInserter};
pub use resolver::{
    find_duplicates, remove_rows, resolve_duplicates, DuplicateCluster, DuplicateReport,
};
pub use session::{SessionError, SessionStore};
pub use strategy::{ResolutionStrategy, StrategyError};
