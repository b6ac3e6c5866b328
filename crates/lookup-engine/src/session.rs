use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use lookup_model::{read_csv_file, write_rows_file, CsvImportError, CsvOptions};
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::{LookupPipeline, PipelineError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(Uuid),
    #[error("session {0} has no resolved table to persist")]
    NothingToPersist(Uuid),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Import(#[from] CsvImportError),
    #[error("artifact write error: {0}")]
    Write(#[from] csv::Error),
}

/// Keyed store of in-flight pipeline sessions.
///
/// Resolution and path assignment arrive as temporally separate requests, so
/// each caller gets a session id on the first request and passes it back on
/// every later one. There is no process-wide "current dataset": two
/// operators working at the same time never see each other's state.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, LookupPipeline>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pipeline and hand back its session id.
    pub fn create(&self, pipeline: LookupPipeline) -> Uuid {
        let id = Uuid::new_v4();
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.insert(id, pipeline);
        id
    }

    /// Run `f` against the pipeline owned by `id`.
    pub fn with_session<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut LookupPipeline) -> T,
    ) -> Result<T, SessionError> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        let pipeline = sessions
            .get_mut(&id)
            .ok_or(SessionError::UnknownSession(id))?;
        Ok(f(pipeline))
    }

    /// Drop a finished or abandoned session, returning its pipeline.
    pub fn remove(&self, id: Uuid) -> Result<LookupPipeline, SessionError> {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.remove(&id).ok_or(SessionError::UnknownSession(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the resolved-table artifact for a session.
    ///
    /// Versioned by session id so concurrent sessions never collide on a
    /// shared filename.
    pub fn artifact_path(dir: &Path, id: Uuid) -> PathBuf {
        dir.join(format!("resolved-{id}.csv"))
    }

    /// Persist the session's resolved table as the phase-one artifact.
    pub fn persist_resolved(&self, dir: &Path, id: Uuid) -> Result<PathBuf, SessionError> {
        let table = self.with_session(id, |pipeline| pipeline.resolved_table().cloned())?;
        let table = table.ok_or(SessionError::NothingToPersist(id))?;
        let path = Self::artifact_path(dir, id);
        write_rows_file(&path, &table)?;
        Ok(path)
    }

    /// Re-hydrate a session at `Resolved` from its phase-one artifact.
    ///
    /// The compile request re-supplies the group/key columns (the artifact
    /// carries only the rows), and they are re-validated against the table.
    pub fn load_resolved(
        &self,
        dir: &Path,
        id: Uuid,
        group_column: &str,
        key_column: &str,
    ) -> Result<(), SessionError> {
        let table = read_csv_file(Self::artifact_path(dir, id), CsvOptions::default())?;
        let pipeline = LookupPipeline::from_resolved(table, group_column, key_column)?;
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        sessions.insert(id, pipeline);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ResolutionStrategy;
    use lookup_model::{Row, RowTable};

    fn pipeline() -> LookupPipeline {
        LookupPipeline::new(RowTable::new(
            vec!["Group".into(), "Key".into(), "Value".into()],
            vec![
                Row::new(0, vec!["A".into(), "k1".into(), "1".into()]),
                Row::new(1, vec!["A".into(), "k1".into(), "2".into()]),
            ],
        ))
    }

    #[test]
    fn unknown_session_is_an_error() {
        let store = SessionStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            store.with_session(id, |_| ()).unwrap_err(),
            SessionError::UnknownSession(bad) if bad == id
        ));
    }

    #[test]
    fn sessions_are_isolated() {
        let store = SessionStore::new();
        assert!(store.is_empty());
        let a = store.create(pipeline());
        let b = store.create(pipeline());
        assert_eq!(store.len(), 2);
        store
            .with_session(a, |p| {
                p.resolve("Group", "Key", &ResolutionStrategy::KeepFirst)
            })
            .unwrap()
            .unwrap();

        assert_eq!(
            store.with_session(a, |p| p.state_name()).unwrap(),
            "Resolved"
        );
        assert_eq!(store.with_session(b, |p| p.state_name()).unwrap(), "Loaded");
    }

    #[test]
    fn artifact_round_trip_rehydrates_the_resolved_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new();
        let id = store.create(pipeline());
        store
            .with_session(id, |p| {
                p.resolve("Group", "Key", &ResolutionStrategy::KeepLast)
            })
            .unwrap()
            .unwrap();
        let before = store
            .with_session(id, |p| p.resolved_table().cloned())
            .unwrap()
            .unwrap();

        let path = store.persist_resolved(dir.path(), id).unwrap();
        assert!(path.ends_with(format!("resolved-{id}.csv")));

        // Simulate the second request arriving against a fresh store.
        let fresh = SessionStore::new();
        fresh
            .load_resolved(dir.path(), id, "Group", "Key")
            .unwrap();
        let after = fresh
            .with_session(id, |p| p.resolved_table().cloned())
            .unwrap()
            .unwrap();
        assert_eq!(after.columns(), before.columns());
        assert_eq!(
            after.rows().iter().map(Row::values).collect::<Vec<_>>(),
            before.rows().iter().map(Row::values).collect::<Vec<_>>()
        );
    }

    #[test]
    fn persisting_an_unresolved_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new();
        let id = store.create(pipeline());
        assert!(matches!(
            store.persist_resolved(dir.path(), id).unwrap_err(),
            SessionError::NothingToPersist(bad) if bad == id
        ));
    }
}
