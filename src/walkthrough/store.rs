use anyhow::Result;

use crate::models::{ExecutionRecord, PlanSnapshot, ProjectKey, SessionProgress};

/// Result of a conditional write against the progress store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasOutcome {
    /// The write went through.
    Applied,
    /// Another writer got there first; reload and try again.
    Conflict,
}

/// Durable storage backing the session tracker.
///
/// Progress records are only ever written conditionally: `insert_progress`
/// succeeds only when no record exists for the key, and `swap_progress`
/// succeeds only when the stored revision still equals `expected_revision`.
/// Errors are reserved for the store itself being unusable.
pub trait ProgressStore: Send + Sync {
    fn load_progress(&self, key: &ProjectKey) -> Result<Option<SessionProgress>>;

    fn insert_progress(&self, progress: &SessionProgress) -> Result<CasOutcome>;

    fn swap_progress(&self, expected_revision: u64, progress: &SessionProgress)
        -> Result<CasOutcome>;

    /// Replace the last generated plan for a key.
    fn save_plan(&self, snapshot: &PlanSnapshot) -> Result<()>;

    fn load_plan(&self, key: &ProjectKey) -> Result<Option<PlanSnapshot>>;

    fn append_execution(&self, record: &ExecutionRecord) -> Result<()>;

    /// Execution log for a key, oldest first.
    fn list_executions(&self, key: &ProjectKey) -> Result<Vec<ExecutionRecord>>;
}
