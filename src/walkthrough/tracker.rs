//! Per-user walkthrough progress.
//!
//! Every mutation is a read-modify-write against a [`ProgressStore`] guarded
//! by the record's revision. Concurrent completions for the same key merge as
//! a set union: a writer that loses the race reloads and reapplies its change.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::models::*;

use super::store::{CasOutcome, ProgressStore};

/// Attempts made before a contended write is reported as unavailable.
pub const DEFAULT_MAX_ATTEMPTS: usize = 8;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Storage unavailable: gave up on {key} after {attempts} conflicting writes")]
    StorageUnavailable { key: ProjectKey, attempts: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

enum Attempt<T> {
    Done(T),
    Retry,
}

#[derive(Clone)]
pub struct SessionTracker {
    store: Arc<dyn ProgressStore>,
    max_attempts: usize,
}

impl SessionTracker {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Current progress for a key, creating an empty active record if none exists.
    pub fn get_status(&self, key: &ProjectKey) -> Result<SessionProgress, TrackerError> {
        self.with_retries(key, |store| {
            if let Some(progress) = store.load_progress(key)? {
                return Ok(Attempt::Done(progress));
            }
            let fresh = SessionProgress::fresh(key.clone(), Utc::now());
            Ok(match store.insert_progress(&fresh)? {
                CasOutcome::Applied => {
                    tracing::info!(%key, "started walkthrough session");
                    Attempt::Done(fresh)
                }
                CasOutcome::Conflict => Attempt::Retry,
            })
        })
    }

    /// Record the size of the current plan.
    ///
    /// Completed steps are kept even when they fall outside the new total.
    /// Status is left alone; only completing a step can finish a walkthrough.
    pub fn set_total_steps(
        &self,
        key: &ProjectKey,
        total_steps: u32,
    ) -> Result<SessionProgress, TrackerError> {
        self.update(key, |progress| {
            if progress.total_steps == total_steps {
                return false;
            }
            progress.total_steps = total_steps;
            progress.last_activity = Utc::now();
            true
        })
    }

    /// Mark a step complete and finish the walkthrough once every planned step
    /// is done. Coverage is checked on every call, so re-completing a step
    /// after the plan shrank still finishes it; otherwise a repeat changes nothing.
    pub fn complete_step(
        &self,
        key: &ProjectKey,
        step_no: u32,
    ) -> Result<SessionProgress, TrackerError> {
        if step_no == 0 {
            return Err(TrackerError::InvalidArgument(
                "step_no must be a positive integer".to_string(),
            ));
        }

        let progress = self.update(key, |progress| {
            let added = progress.completed_steps.insert(step_no);
            let finished = progress.status == SessionStatus::Active && progress.covers_plan();
            if !added && !finished {
                return false;
            }
            progress.last_activity = Utc::now();
            if finished {
                progress.status = SessionStatus::Completed;
            }
            true
        })?;

        if progress.is_completed() {
            tracing::info!(%key, total = progress.total_steps, "walkthrough completed");
        } else {
            tracing::debug!(%key, step_no, "step completed");
        }
        Ok(progress)
    }

    /// Throw away all progress and start over with a fresh active record.
    ///
    /// The recorded plan is kept, and the fresh record is sized to it so the
    /// steps `resume` lists can still finish the walkthrough.
    pub fn reset(&self, key: &ProjectKey) -> Result<SessionProgress, TrackerError> {
        let total_steps = match self.store.load_plan(key)? {
            Some(snapshot) => u32::try_from(snapshot.plan.len()).map_err(|_| {
                TrackerError::InvalidArgument(format!(
                    "plan has too many steps: {}",
                    snapshot.plan.len()
                ))
            })?,
            None => 0,
        };

        let progress = self.update(key, |progress| {
            *progress = SessionProgress::fresh(progress.project_key.clone(), Utc::now());
            progress.total_steps = total_steps;
            true
        })?;
        tracing::info!(%key, total_steps, "walkthrough session reset");
        Ok(progress)
    }

    /// Progress plus the steps of the last generated plan still left to do.
    ///
    /// With no plan on record the pending list is empty.
    pub fn resume(&self, key: &ProjectKey) -> Result<ResumeState, TrackerError> {
        let progress = self.get_status(key)?;
        let pending_steps = match self.store.load_plan(key)? {
            Some(snapshot) => snapshot
                .plan
                .into_iter()
                .filter(|step| !progress.completed_steps.contains(&step.step_no))
                .collect(),
            None => Vec::new(),
        };

        Ok(ResumeState {
            progress,
            pending_steps,
        })
    }

    /// Store a freshly generated plan as the key's current plan and size the
    /// progress record to match.
    pub fn record_plan(
        &self,
        key: &ProjectKey,
        features: FeatureSet,
        plan: Plan,
    ) -> Result<(SessionProgress, PlanSnapshot), TrackerError> {
        let total_steps = u32::try_from(plan.len()).map_err(|_| {
            TrackerError::InvalidArgument(format!("plan has too many steps: {}", plan.len()))
        })?;

        let snapshot = PlanSnapshot {
            project_key: key.clone(),
            features,
            plan,
            generated_at: Utc::now(),
        };
        self.store.save_plan(&snapshot)?;

        let progress = self.set_total_steps(key, total_steps)?;
        tracing::info!(%key, total_steps, "recorded walkthrough plan");
        Ok((progress, snapshot))
    }

    /// The last plan recorded for a key, if any.
    pub fn plan_snapshot(&self, key: &ProjectKey) -> Result<Option<PlanSnapshot>, TrackerError> {
        Ok(self.store.load_plan(key)?)
    }

    /// Log the outcome an execution gateway reported for a step. Successful
    /// outcomes also complete the step.
    pub fn record_execution(
        &self,
        key: &ProjectKey,
        step_no: u32,
        outcome: ExecutionOutcome,
    ) -> Result<(ExecutionRecord, SessionProgress), TrackerError> {
        if step_no == 0 {
            return Err(TrackerError::InvalidArgument(
                "step_no must be a positive integer".to_string(),
            ));
        }

        let record = ExecutionRecord {
            id: Uuid::new_v4(),
            project_key: key.clone(),
            step_no,
            success: outcome.success,
            message: outcome.message,
            executed_at: Utc::now(),
        };
        self.store.append_execution(&record)?;

        let progress = if record.success {
            self.complete_step(key, step_no)?
        } else {
            tracing::warn!(%key, step_no, message = %record.message, "step execution failed");
            self.get_status(key)?
        };

        Ok((record, progress))
    }

    pub fn executions(&self, key: &ProjectKey) -> Result<Vec<ExecutionRecord>, TrackerError> {
        Ok(self.store.list_executions(key)?)
    }

    /// Apply `mutate` to the stored record under compare-and-swap.
    ///
    /// `mutate` returns whether it changed anything; unchanged records are not
    /// written back, which keeps repeated calls from bumping the revision.
    fn update<F>(&self, key: &ProjectKey, mut mutate: F) -> Result<SessionProgress, TrackerError>
    where
        F: FnMut(&mut SessionProgress) -> bool,
    {
        self.with_retries(key, |store| {
            let current = match store.load_progress(key)? {
                Some(progress) => progress,
                None => {
                    let fresh = SessionProgress::fresh(key.clone(), Utc::now());
                    if store.insert_progress(&fresh)? == CasOutcome::Conflict {
                        return Ok(Attempt::Retry);
                    }
                    fresh
                }
            };

            let mut next = current.clone();
            if !mutate(&mut next) {
                return Ok(Attempt::Done(current));
            }
            next.revision = current.revision + 1;

            Ok(match store.swap_progress(current.revision, &next)? {
                CasOutcome::Applied => Attempt::Done(next),
                CasOutcome::Conflict => Attempt::Retry,
            })
        })
    }

    fn with_retries<T, F>(&self, key: &ProjectKey, mut op: F) -> Result<T, TrackerError>
    where
        F: FnMut(&dyn ProgressStore) -> anyhow::Result<Attempt<T>>,
    {
        for attempt in 1..=self.max_attempts {
            match op(self.store.as_ref())? {
                Attempt::Done(value) => return Ok(value),
                Attempt::Retry => {
                    tracing::debug!(%key, attempt, "progress write conflicted, retrying")
                }
            }
        }

        tracing::error!(%key, attempts = self.max_attempts, "giving up on contended progress write");
        Err(TrackerError::StorageUnavailable {
            key: key.clone(),
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;
    use crate::walkthrough::{extract, plan};

    /// In-memory store; `conflicts` forces that many swaps to lose the race.
    #[derive(Default)]
    struct MemoryStore {
        progress: Mutex<HashMap<ProjectKey, SessionProgress>>,
        plans: Mutex<HashMap<ProjectKey, PlanSnapshot>>,
        executions: Mutex<Vec<ExecutionRecord>>,
        conflicts: AtomicUsize,
    }

    impl MemoryStore {
        fn conflicting(times: usize) -> Self {
            Self {
                conflicts: AtomicUsize::new(times),
                ..Self::default()
            }
        }
    }

    impl ProgressStore for MemoryStore {
        fn load_progress(&self, key: &ProjectKey) -> anyhow::Result<Option<SessionProgress>> {
            Ok(self.progress.lock().unwrap().get(key).cloned())
        }

        fn insert_progress(&self, progress: &SessionProgress) -> anyhow::Result<CasOutcome> {
            let mut map = self.progress.lock().unwrap();
            if map.contains_key(&progress.project_key) {
                return Ok(CasOutcome::Conflict);
            }
            map.insert(progress.project_key.clone(), progress.clone());
            Ok(CasOutcome::Applied)
        }

        fn swap_progress(
            &self,
            expected_revision: u64,
            progress: &SessionProgress,
        ) -> anyhow::Result<CasOutcome> {
            let forced = self
                .conflicts
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if forced {
                return Ok(CasOutcome::Conflict);
            }

            let mut map = self.progress.lock().unwrap();
            match map.get(&progress.project_key) {
                Some(stored) if stored.revision == expected_revision => {
                    map.insert(progress.project_key.clone(), progress.clone());
                    Ok(CasOutcome::Applied)
                }
                _ => Ok(CasOutcome::Conflict),
            }
        }

        fn save_plan(&self, snapshot: &PlanSnapshot) -> anyhow::Result<()> {
            self.plans
                .lock()
                .unwrap()
                .insert(snapshot.project_key.clone(), snapshot.clone());
            Ok(())
        }

        fn load_plan(&self, key: &ProjectKey) -> anyhow::Result<Option<PlanSnapshot>> {
            Ok(self.plans.lock().unwrap().get(key).cloned())
        }

        fn append_execution(&self, record: &ExecutionRecord) -> anyhow::Result<()> {
            self.executions.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn list_executions(&self, key: &ProjectKey) -> anyhow::Result<Vec<ExecutionRecord>> {
            Ok(self
                .executions
                .lock()
                .unwrap()
                .iter()
                .filter(|r| &r.project_key == key)
                .cloned()
                .collect())
        }
    }

    fn tracker() -> SessionTracker {
        SessionTracker::new(Arc::new(MemoryStore::default()))
    }

    fn key() -> ProjectKey {
        ProjectKey::new("/work/shop", "ana")
    }

    fn python_plan() -> (FeatureSet, Plan) {
        let features = extract(["requirements.txt", "app.py", "tests/test_app.py"]);
        let plan = plan(&features);
        (features, plan)
    }

    #[test]
    fn unknown_key_auto_vivifies() {
        let progress = tracker().get_status(&key()).unwrap();
        assert_eq!(progress.status, SessionStatus::Active);
        assert!(progress.completed_steps.is_empty());
        assert_eq!(progress.total_steps, 0);
    }

    #[test]
    fn completing_one_step_keeps_session_active() {
        let tracker = tracker();
        tracker.set_total_steps(&key(), 8).unwrap();

        tracker.complete_step(&key(), 3).unwrap();
        let progress = tracker.get_status(&key()).unwrap();

        assert_eq!(progress.completed_steps.iter().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(progress.status, SessionStatus::Active);
    }

    #[test]
    fn completing_every_step_in_any_order_completes_session() {
        let tracker = tracker();
        tracker.set_total_steps(&key(), 8).unwrap();

        for step_no in [8, 2, 5, 1, 7, 3, 6] {
            let progress = tracker.complete_step(&key(), step_no).unwrap();
            assert_eq!(progress.status, SessionStatus::Active);
        }
        let progress = tracker.complete_step(&key(), 4).unwrap();
        assert_eq!(progress.status, SessionStatus::Completed);
    }

    #[test]
    fn completing_twice_is_idempotent() {
        let tracker = tracker();
        tracker.set_total_steps(&key(), 8).unwrap();

        let once = tracker.complete_step(&key(), 2).unwrap();
        let twice = tracker.complete_step(&key(), 2).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = tracker().complete_step(&key(), 0).unwrap_err();
        assert!(matches!(err, TrackerError::InvalidArgument(_)));
    }

    #[test]
    fn nothing_completes_without_a_plan() {
        let tracker = tracker();
        let progress = tracker.complete_step(&key(), 1).unwrap();
        assert_eq!(progress.status, SessionStatus::Active);
    }

    #[test]
    fn shrinking_total_keeps_completed_steps() {
        let tracker = tracker();
        tracker.set_total_steps(&key(), 8).unwrap();
        tracker.complete_step(&key(), 7).unwrap();

        let progress = tracker.set_total_steps(&key(), 4).unwrap();
        assert_eq!(progress.total_steps, 4);
        assert!(progress.completed_steps.contains(&7));
        assert_eq!(progress.status, SessionStatus::Active);

        for step_no in 1..=4 {
            tracker.complete_step(&key(), step_no).unwrap();
        }
        assert!(tracker.get_status(&key()).unwrap().is_completed());
    }

    #[test]
    fn reset_clears_history() {
        let tracker = tracker();
        tracker.set_total_steps(&key(), 2).unwrap();
        tracker.complete_step(&key(), 1).unwrap();
        tracker.complete_step(&key(), 2).unwrap();

        tracker.reset(&key()).unwrap();
        let progress = tracker.get_status(&key()).unwrap();

        assert!(progress.completed_steps.is_empty());
        assert_eq!(progress.status, SessionStatus::Active);
        assert_eq!(progress.total_steps, 0);
    }

    #[test]
    fn recompleting_after_the_plan_shrinks_finishes_the_walkthrough() {
        let tracker = tracker();
        tracker.set_total_steps(&key(), 8).unwrap();
        for step_no in 1..=4 {
            tracker.complete_step(&key(), step_no).unwrap();
        }

        let shrunk = tracker.set_total_steps(&key(), 4).unwrap();
        assert_eq!(shrunk.status, SessionStatus::Active);

        let progress = tracker.complete_step(&key(), 3).unwrap();
        assert_eq!(progress.status, SessionStatus::Completed);
        assert_eq!(progress.completed_steps, (1..=4).collect::<std::collections::BTreeSet<u32>>());

        let again = tracker.complete_step(&key(), 3).unwrap();
        assert_eq!(again, progress);
    }

    #[test]
    fn reset_keeps_the_recorded_plan_size() {
        let tracker = tracker();
        let (features, plan) = python_plan();
        tracker.record_plan(&key(), features, plan).unwrap();
        tracker.complete_step(&key(), 1).unwrap();

        let progress = tracker.reset(&key()).unwrap();
        assert_eq!(progress.total_steps, 8);
        assert!(progress.completed_steps.is_empty());

        let pending = tracker.resume(&key()).unwrap().pending_steps;
        assert_eq!(pending.len(), 8);

        for step in &pending {
            tracker.complete_step(&key(), step.step_no).unwrap();
        }
        let state = tracker.resume(&key()).unwrap();
        assert!(state.pending_steps.is_empty());
        assert_eq!(state.progress.status, SessionStatus::Completed);
    }

    #[test]
    fn resume_lists_pending_steps_in_order() {
        let tracker = tracker();
        let (features, plan) = python_plan();
        tracker.record_plan(&key(), features, plan).unwrap();

        for step_no in [5, 1, 2] {
            tracker.complete_step(&key(), step_no).unwrap();
        }

        let state = tracker.resume(&key()).unwrap();
        let pending: Vec<u32> = state.pending_steps.iter().map(|s| s.step_no).collect();
        assert_eq!(pending, vec![3, 4, 6, 7, 8]);
        assert_eq!(state.next_step().map(|s| s.step_no), Some(3));
    }

    #[test]
    fn resume_without_plan_has_nothing_pending() {
        let state = tracker().resume(&key()).unwrap();
        assert!(state.pending_steps.is_empty());
    }

    #[test]
    fn conflicts_are_retried() {
        let tracker = SessionTracker::new(Arc::new(MemoryStore::conflicting(3)));
        tracker.get_status(&key()).unwrap();

        let progress = tracker.complete_step(&key(), 1).unwrap();
        assert!(progress.completed_steps.contains(&1));
    }

    #[test]
    fn exhausted_retries_surface_storage_unavailable() {
        let tracker =
            SessionTracker::new(Arc::new(MemoryStore::conflicting(10))).with_max_attempts(3);
        tracker.get_status(&key()).unwrap();

        let err = tracker.complete_step(&key(), 1).unwrap_err();
        assert!(matches!(err, TrackerError::StorageUnavailable { attempts: 3, .. }));
    }

    #[test]
    fn concurrent_completions_merge() {
        // Each losing writer retries at most once per competing winner.
        let tracker = tracker().with_max_attempts(64);
        tracker.set_total_steps(&key(), 16).unwrap();

        std::thread::scope(|scope| {
            for step_no in 1..=16 {
                let tracker = tracker.clone();
                scope.spawn(move || tracker.complete_step(&key(), step_no).unwrap());
            }
        });

        let progress = tracker.get_status(&key()).unwrap();
        assert_eq!(progress.completed_steps.len(), 16);
        assert!(progress.is_completed());
    }

    #[test]
    fn failed_execution_is_logged_but_not_completed() {
        let tracker = tracker();
        tracker.set_total_steps(&key(), 4).unwrap();

        let (record, progress) = tracker
            .record_execution(&key(), 2, ExecutionOutcome::failed("pip exited with 1"))
            .unwrap();
        assert!(!record.success);
        assert!(progress.completed_steps.is_empty());

        let (_, progress) = tracker
            .record_execution(&key(), 2, ExecutionOutcome::succeeded("ok"))
            .unwrap();
        assert!(progress.completed_steps.contains(&2));

        let log = tracker.executions(&key()).unwrap();
        assert_eq!(log.len(), 2);
        assert!(!log[0].success);
        assert!(log[1].success);
    }
}
