use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::step::Step;

/// Identifies one user's walkthrough of one project.
///
/// Keys are derived from the project path and user id, so the same user
/// walking the same checkout always lands on the same progress record.
///
/// The user id is the text after the last `:`. Any `:` or `%` inside it is
/// percent-escaped, so distinct (path, user) pairs never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectKey(String);

/// User id assumed when a caller does not supply one.
pub const DEFAULT_USER: &str = "default_user";

impl ProjectKey {
    pub fn new(project_path: &str, user_id: &str) -> Self {
        let user_id = if user_id.trim().is_empty() {
            DEFAULT_USER
        } else {
            user_id
        };
        let user_id = user_id.replace('%', "%25").replace(':', "%3A");
        Self(format!("{}:{}", project_path.trim_end_matches('/'), user_id))
    }

    /// Wrap an already-derived key, e.g. one read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-user, per-project walkthrough progress.
///
/// Owned exclusively by the session tracker. `revision` increases on every
/// write and is what compare-and-swap updates are checked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    pub project_key: ProjectKey,
    pub status: SessionStatus,
    pub completed_steps: BTreeSet<u32>,
    pub total_steps: u32,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

/// The status of a walkthrough.
///
/// - `Active`: Steps remain (or no plan has been registered yet)
/// - `Completed`: Every step of the registered plan has been completed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl SessionProgress {
    /// A fresh, active record with nothing completed.
    pub fn fresh(project_key: ProjectKey, now: DateTime<Utc>) -> Self {
        Self {
            project_key,
            status: SessionStatus::Active,
            completed_steps: BTreeSet::new(),
            total_steps: 0,
            started_at: now,
            last_activity: now,
            revision: 0,
        }
    }

    /// Whether every step in `1..=total_steps` has been completed.
    ///
    /// Completed step numbers above `total_steps` are ignored.
    pub fn covers_plan(&self) -> bool {
        self.total_steps > 0 && (1..=self.total_steps).all(|n| self.completed_steps.contains(&n))
    }

    /// Lowest step number in `1..=total_steps` not yet completed.
    pub fn next_step_no(&self) -> Option<u32> {
        (1..=self.total_steps).find(|n| !self.completed_steps.contains(n))
    }

    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// Progress plus the steps still to do, as returned when resuming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeState {
    pub progress: SessionProgress,
    /// Steps of the last generated plan not yet completed, ascending by number.
    pub pending_steps: Vec<Step>,
}

impl ResumeState {
    pub fn next_step(&self) -> Option<&Step> {
        self.pending_steps.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_key_joins_path_and_user() {
        let key = ProjectKey::new("/work/shop/", "ana");
        assert_eq!(key.as_str(), "/work/shop:ana");
    }

    #[test]
    fn project_key_defaults_blank_user() {
        let key = ProjectKey::new("/work/shop", "  ");
        assert_eq!(key.as_str(), "/work/shop:default_user");
    }

    #[test]
    fn colons_cannot_shift_between_path_and_user() {
        let a = ProjectKey::new("/work/a:b", "c");
        let b = ProjectKey::new("/work/a", "b:c");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "/work/a:b:c");
        assert_eq!(b.as_str(), "/work/a:b%3Ac");
    }

    #[test]
    fn escaped_user_ids_do_not_collide_with_literal_ones() {
        let escaped = ProjectKey::new("/work/a", "b:c");
        let literal = ProjectKey::new("/work/a", "b%3Ac");
        assert_ne!(escaped, literal);
    }

    #[test]
    fn covers_plan_requires_a_registered_plan() {
        let progress = SessionProgress::fresh(ProjectKey::from_raw("k"), Utc::now());
        assert!(!progress.covers_plan());
    }

    #[test]
    fn covers_plan_ignores_steps_beyond_total() {
        let mut progress = SessionProgress::fresh(ProjectKey::from_raw("k"), Utc::now());
        progress.total_steps = 2;
        progress.completed_steps.extend([1, 3, 9]);
        assert!(!progress.covers_plan());
        assert_eq!(progress.next_step_no(), Some(2));

        progress.completed_steps.insert(2);
        assert!(progress.covers_plan());
        assert_eq!(progress.next_step_no(), None);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [SessionStatus::Active, SessionStatus::Completed] {
            assert_eq!(SessionStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::from_str("not_started"), None);
    }
}
