use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::session::ProjectKey;

/// An append-only log entry recording one attempt to execute a step.
///
/// Entries are written whatever the outcome; only successful attempts also
/// mark the step complete on the walkthrough's progress record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: Uuid,
    pub project_key: ProjectKey,
    pub step_no: u32,
    pub success: bool,
    pub message: String,
    pub executed_at: DateTime<Utc>,
}

/// What an execution gateway reports back after running (or simulating) a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub message: String,
}

impl ExecutionOutcome {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
