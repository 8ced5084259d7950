//! Request and response bodies for the walkthrough API.

use serde::{Deserialize, Serialize};

use crate::gateway::Interface;
use crate::models::*;

fn default_user() -> String {
    DEFAULT_USER.to_string()
}

/// Identifies one user's walkthrough of one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRequest {
    pub project_path: String,
    #[serde(default = "default_user")]
    pub user_id: String,
}

impl SessionRequest {
    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(&self.project_path, &self.user_id)
    }
}

/// Plan a file list without touching any session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Explicit file list. Takes precedence over `project_path`.
    #[serde(default)]
    pub files: Option<Vec<String>>,
    /// Local path or GitHub URL to list files from.
    #[serde(default)]
    pub project_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub features: FeatureSet,
    pub steps: Plan,
    pub total_steps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartWalkthroughRequest {
    pub project_path: String,
    #[serde(default = "default_user")]
    pub user_id: String,
    /// Supply the file list directly instead of listing `project_path`.
    #[serde(default)]
    pub files: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkthroughResponse {
    pub progress: SessionProgress,
    pub features: FeatureSet,
    pub steps: Plan,
    pub total_steps: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    pub project_path: String,
    #[serde(default = "default_user")]
    pub user_id: String,
    pub step_no: i64,
}

impl StepRequest {
    pub fn key(&self) -> ProjectKey {
        ProjectKey::new(&self.project_path, &self.user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteStepRequest {
    pub project_path: String,
    #[serde(default = "default_user")]
    pub user_id: String,
    pub step_no: i64,
    #[serde(default)]
    pub interface: Interface,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteStepResponse {
    pub step_no: u32,
    pub step_title: String,
    pub success: bool,
    pub message: String,
    /// Troubleshooting advice, present only when the step failed.
    #[serde(default)]
    pub guidance: Option<String>,
    pub progress: SessionProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpRequest {
    pub project_path: String,
    #[serde(default = "default_user")]
    pub user_id: String,
    pub step_no: i64,
    /// A free-form question; without one the static guide is returned.
    #[serde(default)]
    pub question: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpResponse {
    pub step_no: u32,
    pub step_title: String,
    pub help_content: String,
    pub sources: Vec<String>,
    pub related_files: Vec<String>,
    pub prerequisites: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeResponse {
    pub progress: SessionProgress,
    pub pending_steps: Vec<Step>,
    pub next_step: Option<Step>,
}

impl From<ResumeState> for ResumeResponse {
    fn from(state: ResumeState) -> Self {
        let next_step = state.next_step().cloned();
        Self {
            progress: state.progress,
            pending_steps: state.pending_steps,
            next_step,
        }
    }
}
