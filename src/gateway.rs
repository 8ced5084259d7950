//! Step execution and free-form help collaborators.
//!
//! The walkthrough core never runs anything itself. Callers hand a step to an
//! [`ExecutionGateway`] and pass the reported outcome to the session tracker.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{ExecutionOutcome, ProjectKey, Step};
use crate::walkthrough::StepKind;

/// Where the user is driving the walkthrough from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    #[default]
    Cli,
    Web,
    Vscode,
}

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub project_key: ProjectKey,
    pub project_path: String,
    pub interface: Interface,
}

/// Performs (or simulates) the action behind a step.
///
/// Timeouts and retries belong to the implementation; the caller only sees
/// the final outcome.
#[async_trait]
pub trait ExecutionGateway: Send + Sync {
    async fn execute(&self, step: &Step, context: &ExecutionContext) -> ExecutionOutcome;
}

/// Something a step needs from the machine that runs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    Git,
    Python,
    VirtualEnv,
}

impl Prerequisite {
    pub fn label(self) -> &'static str {
        match self {
            Self::Git => "Git installed",
            Self::Python => "Python installed",
            Self::VirtualEnv => "Virtual environment activated",
        }
    }

    pub fn remedy(self) -> &'static str {
        match self {
            Self::Git => "Install Git from https://git-scm.com",
            Self::Python => "Install Python from https://python.org",
            Self::VirtualEnv => {
                "Run: source venv/bin/activate (Linux/Mac) or venv\\Scripts\\activate (Windows)"
            }
        }
    }

    /// Host requirements of a step, looked up by its title.
    pub fn for_step(step: &Step) -> &'static [Prerequisite] {
        match StepKind::from_title(&step.title) {
            Some(StepKind::CloneRepository) => &[Self::Git],
            Some(StepKind::CreateVirtualEnvironment) => &[Self::Python],
            Some(StepKind::InstallPythonDependencies) => &[Self::Python, Self::VirtualEnv],
            _ => &[],
        }
    }
}

/// Answers prerequisite questions about the host a gateway runs on.
pub trait HostEnvironment: Send + Sync {
    fn has_tool(&self, name: &str) -> bool;

    fn virtualenv_active(&self) -> bool;

    fn satisfies(&self, prerequisite: Prerequisite) -> bool {
        match prerequisite {
            Prerequisite::Git => self.has_tool("git"),
            Prerequisite::Python => self.has_tool("python3") || self.has_tool("python"),
            Prerequisite::VirtualEnv => self.virtualenv_active(),
        }
    }
}

/// The current process: tools on `PATH`, `VIRTUAL_ENV` for the virtualenv.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl HostEnvironment for SystemEnvironment {
    fn has_tool(&self, name: &str) -> bool {
        which::which(name).is_ok()
    }

    fn virtualenv_active(&self) -> bool {
        std::env::var_os("VIRTUAL_ENV").is_some_and(|v| !v.is_empty())
    }
}

/// Checks a step's prerequisites, then reports what would be run without
/// running it.
#[derive(Clone)]
pub struct DryRunGateway {
    host: Arc<dyn HostEnvironment>,
}

impl Default for DryRunGateway {
    fn default() -> Self {
        Self::with_host(SystemEnvironment)
    }
}

impl DryRunGateway {
    pub fn with_host(host: impl HostEnvironment + 'static) -> Self {
        Self {
            host: Arc::new(host),
        }
    }

    fn missing_prerequisites(&self, step: &Step) -> Vec<Prerequisite> {
        Prerequisite::for_step(step)
            .iter()
            .copied()
            .filter(|p| !self.host.satisfies(*p))
            .collect()
    }
}

#[async_trait]
impl ExecutionGateway for DryRunGateway {
    async fn execute(&self, step: &Step, context: &ExecutionContext) -> ExecutionOutcome {
        let missing = self.missing_prerequisites(step);
        if !missing.is_empty() {
            tracing::warn!(
                key = %context.project_key,
                step_no = step.step_no,
                missing = ?missing,
                "step prerequisites not met"
            );
            let mut message = format!("Prerequisites not met for step {}:", step.step_no);
            for prerequisite in missing {
                message.push_str(&format!(
                    "\n- Missing: {}. {}",
                    prerequisite.label(),
                    prerequisite.remedy()
                ));
            }
            return ExecutionOutcome::failed(message);
        }

        tracing::info!(
            key = %context.project_key,
            step_no = step.step_no,
            interface = ?context.interface,
            "dry-run step execution"
        );
        match &step.command {
            Some(command) => ExecutionOutcome::succeeded(format!(
                "Dry run: would execute `{}` in {}",
                command, context.project_path
            )),
            None => ExecutionOutcome::succeeded(format!(
                "No command for '{}'; follow the guide and mark it complete",
                step.title
            )),
        }
    }
}

/// A free-form answer about a step, with the documents it drew on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Answers user questions about a step, typically backed by a retrieval
/// pipeline over the project's documentation.
#[async_trait]
pub trait AnswerEngine: Send + Sync {
    async fn answer(&self, question: &str, step: &Step) -> anyhow::Result<Answer>;
}
