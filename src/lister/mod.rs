//! Project file listing.
//!
//! The walkthrough core only ever sees a flat list of relative paths. This
//! module produces that list from a local checkout or from a GitHub
//! repository without cloning it.

mod github;
mod local;

pub use github::{parse_github_source, GitHubLister};
pub use local::LocalLister;

use async_trait::async_trait;
use thiserror::Error;

/// File listing errors.
#[derive(Debug, Error)]
pub enum ListerError {
    #[error("Invalid project source: {0}")]
    InvalidSource(String),

    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unauthorized: GitHub token required or invalid")]
    Unauthorized,

    #[error("Remote error: {0}")]
    Remote(String),

    #[error("File walk did not finish: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Supplies the file paths of a project.
///
/// Paths are relative to the project root, use `/` separators, and mark
/// directories that were recorded but not descended into with a trailing `/`.
#[async_trait]
pub trait FileLister: Send + Sync {
    async fn list_project_files(&self, source: &str) -> Result<Vec<String>, ListerError>;
}

/// Lists GitHub URLs remotely and everything else from the local disk.
#[derive(Debug, Clone, Default)]
pub struct DefaultLister {
    local: LocalLister,
    github: GitHubLister,
}

impl DefaultLister {
    pub fn new(local: LocalLister, github: GitHubLister) -> Self {
        Self { local, github }
    }

    pub fn from_env() -> Self {
        Self::new(LocalLister::default(), GitHubLister::from_env())
    }
}

#[async_trait]
impl FileLister for DefaultLister {
    async fn list_project_files(&self, source: &str) -> Result<Vec<String>, ListerError> {
        if parse_github_source(source).is_some() {
            self.github.list_project_files(source).await
        } else {
            self.local.list_project_files(source).await
        }
    }
}
