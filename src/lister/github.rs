//! File listing for GitHub repositories via the git trees API.
//!
//! Configuration is via environment variables:
//! - `AIDE_GITHUB_API_URL` - API base URL (default: `https://api.github.com`)
//! - `AIDE_GITHUB_TOKEN` - token for private repositories (optional)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{FileLister, ListerError};

const DEFAULT_API_URL: &str = "https://api.github.com";

const GITHUB_PREFIXES: &[&str] = &[
    "https://github.com/",
    "http://github.com/",
    "git@github.com:",
    "github.com/",
];

#[derive(Debug, Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct TreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Lists a repository's default-branch tree without cloning it.
#[derive(Debug, Clone)]
pub struct GitHubLister {
    api_url: String,
    token: Option<String>,
    client: Client,
}

impl Default for GitHubLister {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, None)
    }
}

impl GitHubLister {
    pub fn from_env() -> Self {
        let api_url =
            std::env::var("AIDE_GITHUB_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let token = std::env::var("AIDE_GITHUB_TOKEN").ok();
        Self::new(api_url, token)
    }

    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            client: Client::new(),
        }
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.api_url, path);
        let mut req = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, "aide-walkthrough")
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }
}

#[async_trait]
impl FileLister for GitHubLister {
    async fn list_project_files(&self, source: &str) -> Result<Vec<String>, ListerError> {
        let (owner, repo) = parse_github_source(source)
            .ok_or_else(|| ListerError::InvalidSource(source.to_string()))?;

        let response = self
            .request(&format!("/repos/{}/{}/git/trees/HEAD?recursive=1", owner, repo))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => ListerError::NotFound(format!("{}/{}", owner, repo)),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ListerError::Unauthorized,
                _ => ListerError::Remote(format!("{}: {}", status, body)),
            });
        }

        let tree: TreeResponse = response.json().await?;
        if tree.truncated {
            tracing::warn!(%owner, %repo, "GitHub tree listing was truncated");
        }

        Ok(tree
            .tree
            .into_iter()
            .map(|entry| match entry.kind.as_str() {
                "tree" => format!("{}/", entry.path),
                _ => entry.path,
            })
            .collect())
    }
}

/// Split a GitHub URL or `owner/repo` shorthand into its owner and repository.
///
/// Returns `None` for anything that is not clearly a GitHub repository,
/// including local paths.
pub fn parse_github_source(source: &str) -> Option<(String, String)> {
    let rest = GITHUB_PREFIXES
        .iter()
        .find_map(|prefix| source.strip_prefix(prefix))?;
    let rest = rest.trim_end_matches('/');
    let rest = rest.strip_suffix(".git").unwrap_or(rest);

    let mut parts = rest.split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let repo = parts.next().filter(|s| !s.is_empty())?;
    Some((owner.to_string(), repo.to_string()))
}
