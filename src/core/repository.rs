//! Repository context detection
//!
//! This module handles resolving the Gitea repository a file command targets,
//! either from explicit arguments or from the current git repository's
//! remote URL.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::core::git::GitRepository;
use crate::error::{GiteaLinkError, Result};

/// scp-like SSH remotes: `git@host:owner/repo.git`
static SCP_REMOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[\w.-]+@)?(?P<host>[\w.-]+):(?P<path>[^/].*)$").expect("valid remote regex")
});

/// Repository context for file operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryContext {
    /// Free-form project path, `owner/name` possibly with leading segments
    pub project_path: String,
    /// Current branch name, if HEAD is on a branch
    pub current_branch: Option<String>,
}

impl RepositoryContext {
    /// Detect repository context from the current directory
    pub fn detect() -> Result<Self> {
        let git_repo = GitRepository::open_current_dir()?;
        let remote_url = git_repo.origin_url()?;
        let project_path = parse_remote_url(&remote_url)?;
        let current_branch = git_repo.current_branch()?;

        Ok(Self {
            project_path,
            current_branch,
        })
    }

    /// Repository identifier used in API paths
    pub fn project_id(&self) -> String {
        project_id(&self.project_path, None)
    }
}

/// Repository identifier for API paths
///
/// A known `project_id` is used as-is; otherwise the last two `/`-delimited
/// segments of the project path are kept (`org/repo/sub` gives `repo/sub`).
pub fn project_id(project_path: &str, project_id: Option<&str>) -> String {
    if let Some(id) = project_id {
        return id.to_string();
    }

    let segments: Vec<&str> = project_path.split('/').collect();
    let start = segments.len().saturating_sub(2);
    segments[start..].join("/")
}

/// Extract the project path from a git remote URL
///
/// Supports HTTPS and SSH URL formats on any host:
/// - `https://git.example.com/owner/repo.git`
/// - `https://git.example.com/gitea/owner/repo`
/// - `git@git.example.com:owner/repo.git`
/// - `ssh://git@git.example.com:2222/owner/repo.git`
pub fn parse_remote_url(url: &str) -> Result<String> {
    let url = url.trim();

    if let Ok(parsed) = Url::parse(url) {
        if parsed.has_host() {
            return parse_project_path(url, parsed.path());
        }
    }

    if let Some(captures) = SCP_REMOTE.captures(url) {
        return parse_project_path(url, &captures["path"]);
    }

    Err(GiteaLinkError::InvalidRemoteUrl(url.to_string()))
}

/// Normalize a remote path and require at least `owner/name`
fn parse_project_path(url: &str, path: &str) -> Result<String> {
    let path = path.trim_matches('/').trim_end_matches(".git");
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() >= 2 && segments.iter().all(|s| !s.is_empty()) {
        Ok(path.to_string())
    } else {
        Err(GiteaLinkError::InvalidRemoteUrl(url.to_string()))
    }
}
