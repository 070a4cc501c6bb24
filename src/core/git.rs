//! Local git repository operations
//!
//! Only what is needed to default the target repository of a file command:
//! - Repository discovery
//! - Current branch
//! - Remote URL

use std::path::Path;

use git2::Repository;

use crate::error::{GiteaLinkError, Result};

/// Wrapper for local git repository operations
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Open the git repository in the current directory
    pub fn open_current_dir() -> Result<Self> {
        Self::discover(".")
    }

    /// Discover a git repository from the given path
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| GiteaLinkError::NotGitRepository)?;
        Ok(Self { repo })
    }

    /// Get the current branch name, `None` on a detached HEAD
    pub fn current_branch(&self) -> Result<Option<String>> {
        match self.repo.head() {
            Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
            Ok(_) => Ok(None),
            // Unborn HEAD (no commits yet)
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
                let branch = self
                    .repo
                    .config()
                    .and_then(|config| config.get_string("init.defaultBranch"))
                    .ok();
                Ok(branch)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get the remote URL for a given remote name
    pub fn remote_url(&self, remote_name: &str) -> Result<String> {
        let remote = self
            .repo
            .find_remote(remote_name)
            .map_err(|_| GiteaLinkError::NoRemote)?;
        remote
            .url()
            .map(|s| s.to_string())
            .ok_or(GiteaLinkError::NoRemote)
    }

    /// Get the origin remote URL
    pub fn origin_url(&self) -> Result<String> {
        self.remote_url("origin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discover_outside_repository_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            GitRepository::discover(dir.path()),
            Err(GiteaLinkError::NotGitRepository)
        ));
    }

    #[test]
    fn test_origin_url_and_unborn_branch() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        repo.remote("origin", "https://git.example.com/org/notes.git")
            .unwrap();

        let git = GitRepository::discover(dir.path()).unwrap();
        assert_eq!(
            git.origin_url().unwrap(),
            "https://git.example.com/org/notes.git"
        );
        assert!(matches!(
            git.remote_url("upstream"),
            Err(GiteaLinkError::NoRemote)
        ));
        // Unborn HEAD resolves without error
        assert!(git.current_branch().is_ok());
    }
}
