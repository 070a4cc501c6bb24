//! Application configuration management
//!
//! Handles loading and saving application settings including:
//! - Gitea server and OAuth application registration
//! - Commit message templates for file operations
//! - Identity lookup retry budget

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::retry::RetryPolicy;
use crate::error::{GiteaLinkError, Result};

/// Redirect URI registered for the OAuth application by default
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8734/oauth/callback";

/// Placeholder replaced by the file path in commit message templates
pub const PATH_PLACEHOLDER: &str = "{{path}}";

/// Commit message templates for file operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitMessages {
    pub create_file: String,
    pub update_file: String,
    pub delete_file: String,
}

impl Default for CommitMessages {
    fn default() -> Self {
        Self {
            create_file: "Create {{path}}".to_string(),
            update_file: "Update {{path}}".to_string(),
            delete_file: "Delete {{path}}".to_string(),
        }
    }
}

impl CommitMessages {
    /// Substitute the literal file path into a template
    pub fn render(template: &str, path: &str) -> String {
        template.replace(PATH_PLACEHOLDER, path)
    }

    pub fn create(&self, path: &str) -> String {
        Self::render(&self.create_file, path)
    }

    pub fn update(&self, path: &str) -> String {
        Self::render(&self.update_file, path)
    }

    pub fn delete(&self, path: &str) -> String {
        Self::render(&self.delete_file, path)
    }
}

/// Retry budget for identity lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            ..RetryPolicy::default()
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the Gitea instance used for new accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,

    /// OAuth2 client id registered on that instance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Branch used when none is given and none can be detected
    #[serde(default = "default_branch")]
    pub default_branch: String,

    #[serde(default)]
    pub commit_messages: CommitMessages,

    #[serde(default)]
    pub identity_retry: RetrySettings,

    /// Timeout for every HTTP request in seconds
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            application_id: None,
            redirect_uri: default_redirect_uri(),
            default_branch: default_branch(),
            commit_messages: CommitMessages::default(),
            identity_retry: RetrySettings::default(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if not exists
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;

        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the configuration directory
    pub fn config_dir() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("io", "gitea-link", "gitea-link")
            .ok_or_else(|| GiteaLinkError::Config("Could not determine config directory".into()))?;

        Ok(project_dirs.config_dir().to_path_buf())
    }

    /// Server URL, failing with a hint when it was never configured
    pub fn require_server_url(&self) -> Result<&str> {
        self.server_url.as_deref().ok_or_else(|| {
            GiteaLinkError::Config(
                "No Gitea server configured.\n\n  → Run 'gitea-link config set server-url https://git.example.com' or pass --server."
                    .to_string(),
            )
        })
    }

    /// Application id, failing with a hint when it was never configured
    pub fn require_application_id(&self) -> Result<&str> {
        self.application_id.as_deref().ok_or_else(|| {
            GiteaLinkError::Config(
                "No OAuth application id configured.\n\n  → Run 'gitea-link config set application-id ID' or pass --application-id."
                    .to_string(),
            )
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
