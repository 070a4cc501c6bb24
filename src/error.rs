//! Custom error types for gitea-link
//!
//! User-friendly error messages for all failure scenarios.

use thiserror::Error;

/// Main error type for the gitea-link application
#[derive(Error, Debug)]
pub enum GiteaLinkError {
    /// Not running in a git repository
    #[error("This directory is not a git repository.\n\n  → Pass --repo owner/name, or run the command inside a clone.")]
    NotGitRepository,

    /// No usable remote found
    #[error("No 'origin' remote found in this repository.\n\n  → Run 'git remote -v' to check your remotes, or pass --repo owner/name.")]
    NoRemote,

    /// Remote URL could not be parsed into owner/name
    #[error("Cannot parse repository URL: {0}\n\n  → Expected format: https://host/owner/repo or git@host:owner/repo")]
    InvalidRemoteUrl(String),

    /// No account is linked yet
    #[error("No Gitea account is linked.\n\n  → Run 'gitea-link auth login' to link one.")]
    NotAuthenticated,

    /// The token handed to an operation belongs to an account that is not stored
    #[error("Account '{0}' is not linked on this machine.\n\n  → Run 'gitea-link auth status' to see linked accounts.")]
    AccountNotLinked(String),

    /// Authentication process failed
    #[error("Gitea authentication failed: {0}\n\n  → Try running 'gitea-link auth login' again.")]
    AuthenticationFailed(String),

    /// The user abandoned the interactive authorization step
    #[error("Authorization was cancelled before it completed.")]
    AuthorizationCancelled,

    /// The account resolved by the provider is not the one being re-authorized
    #[error("Gitea account ID not expected: authorized as '{actual}' while re-authorizing '{expected}'.\n\n  → Sign in to the provider as the expected user and try again.")]
    IdentityMismatch { expected: String, actual: String },

    /// Silent refresh failed while the system is offline
    #[error("Could not refresh the Gitea token while offline: {0}\n\n  → Reconnect and run the command again.")]
    OfflineRefreshFailure(String),

    /// Silent refresh failed and the user did not re-authorize
    #[error("Your {provider} session has expired and must be re-authorized.\n\n  → Run 'gitea-link auth refresh' to sign in again.")]
    ReauthRequired { provider: String },

    /// Identity lookup: the account does not exist on the server
    #[error("Account '{0}' was not found on the server.")]
    NotFound(String),

    /// Identity lookup failed for a reason worth retrying later
    #[error("Temporary failure while looking up '{id}': {reason}\n\n  → Try again in a few minutes.")]
    Transient { id: String, reason: String },

    /// Gitea API error carrying the HTTP status
    #[error("Gitea API request failed (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Unexpected response from Gitea: {0}")]
    InvalidResponse(String),

    /// Git operation error
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    /// Credential storage error
    #[error("Cannot access secure storage: {0}\n\n  → On macOS: Make sure Keychain Access is available.\n  → On Linux: Ensure a secret service (like gnome-keyring) is running.")]
    Credential(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),

    /// Network request error
    #[error("Network request failed: {0}\n\n  → Check your internet connection.")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization/deserialization error
    #[error("Configuration file is invalid: {0}")]
    Toml(String),

    /// Invalid input from user
    #[error("{0}")]
    InvalidInput(String),

    /// Operation cancelled by user
    #[error("Operation cancelled.")]
    Cancelled,
}

impl GiteaLinkError {
    /// Whether the failure is worth retrying after a backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self, GiteaLinkError::Transient { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GiteaLinkError::Api { status, .. } => Some(*status),
            GiteaLinkError::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<keyring::Error> for GiteaLinkError {
    fn from(err: keyring::Error) -> Self {
        GiteaLinkError::Credential(err.to_string())
    }
}

impl From<toml::de::Error> for GiteaLinkError {
    fn from(err: toml::de::Error) -> Self {
        GiteaLinkError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for GiteaLinkError {
    fn from(err: toml::ser::Error) -> Self {
        GiteaLinkError::Toml(err.to_string())
    }
}

impl From<base64::DecodeError> for GiteaLinkError {
    fn from(err: base64::DecodeError) -> Self {
        GiteaLinkError::InvalidResponse(format!("file content is not valid base64: {}", err))
    }
}

/// Result type alias using GiteaLinkError
pub type Result<T> = std::result::Result<T, GiteaLinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_is_retryable() {
        let transient = GiteaLinkError::Transient {
            id: "https://git.example.com/alice".to_string(),
            reason: "503".to_string(),
        };
        assert!(transient.is_transient());
        assert!(!GiteaLinkError::NotFound("x".to_string()).is_transient());
        assert!(!GiteaLinkError::Api {
            status: 500,
            message: "boom".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_identity_mismatch_message_names_both_accounts() {
        let err = GiteaLinkError::IdentityMismatch {
            expected: "https://git.example.com/alice".to_string(),
            actual: "https://git.example.com/bob".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("alice"));
        assert!(message.contains("bob"));
    }

    #[test]
    fn test_api_status_is_exposed() {
        let err = GiteaLinkError::Api {
            status: 409,
            message: "sha mismatch".to_string(),
        };
        assert_eq!(err.status(), Some(409));
        assert_eq!(GiteaLinkError::Cancelled.status(), None);
    }
}
