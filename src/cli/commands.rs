//! CLI command definitions using clap
//!
//! Defines the command structure for the `gitea-link` CLI tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// gitea-link - Gitea account linking and repository file access
///
/// Links Gitea accounts through OAuth, keeps their tokens fresh and reads or
/// writes repository files with them.
#[derive(Parser, Debug)]
#[command(name = "gitea-link", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Flags accepted by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Linked account to act as (https://host/username)
    #[arg(long, global = true, env = "GITEA_LINK_ACCOUNT")]
    pub account: Option<String>,

    /// Treat the network as unavailable: never fall back to interactive sign-in
    #[arg(long, global = true)]
    pub offline: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Link and manage Gitea accounts
    Auth(AuthArgs),

    /// Look up public account information
    Account(AccountArgs),

    /// List every file of a branch
    Tree(RepoArgs),

    /// Show the commit history of a file
    Commits(CommitsArgs),

    /// Create or update a file
    Upload(UploadArgs),

    /// Delete a file
    Delete(DeleteArgs),

    /// Print or save the content of a file
    Download(DownloadArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication commands
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Link a Gitea account through the browser
    Login {
        /// Gitea server URL (defaults to the configured server-url)
        #[arg(long)]
        server: Option<String>,

        /// OAuth application client id (defaults to the configured application-id)
        #[arg(long)]
        application_id: Option<String>,
    },
    /// Forget a linked account (selected with --account)
    Logout,
    /// Show linked accounts and token expiry
    Status,
    /// Refresh the token of an account now
    Refresh,
}

// ─────────────────────────────────────────────────────────────────────────────
// Account Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Account lookup commands
#[derive(Parser, Debug)]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountCommand,
}

#[derive(Subcommand, Debug)]
pub enum AccountCommand {
    /// Resolve an account id to its public profile
    Whois {
        /// Account id: https://host/username, optionally prefixed with gt:
        sub: String,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// File Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Repository selection shared by file commands
#[derive(Args, Debug, Clone, Default)]
pub struct RepoArgs {
    /// Project path such as owner/name (defaults to the origin remote)
    #[arg(long)]
    pub repo: Option<String>,

    /// Repository identifier to use as-is in API paths
    #[arg(long, conflicts_with = "repo")]
    pub project_id: Option<String>,

    /// Branch (defaults to the current branch, then to default-branch)
    #[arg(long, short)]
    pub branch: Option<String>,
}

#[derive(Parser, Debug)]
pub struct CommitsArgs {
    /// File path inside the repository
    pub path: String,

    #[command(flatten)]
    pub repo: RepoArgs,
}

#[derive(Parser, Debug)]
pub struct UploadArgs {
    /// File path inside the repository
    pub path: String,

    /// Local file to upload
    #[arg(long, short)]
    pub file: PathBuf,

    /// Content hash of the version being replaced; omit to create the file
    #[arg(long)]
    pub sha: Option<String>,

    #[command(flatten)]
    pub repo: RepoArgs,
}

#[derive(Parser, Debug)]
pub struct DeleteArgs {
    /// File path inside the repository
    pub path: String,

    /// Content hash of the version being deleted
    #[arg(long)]
    pub sha: String,

    #[command(flatten)]
    pub repo: RepoArgs,
}

#[derive(Parser, Debug)]
pub struct DownloadArgs {
    /// File path inside the repository
    pub path: String,

    /// Write the content here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub repo: RepoArgs,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config Commands
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration commands
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Set a configuration value
    Set {
        /// Configuration key
        key: ConfigKey,

        /// Configuration value
        value: String,
    },

    /// Get a configuration value
    Get {
        /// Configuration key
        key: ConfigKey,
    },

    /// Remove a configuration value
    Remove {
        /// Configuration key
        key: ConfigKey,
    },
}

/// Available configuration keys
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    /// Gitea server URL
    #[value(name = "server-url")]
    ServerUrl,

    /// OAuth application client id
    #[value(name = "application-id")]
    ApplicationId,

    /// OAuth application client secret (stored in the keyring)
    #[value(name = "application-secret")]
    ApplicationSecret,

    /// OAuth redirect URI registered for the application
    #[value(name = "redirect-uri")]
    RedirectUri,

    /// Fallback branch for file commands
    #[value(name = "default-branch")]
    DefaultBranch,

    /// Commit message template for new files
    #[value(name = "create-message")]
    CreateMessage,

    /// Commit message template for updated files
    #[value(name = "update-message")]
    UpdateMessage,

    /// Commit message template for deleted files
    #[value(name = "delete-message")]
    DeleteMessage,

    /// Attempts for account lookups
    #[value(name = "identity-retry-attempts")]
    IdentityRetryAttempts,

    /// HTTP request timeout in seconds
    #[value(name = "http-timeout")]
    HttpTimeout,
}
