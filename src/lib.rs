//! gitea-link - Gitea account linking and repository file access
//!
//! This library keeps OAuth 2.0 tokens for self-hosted Gitea accounts fresh
//! and exposes the authenticated file, tree and commit operations built on
//! top of them. The `gitea-link` binary is a thin CLI over it.

pub mod cli;
pub mod core;
pub mod error;
pub mod gitea;

pub use error::{GiteaLinkError, Result};
