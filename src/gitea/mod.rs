//! Gitea integration module
//!
//! This module provides all Gitea-related functionality:
//! - OAuth 2.0 authorization-code flow and token exchange
//! - REST transport
//! - Account identity resolution
//! - Repository file operations
//! - Error classification

pub mod auth;
pub mod client;
pub mod error_handler;
pub mod files;
pub mod identity;

pub use auth::{AccountToken, AuthorizationFlow, GiteaOAuth, OAuthApplication};
pub use client::GiteaClient;
pub use error_handler::{check_response, open_browser};
pub use files::{DownloadedFile, FileOperations, RepoRef};
pub use identity::{AccountIdentity, IdentityRegistry, IdentityResolver};
