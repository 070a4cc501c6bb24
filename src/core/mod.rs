//! Core functionality for gitea-link
//!
//! This module contains shared business logic including:
//! - Git repository operations
//! - Repository context detection
//! - Token storage
//! - Token lifecycle management
//! - Application configuration
//! - Retry policy

pub mod config;
pub mod credentials;
pub mod git;
pub mod repository;
pub mod retry;
pub mod token_manager;

pub use config::Config;
pub use credentials::{
    CredentialStore, DocumentTokenStore, KeyringTokenStore, MemoryTokenStore, TokenDocument,
    TokenStore,
};
pub use git::GitRepository;
pub use repository::RepositoryContext;
pub use retry::RetryPolicy;
pub use token_manager::TokenManager;
