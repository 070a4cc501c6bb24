//! CLI module for gitea-link
//!
//! This module contains all CLI command definitions and handlers using clap.

pub mod commands;
pub mod account;
pub mod auth;
pub mod config;
pub mod context;
pub mod files;
pub mod prompt;

pub use commands::{Cli, Commands};
