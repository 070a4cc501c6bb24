//! Wiring shared by command handlers

use std::sync::Arc;

use reqwest::Client;

use crate::cli::commands::GlobalArgs;
use crate::cli::prompt::{ConsoleListener, TerminalAuthorization, TerminalModal};
use crate::core::config::Config;
use crate::core::credentials::KeyringTokenStore;
use crate::core::token_manager::{OfflineFlag, TokenManager};
use crate::error::Result;

/// HTTP client honoring the configured timeout
pub fn http_client(config: &Config) -> Result<Client> {
    let client = Client::builder()
        .timeout(config.http_timeout())
        .user_agent(concat!("gitea-link/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Token manager backed by the keyring and the terminal
pub fn token_manager(config: &Config, global: &GlobalArgs) -> Result<TokenManager> {
    let manager = TokenManager::new(
        Arc::new(KeyringTokenStore::new()),
        Arc::new(TerminalAuthorization),
        Arc::new(TerminalModal),
    )
    .with_connectivity(Arc::new(OfflineFlag::new(global.offline)))
    .with_listener(Arc::new(ConsoleListener))
    .with_http_client(http_client(config)?)
    .with_redirect_uri(config.redirect_uri.clone());

    Ok(manager)
}
