//! Authentication CLI command handlers

use chrono::{DateTime, Utc};

use crate::cli::commands::{AuthCommand, GlobalArgs};
use crate::cli::context::token_manager;
use crate::core::config::Config;
use crate::core::credentials::CredentialStore;
use crate::core::token_manager::TokenManager;
use crate::error::Result;
use crate::gitea::auth::{normalize_server_url, OAuthApplication};

/// Handle authentication commands
pub async fn handle_auth(command: AuthCommand, global: &GlobalArgs) -> Result<()> {
    let config = Config::load()?;
    let manager = token_manager(&config, global)?;

    match command {
        AuthCommand::Login {
            server,
            application_id,
        } => handle_login(&manager, config, server, application_id).await,
        AuthCommand::Logout => handle_logout(&manager, global),
        AuthCommand::Status => handle_status(&manager),
        AuthCommand::Refresh => handle_refresh(&manager, global).await,
    }
}

/// Handle the login command
async fn handle_login(
    manager: &TokenManager,
    mut config: Config,
    server: Option<String>,
    application_id: Option<String>,
) -> Result<()> {
    let server_url = match server {
        Some(server) => normalize_server_url(&server),
        None => config.require_server_url()?.to_string(),
    };
    let application_id = match application_id {
        Some(id) => id,
        None => config.require_application_id()?.to_string(),
    };
    let secret = CredentialStore::require_application_secret()?;

    println!("Linking a Gitea account on {}...\n", server_url);

    let application = OAuthApplication::new(&server_url, application_id.clone(), secret);
    let token = manager.add_account(&application).await?;

    // Remember the server for the next login
    if config.server_url.is_none() || config.application_id.is_none() {
        config.server_url.get_or_insert(server_url);
        config.application_id.get_or_insert(application_id);
        config.save()?;
    }

    println!("\n✓ Signed in to Gitea as {}", token.name);
    println!("  Account: {}", token.sub);
    if let Some(expires_on) = token.expires_on {
        println!("  {} (will auto-refresh)", describe_expiry(expires_on, Utc::now()));
    }
    Ok(())
}

/// Handle the logout command
fn handle_logout(manager: &TokenManager, global: &GlobalArgs) -> Result<()> {
    let token = manager.account(global.account.as_deref())?;
    manager.store().remove_token(&token.sub)?;
    println!("Removed {} from linked accounts.", token.sub);
    Ok(())
}

/// Handle the status command
fn handle_status(manager: &TokenManager) -> Result<()> {
    let accounts = manager.accounts()?;
    let has_secret = CredentialStore::get_application_secret()?.is_some();

    println!("Authentication Status:");
    println!(
        "  Application secret: {}",
        if has_secret { "Configured" } else { "Not configured" }
    );

    if accounts.is_empty() {
        println!("  Accounts: none linked (run 'gitea-link auth login')");
        return Ok(());
    }

    let now = Utc::now();
    for token in accounts {
        println!();
        println!("  {} ({})", token.name, token.sub);
        println!("    Token: {}", CredentialStore::mask_token(&token.access_token));
        match token.expires_on {
            Some(expires_on) => println!("    {}", describe_expiry(expires_on, now)),
            None => println!("    Legacy token (re-authorization on next use)"),
        }
    }

    Ok(())
}

/// Handle the refresh command
async fn handle_refresh(manager: &TokenManager, global: &GlobalArgs) -> Result<()> {
    let token = manager.account(global.account.as_deref())?;
    let token = manager.refresh(&token).await?;

    println!("✓ Token for {} is valid.", token.sub);
    if let Some(expires_on) = token.expires_on {
        println!("  {}", describe_expiry(expires_on, Utc::now()));
    }
    Ok(())
}

/// Human readable remaining lifetime
fn describe_expiry(expires_on: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let expires_in = expires_on.signed_duration_since(now);

    if expires_in.num_seconds() <= 0 {
        return "Token expired (will auto-refresh on next use)".to_string();
    }

    let hours = expires_in.num_hours();
    let minutes = expires_in.num_minutes() % 60;
    if hours > 0 {
        format!("Token expires in: {}h {}m", hours, minutes)
    } else {
        format!("Token expires in: {}m", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_describe_expiry() {
        let now = Utc::now();
        assert_eq!(
            describe_expiry(now + Duration::minutes(90), now),
            "Token expires in: 1h 30m"
        );
        assert_eq!(
            describe_expiry(now + Duration::minutes(4), now),
            "Token expires in: 4m"
        );
        assert!(describe_expiry(now - Duration::seconds(1), now).contains("expired"));
    }
}
