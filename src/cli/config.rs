//! Configuration CLI command handlers

use crate::cli::commands::{ConfigCommand, ConfigKey};
use crate::core::config::{CommitMessages, Config, RetrySettings};
use crate::core::credentials::CredentialStore;
use crate::error::{GiteaLinkError, Result};
use crate::gitea::auth::normalize_server_url;

/// Handle configuration commands
pub fn handle_config(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Set { key, value } => handle_set(key, value),
        ConfigCommand::Get { key } => handle_get(key),
        ConfigCommand::Remove { key } => handle_remove(key),
    }
}

/// Handle setting a configuration value
fn handle_set(key: ConfigKey, value: String) -> Result<()> {
    if key == ConfigKey::ApplicationSecret {
        CredentialStore::store_application_secret(value.trim())?;
        println!("Application secret has been stored securely.");
        return Ok(());
    }

    let mut config = Config::load()?;
    apply(&mut config, key, &value)?;
    config.save()?;

    println!("{} set to: {}", label(key), value);
    Ok(())
}

/// Handle getting a configuration value
fn handle_get(key: ConfigKey) -> Result<()> {
    if key == ConfigKey::ApplicationSecret {
        match CredentialStore::get_application_secret()? {
            Some(secret) => println!(
                "Application secret: {}",
                CredentialStore::mask_token(&secret)
            ),
            None => println!("Application secret: Not configured"),
        }
        return Ok(());
    }

    let config = Config::load()?;
    let value = current(&config, key).unwrap_or_else(|| "Not configured".to_string());
    println!("{}: {}", label(key), value);
    Ok(())
}

/// Handle removing a configuration value
fn handle_remove(key: ConfigKey) -> Result<()> {
    if key == ConfigKey::ApplicationSecret {
        CredentialStore::delete_application_secret()?;
        println!("Application secret has been removed.");
        return Ok(());
    }

    let mut config = Config::load()?;
    reset(&mut config, key);
    config.save()?;

    match current(&config, key) {
        Some(value) => println!("{} reset to default: {}", label(key), value),
        None => println!("{} has been removed.", label(key)),
    }
    Ok(())
}

fn label(key: ConfigKey) -> &'static str {
    match key {
        ConfigKey::ServerUrl => "Server URL",
        ConfigKey::ApplicationId => "Application id",
        ConfigKey::ApplicationSecret => "Application secret",
        ConfigKey::RedirectUri => "Redirect URI",
        ConfigKey::DefaultBranch => "Default branch",
        ConfigKey::CreateMessage => "Create message",
        ConfigKey::UpdateMessage => "Update message",
        ConfigKey::DeleteMessage => "Delete message",
        ConfigKey::IdentityRetryAttempts => "Identity retry attempts",
        ConfigKey::HttpTimeout => "HTTP timeout (seconds)",
    }
}

/// Write a value into the configuration
fn apply(config: &mut Config, key: ConfigKey, value: &str) -> Result<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(GiteaLinkError::InvalidInput(format!(
            "{} cannot be empty.",
            label(key)
        )));
    }

    match key {
        ConfigKey::ServerUrl => {
            url::Url::parse(value).map_err(|e| {
                GiteaLinkError::InvalidInput(format!("Invalid server URL '{}': {}", value, e))
            })?;
            config.server_url = Some(normalize_server_url(value));
        }
        ConfigKey::ApplicationId => config.application_id = Some(value.to_string()),
        ConfigKey::RedirectUri => config.redirect_uri = value.to_string(),
        ConfigKey::DefaultBranch => config.default_branch = value.to_string(),
        ConfigKey::CreateMessage => config.commit_messages.create_file = value.to_string(),
        ConfigKey::UpdateMessage => config.commit_messages.update_file = value.to_string(),
        ConfigKey::DeleteMessage => config.commit_messages.delete_file = value.to_string(),
        ConfigKey::IdentityRetryAttempts => {
            config.identity_retry.max_attempts = parse_positive(key, value)? as u32;
        }
        ConfigKey::HttpTimeout => config.http_timeout_secs = parse_positive(key, value)?,
        ConfigKey::ApplicationSecret => {
            return Err(GiteaLinkError::InvalidInput(
                "The application secret is kept in the keyring, not in the config file.".to_string(),
            ))
        }
    }
    Ok(())
}

fn parse_positive(key: ConfigKey, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 && n <= u32::MAX as u64 => Ok(n),
        _ => Err(GiteaLinkError::InvalidInput(format!(
            "{} must be a positive number, got '{}'.",
            label(key),
            value
        ))),
    }
}

/// Restore a key to its default
fn reset(config: &mut Config, key: ConfigKey) {
    let defaults = Config::default();
    match key {
        ConfigKey::ServerUrl => config.server_url = None,
        ConfigKey::ApplicationId => config.application_id = None,
        ConfigKey::RedirectUri => config.redirect_uri = defaults.redirect_uri,
        ConfigKey::DefaultBranch => config.default_branch = defaults.default_branch,
        ConfigKey::CreateMessage => {
            config.commit_messages.create_file = CommitMessages::default().create_file
        }
        ConfigKey::UpdateMessage => {
            config.commit_messages.update_file = CommitMessages::default().update_file
        }
        ConfigKey::DeleteMessage => {
            config.commit_messages.delete_file = CommitMessages::default().delete_file
        }
        ConfigKey::IdentityRetryAttempts => {
            config.identity_retry.max_attempts = RetrySettings::default().max_attempts
        }
        ConfigKey::HttpTimeout => config.http_timeout_secs = defaults.http_timeout_secs,
        ConfigKey::ApplicationSecret => {}
    }
}

/// Displayable current value
fn current(config: &Config, key: ConfigKey) -> Option<String> {
    match key {
        ConfigKey::ServerUrl => config.server_url.clone(),
        ConfigKey::ApplicationId => config.application_id.clone(),
        ConfigKey::RedirectUri => Some(config.redirect_uri.clone()),
        ConfigKey::DefaultBranch => Some(config.default_branch.clone()),
        ConfigKey::CreateMessage => Some(config.commit_messages.create_file.clone()),
        ConfigKey::UpdateMessage => Some(config.commit_messages.update_file.clone()),
        ConfigKey::DeleteMessage => Some(config.commit_messages.delete_file.clone()),
        ConfigKey::IdentityRetryAttempts => Some(config.identity_retry.max_attempts.to_string()),
        ConfigKey::HttpTimeout => Some(config.http_timeout_secs.to_string()),
        ConfigKey::ApplicationSecret => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_and_reset() {
        let mut config = Config::default();

        apply(&mut config, ConfigKey::ServerUrl, "https://git.example.com/").unwrap();
        assert_eq!(config.server_url.as_deref(), Some("https://git.example.com"));

        apply(&mut config, ConfigKey::UpdateMessage, "edit {{path}}").unwrap();
        assert_eq!(config.commit_messages.update("a.md"), "edit a.md");

        reset(&mut config, ConfigKey::UpdateMessage);
        assert_eq!(config.commit_messages.update("a.md"), "Update a.md");

        reset(&mut config, ConfigKey::ServerUrl);
        assert_eq!(current(&config, ConfigKey::ServerUrl), None);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        assert!(apply(&mut config, ConfigKey::ServerUrl, "not a url").is_err());
        assert!(apply(&mut config, ConfigKey::HttpTimeout, "0").is_err());
        assert!(apply(&mut config, ConfigKey::IdentityRetryAttempts, "many").is_err());
        assert!(apply(&mut config, ConfigKey::DefaultBranch, "  ").is_err());
        assert_eq!(config, Config::default());
    }
}
