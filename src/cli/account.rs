//! Account lookup CLI command handlers

use crate::cli::commands::AccountCommand;
use crate::cli::context::http_client;
use crate::core::config::Config;
use crate::error::Result;
use crate::gitea::identity::{IdentityRegistry, GITEA_TAG};

/// Handle account commands
pub async fn handle_account(command: AccountCommand) -> Result<()> {
    match command {
        AccountCommand::Whois { sub } => handle_whois(&sub).await,
    }
}

async fn handle_whois(sub: &str) -> Result<()> {
    let config = Config::load()?;
    let registry = IdentityRegistry::with_gitea(http_client(&config)?, config.identity_retry.policy());

    let identity = registry.resolve(&account_id(sub)).await?;

    println!("{}", identity.name);
    println!("  Id:     {}", identity.id);
    if !identity.image_url.is_empty() {
        println!("  Avatar: {}", identity.image_url);
    }
    Ok(())
}

/// Prefix a bare `https://host/username` with the Gitea tag
fn account_id(input: &str) -> String {
    match input.split_once(':') {
        Some((_, rest)) if !rest.starts_with("//") => input.to_string(),
        _ => format!("{}:{}", GITEA_TAG, input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_id_prefixing() {
        assert_eq!(
            account_id("https://git.example.com/alice"),
            "gt:https://git.example.com/alice"
        );
        assert_eq!(
            account_id("gt:https://git.example.com/alice"),
            "gt:https://git.example.com/alice"
        );
    }
}
