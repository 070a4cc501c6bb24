//! Terminal implementations of the token manager collaborators

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use url::Url;

use crate::core::token_manager::{AccountListener, Modal, ModalPrompt};
use crate::error::{GiteaLinkError, Result};
use crate::gitea::auth::{AccountToken, AuthorizationCode, AuthorizationFlow, AuthorizationRequest};
use crate::gitea::error_handler::open_browser;

/// Read one trimmed line from stdin; `None` at end of input
///
/// Goes through the process-wide stdin buffer, so piped answers for later
/// prompts stay available.
async fn read_line() -> Result<Option<String>> {
    tokio::task::spawn_blocking(|| read_trimmed_line(&mut io::stdin().lock()))
        .await
        .map_err(|e| GiteaLinkError::Io(io::Error::other(e)))?
}

fn read_trimmed_line(reader: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Authorization through the system browser and a pasted redirect
pub struct TerminalAuthorization;

#[async_trait]
impl AuthorizationFlow for TerminalAuthorization {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<AuthorizationCode> {
        println!("Open this URL in your browser to authorize gitea-link:");
        println!("  {}", request.authorize_url);
        println!();

        if open_browser(request.authorize_url.as_str()) {
            println!("✓ Browser opened automatically.");
        }

        println!("After approving, Gitea redirects to {}.", request.redirect_uri);
        print!("Paste the full redirect URL (or just the code) here: ");
        io::stdout().flush()?;

        match read_line().await? {
            Some(input) => parse_authorization_response(&input, &request.state),
            None => Err(GiteaLinkError::AuthorizationCancelled),
        }
    }
}

/// Extract the authorization code from what the user pasted
///
/// Accepts either the redirect URL, whose `state` must match, or the bare
/// code. Empty input and a denied request count as cancellation.
pub fn parse_authorization_response(input: &str, expected_state: &str) -> Result<AuthorizationCode> {
    let input = input.trim();
    if input.is_empty() {
        return Err(GiteaLinkError::AuthorizationCancelled);
    }

    let Ok(url) = Url::parse(input) else {
        return Ok(AuthorizationCode {
            code: input.to_string(),
        });
    };

    let param = |name: &str| {
        url.query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        if error == "access_denied" {
            return Err(GiteaLinkError::AuthorizationCancelled);
        }
        let description = param("error_description").unwrap_or_default();
        return Err(GiteaLinkError::AuthenticationFailed(
            format!("{} {}", error, description).trim().to_string(),
        ));
    }

    if param("state").as_deref() != Some(expected_state) {
        return Err(GiteaLinkError::AuthenticationFailed(
            "state parameter does not match the request".to_string(),
        ));
    }

    param("code")
        .filter(|code| !code.is_empty())
        .map(|code| AuthorizationCode { code })
        .ok_or_else(|| {
            GiteaLinkError::AuthenticationFailed("redirect URL carries no code".to_string())
        })
}

/// Asks on the terminal before sending the user back to the provider
pub struct TerminalModal;

#[async_trait]
impl ModalPrompt for TerminalModal {
    async fn open(&self, modal: Modal) -> Result<()> {
        match modal {
            Modal::ProviderRedirection { name } => {
                eprintln!();
                eprintln!("Your {} session has expired.", name);
                eprint!("Sign in to {} again now? [Y/n] ", name);
                io::stderr().flush()?;
            }
        }

        let answer = read_line().await?.unwrap_or_else(|| "n".to_string());
        if is_yes(&answer) {
            Ok(())
        } else {
            Err(GiteaLinkError::Cancelled)
        }
    }
}

fn is_yes(answer: &str) -> bool {
    let answer = answer.trim().to_lowercase();
    answer.is_empty() || answer == "y" || answer == "yes"
}

/// Prints a notice when an account is linked for the first time
pub struct ConsoleListener;

impl AccountListener for ConsoleListener {
    fn account_added(&self, token: &AccountToken) {
        eprintln!("✓ New account linked: {} ({})", token.name, token.sub);
    }
}
