//! Token lifecycle management with automatic refresh
//!
//! Handles:
//! - First-time linking of an account through the interactive OAuth flow
//! - Checking token validity before API calls
//! - Silent refresh with the stored refresh token when the access token is
//!   about to expire
//! - Fallback to interactive re-authorization when silent refresh fails
//!
//! ## Refresh decision
//!
//! 1. The stored token for the same `sub` is the source of truth, not the
//!    one handed in
//! 2. Legacy token (no expiration) - re-authorize interactively
//! 3. Expires later than now + margin - returned as-is, no network call
//! 4. Otherwise silent refresh; on failure either surface it (offline) or
//!    prompt once and re-authorize (online)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::core::config::DEFAULT_REDIRECT_URI;
use crate::core::credentials::TokenStore;
use crate::error::{GiteaLinkError, Result};
use crate::gitea::auth::{AccountToken, AuthorizationFlow, GiteaOAuth, Grant, OAuthApplication};
use crate::gitea::client::GiteaClient;
use crate::gitea::identity::subject;

/// Tokens expiring within this window are refreshed before use
pub const TOKEN_EXPIRATION_MARGIN_SECS: i64 = 5 * 60;

/// Provider name shown when asking the user to re-authorize
pub const PROVIDER_NAME: &str = "Gitea";

/// Modal dialogs the lifecycle manager can ask the user to acknowledge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    /// About to send the user to the provider to sign in again
    ProviderRedirection { name: String },
}

/// Displays a modal and waits for the user
///
/// `Ok` once acknowledged, `Err` when the user declined.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModalPrompt: Send + Sync {
    async fn open(&self, modal: Modal) -> Result<()>;
}

/// Reports whether the network is known to be unavailable
pub trait Connectivity: Send + Sync {
    fn is_offline(&self) -> bool;
}

/// Connectivity switch set from the command line
#[derive(Debug, Default)]
pub struct OfflineFlag(AtomicBool);

impl OfflineFlag {
    pub fn new(offline: bool) -> Self {
        Self(AtomicBool::new(offline))
    }

    pub fn set(&self, offline: bool) {
        self.0.store(offline, Ordering::SeqCst);
    }
}

impl Connectivity for OfflineFlag {
    fn is_offline(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Notified once per account when it is linked for the first time
pub trait AccountListener: Send + Sync {
    fn account_added(&self, token: &AccountToken);
}

/// How a token is obtained from the provider
#[derive(Debug, Clone, Copy)]
pub enum Acquisition<'a> {
    /// Send the user through the authorize page
    Interactive,
    /// Exchange a refresh token without user interaction
    Silent { refresh_token: &'a SecretString },
}

/// Token manager for one token store
///
/// Provides transparent token refresh - callers get a valid token without
/// needing to handle expiration logic themselves.
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    authorization: Arc<dyn AuthorizationFlow>,
    prompt: Arc<dyn ModalPrompt>,
    connectivity: Arc<dyn Connectivity>,
    listener: Option<Arc<dyn AccountListener>>,
    http: Client,
    redirect_uri: String,
}

impl TokenManager {
    /// Create a manager that assumes the network is available
    pub fn new(
        store: Arc<dyn TokenStore>,
        authorization: Arc<dyn AuthorizationFlow>,
        prompt: Arc<dyn ModalPrompt>,
    ) -> Self {
        Self {
            store,
            authorization,
            prompt,
            connectivity: Arc::new(OfflineFlag::default()),
            listener: None,
            http: Client::new(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
        }
    }

    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn AccountListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Use a preconfigured HTTP client (timeouts, proxies)
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Every linked account, ordered by `sub`
    pub fn accounts(&self) -> Result<Vec<AccountToken>> {
        let mut tokens: Vec<AccountToken> = self.store.tokens_by_sub()?.into_values().collect();
        tokens.sort_by(|a, b| a.sub.cmp(&b.sub));
        Ok(tokens)
    }

    /// Pick the stored account to work with
    ///
    /// Without an explicit `sub` the only linked account is used.
    pub fn account(&self, sub: Option<&str>) -> Result<AccountToken> {
        if let Some(sub) = sub {
            return self
                .store
                .token(sub)?
                .ok_or_else(|| GiteaLinkError::AccountNotLinked(sub.to_string()));
        }

        let mut accounts = self.accounts()?;
        match accounts.len() {
            0 => Err(GiteaLinkError::NotAuthenticated),
            1 => Ok(accounts.remove(0)),
            _ => Err(GiteaLinkError::InvalidInput(format!(
                "{} accounts are linked.\n\n  → Pick one with --account (see 'gitea-link auth status').",
                accounts.len()
            ))),
        }
    }

    /// Link a new account through the interactive flow
    pub async fn add_account(&self, application: &OAuthApplication) -> Result<AccountToken> {
        self.acquire(application, None, Acquisition::Interactive).await
    }

    /// Obtain a token from the provider and store it
    ///
    /// When `expected_sub` is given the resolved account must match it,
    /// otherwise nothing is stored and [`GiteaLinkError::IdentityMismatch`]
    /// is returned.
    pub async fn acquire(
        &self,
        application: &OAuthApplication,
        expected_sub: Option<&str>,
        mode: Acquisition<'_>,
    ) -> Result<AccountToken> {
        let oauth = GiteaOAuth::new(self.http.clone(), application.clone(), &self.redirect_uri);

        let response = match mode {
            Acquisition::Interactive => {
                let request = oauth.authorization_request(Uuid::new_v4().to_string())?;
                tracing::debug!(server = %application.server_url, "starting interactive authorization");
                let code = self.authorization.authorize(&request).await?;
                oauth.exchange(Grant::AuthorizationCode(&code.code)).await?
            }
            Acquisition::Silent { refresh_token } => {
                tracing::debug!(server = %application.server_url, "exchanging refresh token");
                oauth
                    .exchange(Grant::RefreshToken(refresh_token.expose_secret()))
                    .await?
            }
        };

        let expires_on = response.expires_on(Utc::now());
        let access_token = SecretString::from(response.access_token);
        // Gitea may omit a rotated refresh token; the presented one stays usable
        let refresh_token = match (response.refresh_token, mode) {
            (Some(token), _) => Some(SecretString::from(token)),
            (None, Acquisition::Silent { refresh_token }) => Some(refresh_token.clone()),
            (None, Acquisition::Interactive) => None,
        };

        let client =
            GiteaClient::with_access_token(self.http.clone(), &application.server_url, access_token.clone());
        let user = client.current_user().await?;
        let username = user.username()?;
        let sub = subject(&application.server_url, username);

        if let Some(expected) = expected_sub {
            if expected != sub {
                tracing::warn!(expected, actual = %sub, "authorized account does not match");
                return Err(GiteaLinkError::IdentityMismatch {
                    expected: expected.to_string(),
                    actual: sub,
                });
            }
        }

        let token = AccountToken {
            access_token,
            refresh_token,
            expires_on: Some(expires_on),
            server_url: application.server_url.clone(),
            application_id: application.application_id.clone(),
            application_secret: application.application_secret.clone(),
            sub,
            name: username.to_string(),
            image_url: user.avatar_url.clone(),
        };

        let is_new = self.store.token(&token.sub)?.is_none();
        self.store.add_token(&token)?;

        if is_new {
            tracing::info!(sub = %token.sub, "account linked");
            if let Some(listener) = &self.listener {
                listener.account_added(&token);
            }
        } else {
            tracing::debug!(sub = %token.sub, "stored token replaced");
        }

        Ok(token)
    }

    /// Return a usable token for the account `token` belongs to
    ///
    /// ## Errors
    ///
    /// - `AccountNotLinked` - no stored token for that `sub`
    /// - `OfflineRefreshFailure` - silent refresh failed while offline
    /// - `ReauthRequired` - the user declined or abandoned re-authorization
    /// - `IdentityMismatch` - the provider resolved a different account
    pub async fn refresh(&self, token: &AccountToken) -> Result<AccountToken> {
        let stored = self
            .store
            .token(&token.sub)?
            .ok_or_else(|| GiteaLinkError::AccountNotLinked(token.sub.clone()))?;
        let application = OAuthApplication::from_token(&stored);

        if stored.is_legacy() {
            tracing::info!(sub = %stored.sub, "token has no expiration, re-authorizing");
            return self.reauthorize(&application, &stored.sub).await;
        }

        let deadline = Utc::now() + chrono::Duration::seconds(TOKEN_EXPIRATION_MARGIN_SECS);
        if stored.is_valid_at(deadline) {
            tracing::debug!(sub = %stored.sub, "stored token still valid");
            return Ok(stored);
        }

        let silent = match &stored.refresh_token {
            Some(refresh_token) => {
                self.acquire(
                    &application,
                    Some(&stored.sub),
                    Acquisition::Silent { refresh_token },
                )
                .await
            }
            None => Err(GiteaLinkError::AuthenticationFailed(
                "no refresh token stored for this account".to_string(),
            )),
        };

        match silent {
            Ok(refreshed) => Ok(refreshed),
            Err(err @ GiteaLinkError::IdentityMismatch { .. }) => Err(err),
            Err(err) if self.connectivity.is_offline() => {
                tracing::warn!(sub = %stored.sub, error = %err, "silent refresh failed while offline");
                Err(GiteaLinkError::OfflineRefreshFailure(err.to_string()))
            }
            Err(err) => {
                tracing::warn!(sub = %stored.sub, error = %err, "silent refresh failed, re-authorizing");
                self.reauthorize(&application, &stored.sub).await
            }
        }
    }

    /// Announce the redirection, then run the interactive flow for `sub`
    async fn reauthorize(&self, application: &OAuthApplication, sub: &str) -> Result<AccountToken> {
        let reauth_required = || GiteaLinkError::ReauthRequired {
            provider: PROVIDER_NAME.to_string(),
        };

        self.prompt
            .open(Modal::ProviderRedirection {
                name: PROVIDER_NAME.to_string(),
            })
            .await
            .map_err(|_| reauth_required())?;

        match self
            .acquire(application, Some(sub), Acquisition::Interactive)
            .await
        {
            Err(GiteaLinkError::AuthorizationCancelled) => Err(reauth_required()),
            other => other,
        }
    }
}
