//! OAuth 2.0 authorization-code flow for Gitea
//!
//! Gitea instances are self-hosted, so every endpoint is derived from the
//! server URL of the OAuth application:
//! - `GET {server}/login/oauth/authorize` (interactive, via [`AuthorizationFlow`])
//! - `POST {server}/login/oauth/access_token` (code and refresh-token grants)

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GiteaLinkError, Result};
use crate::gitea::error_handler::check_response;

/// Access token lifetime assumed when the token endpoint omits `expires_in`
///
/// Matches Gitea's default `ACCESS_TOKEN_EXPIRATION_TIME`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// OAuth2 client registration on a Gitea server
#[derive(Debug, Clone)]
pub struct OAuthApplication {
    /// Base URL of the Gitea instance, without trailing slash
    pub server_url: String,
    /// OAuth2 client id
    pub application_id: String,
    /// OAuth2 client secret
    pub application_secret: SecretString,
}

impl OAuthApplication {
    pub fn new(
        server_url: impl AsRef<str>,
        application_id: impl Into<String>,
        application_secret: SecretString,
    ) -> Self {
        Self {
            server_url: normalize_server_url(server_url.as_ref()),
            application_id: application_id.into(),
            application_secret,
        }
    }

    /// Application credentials recorded on an existing token
    pub fn from_token(token: &AccountToken) -> Self {
        Self {
            server_url: token.server_url.clone(),
            application_id: token.application_id.clone(),
            application_secret: token.application_secret.clone(),
        }
    }
}

/// Complete token data for one linked account
///
/// This is the primary struct used internally to manage token lifecycle.
#[derive(Debug, Clone)]
pub struct AccountToken {
    /// Bearer credential for API requests
    pub access_token: SecretString,
    /// Credential for minting a new access token; absent on legacy tokens
    pub refresh_token: Option<SecretString>,
    /// When the access token expires; absent on legacy tokens
    pub expires_on: Option<DateTime<Utc>>,
    /// Base URL of the Gitea instance
    pub server_url: String,
    /// OAuth2 client id the token was issued to
    pub application_id: String,
    /// OAuth2 client secret the token was issued to
    pub application_secret: SecretString,
    /// Canonical subject, `{server_url}/{username}`
    pub sub: String,
    /// Display username
    pub name: String,
    /// Avatar URL
    pub image_url: Option<String>,
}

/// Serializable format for token storage
///
/// Field names and the millisecond `expiresOn` match the persisted account
/// token layout, so existing entries keep loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredAccountToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_on: Option<i64>,
    pub server_url: String,
    pub application_id: String,
    pub application_secret: String,
    pub sub: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
}

impl AccountToken {
    /// Convert to storable format
    pub fn to_stored(&self) -> StoredAccountToken {
        StoredAccountToken {
            access_token: self.access_token.expose_secret().to_string(),
            refresh_token: self
                .refresh_token
                .as_ref()
                .map(|t| t.expose_secret().to_string()),
            expires_on: self.expires_on.map(|at| at.timestamp_millis()),
            server_url: self.server_url.clone(),
            application_id: self.application_id.clone(),
            application_secret: self.application_secret.expose_secret().to_string(),
            sub: self.sub.clone(),
            name: self.name.clone(),
            img_url: self.image_url.clone(),
        }
    }

    /// Create from stored format
    pub fn from_stored(stored: StoredAccountToken) -> Result<Self> {
        let expires_on = match stored.expires_on {
            Some(millis) => Some(Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
                GiteaLinkError::Config(format!("Invalid token expiration timestamp: {}", millis))
            })?),
            None => None,
        };

        Ok(Self {
            access_token: SecretString::from(stored.access_token),
            refresh_token: stored.refresh_token.map(SecretString::from),
            expires_on,
            server_url: stored.server_url,
            application_id: stored.application_id,
            application_secret: SecretString::from(stored.application_secret),
            sub: stored.sub,
            name: stored.name,
            image_url: stored.img_url,
        })
    }

    /// Token issued before expiration tracking existed
    pub fn is_legacy(&self) -> bool {
        self.expires_on.is_none()
    }

    /// Whether the access token is still usable at `instant`
    pub fn is_valid_at(&self, instant: DateTime<Utc>) -> bool {
        self.expires_on.is_some_and(|expires_on| expires_on > instant)
    }
}

/// Interactive authorization request handed to an [`AuthorizationFlow`]
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationRequest {
    /// Fully built authorize URL to send the user to
    pub authorize_url: Url,
    /// Where the provider sends the user back
    pub redirect_uri: String,
    /// Anti-forgery value the redirect must echo
    pub state: String,
}

/// Code returned by the provider after the user approved the application
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationCode {
    pub code: String,
}

/// Drives the user through the provider's authorize page
///
/// Implementations return [`GiteaLinkError::AuthorizationCancelled`] when
/// the user abandons the flow.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    async fn authorize(&self, request: &AuthorizationRequest) -> Result<AuthorizationCode>;
}

/// Grant presented at the token endpoint
#[derive(Debug, Clone, Copy)]
pub enum Grant<'a> {
    AuthorizationCode(&'a str),
    RefreshToken(&'a str),
}

/// Token response from the Gitea token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl TokenResponse {
    /// Absolute expiration measured from `now`
    pub fn expires_on(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let secs = self.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        now + chrono::Duration::seconds(secs as i64)
    }
}

/// Token request body
#[derive(Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
    grant_type: &'a str,
    redirect_uri: &'a str,
}

/// OAuth client for one Gitea application registration
pub struct GiteaOAuth {
    client: Client,
    application: OAuthApplication,
    redirect_uri: String,
}

impl GiteaOAuth {
    /// Create a new OAuth client
    pub fn new(client: Client, application: OAuthApplication, redirect_uri: impl Into<String>) -> Self {
        Self {
            client,
            application,
            redirect_uri: redirect_uri.into(),
        }
    }

    pub fn application(&self) -> &OAuthApplication {
        &self.application
    }

    /// Build the interactive authorization request
    pub fn authorization_request(&self, state: impl Into<String>) -> Result<AuthorizationRequest> {
        let state = state.into();
        let base = format!("{}/login/oauth/authorize", self.application.server_url);
        let authorize_url = Url::parse_with_params(
            &base,
            &[
                ("client_id", self.application.application_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("state", state.as_str()),
            ],
        )
        .map_err(|e| GiteaLinkError::Config(format!("Invalid server URL '{}': {}", base, e)))?;

        Ok(AuthorizationRequest {
            authorize_url,
            redirect_uri: self.redirect_uri.clone(),
            state,
        })
    }

    /// Exchange a grant for an access token
    pub async fn exchange(&self, grant: Grant<'_>) -> Result<TokenResponse> {
        let (grant_type, code, refresh_token) = match grant {
            Grant::AuthorizationCode(code) => ("authorization_code", Some(code), None),
            Grant::RefreshToken(token) => ("refresh_token", None, Some(token)),
        };

        let request = TokenRequest {
            client_id: &self.application.application_id,
            client_secret: self.application.application_secret.expose_secret(),
            code,
            refresh_token,
            grant_type,
            redirect_uri: &self.redirect_uri,
        };

        let url = format!("{}/login/oauth/access_token", self.application.server_url);
        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .form(&request)
            .send()
            .await?;

        let response = check_response(response).await?;
        let token: TokenResponse = response.json().await?;
        if token.access_token.is_empty() {
            return Err(GiteaLinkError::AuthenticationFailed(
                "token endpoint returned an empty access token".to_string(),
            ));
        }
        Ok(token)
    }
}

/// Strip trailing slashes so `sub` and endpoint paths are built consistently
pub fn normalize_server_url(server_url: &str) -> String {
    server_url.trim().trim_end_matches('/').to_string()
}
