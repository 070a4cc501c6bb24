//! Gitea REST client
//!
//! Thin wrapper over `reqwest` that prefixes every path with
//! `{server}/api/v1/` and attaches `Authorization: Bearer {token}` when a
//! token is present.

use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{GiteaLinkError, Result};
use crate::gitea::auth::{normalize_server_url, AccountToken};
use crate::gitea::error_handler::check_response;

/// Profile returned by `GET user` and `GET users/{username}`
///
/// Gitea sends the name as `login` and repeats it as `username` for older
/// clients; either is accepted.
#[derive(Debug, Clone, Deserialize)]
pub struct GiteaUser {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl GiteaUser {
    /// Account username
    pub fn username(&self) -> Result<&str> {
        self.username
            .as_deref()
            .or(self.login.as_deref())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| GiteaLinkError::InvalidResponse("user profile has no username".to_string()))
    }
}

/// Gitea API client bound to one server
pub struct GiteaClient {
    http: Client,
    server_url: String,
    access_token: Option<SecretString>,
}

impl GiteaClient {
    /// Create an authenticated client for the given token
    pub fn authenticated(http: Client, token: &AccountToken) -> Self {
        Self::with_access_token(http, &token.server_url, token.access_token.clone())
    }

    /// Create an authenticated client from a bare access token
    pub fn with_access_token(http: Client, server_url: &str, access_token: SecretString) -> Self {
        Self {
            http,
            server_url: normalize_server_url(server_url),
            access_token: Some(access_token),
        }
    }

    /// Create a client for public endpoints
    pub fn anonymous(http: Client, server_url: &str) -> Self {
        Self {
            http,
            server_url: normalize_server_url(server_url),
            access_token: None,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Full URL for a path relative to the API root
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.server_url, path.trim_start_matches('/'))
    }

    fn builder(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, self.endpoint(path))
            .header("Accept", "application/json");
        match &self.access_token {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Issue a request and parse the JSON response
    pub async fn request<T, B>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut builder = self.builder(method.clone(), path);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        tracing::debug!(%method, path, server = %self.server_url, "gitea request");
        let response = check_response(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    /// GET with query parameters
    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.request::<T, ()>(Method::GET, path, query, None).await
    }

    /// The user the access token belongs to
    pub async fn current_user(&self) -> Result<GiteaUser> {
        self.get("user", &[]).await
    }

    /// Public profile of a user
    pub async fn user(&self, username: &str) -> Result<GiteaUser> {
        let path = format!("users/{}", urlencoding::encode(username));
        self.get(&path, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_is_prefixed_with_api_root() {
        let client = GiteaClient::anonymous(Client::new(), "https://git.example.com/");
        assert_eq!(
            client.endpoint("repos/org/repo/commits"),
            "https://git.example.com/api/v1/repos/org/repo/commits"
        );
        assert_eq!(client.endpoint("/user"), "https://git.example.com/api/v1/user");
    }

    #[test]
    fn test_user_accepts_login_or_username() {
        let user: GiteaUser =
            serde_json::from_str(r#"{"login":"alice","avatar_url":"https://a/png"}"#).unwrap();
        assert_eq!(user.username().unwrap(), "alice");
        assert_eq!(user.avatar_url.as_deref(), Some("https://a/png"));

        let user: GiteaUser =
            serde_json::from_str(r#"{"login":"bob","username":"bob","id":3}"#).unwrap();
        assert_eq!(user.username().unwrap(), "bob");

        let user: GiteaUser = serde_json::from_str(r#"{"id":3}"#).unwrap();
        assert!(user.username().is_err());
    }
}
