//! Account identity resolution
//!
//! Turns an opaque account id into a public profile. Resolvers are keyed
//! by a short provider tag (`gt` for Gitea) and collected once into an
//! [`IdentityRegistry`] at startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::core::retry::RetryPolicy;
use crate::error::{GiteaLinkError, Result};
use crate::gitea::client::{GiteaClient, GiteaUser};
use crate::gitea::error_handler::is_not_found;

/// Provider tag prefixed to Gitea account ids
pub const GITEA_TAG: &str = "gt";

/// Canonical identity of an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    /// `{tag}:{sub}`
    pub id: String,
    pub name: String,
    /// Avatar URL, empty when the provider has none
    pub image_url: String,
}

/// Resolves opaque account ids for one provider
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Provider tag this resolver is registered under
    fn tag(&self) -> &'static str;

    async fn resolve(&self, opaque_id: &str) -> Result<AccountIdentity>;
}

/// Canonical subject for an account on a server
pub fn subject(server_url: &str, username: &str) -> String {
    format!("{}/{}", server_url, username)
}

/// Split `{server_url}/{username}` at the last slash
pub fn split_subject(sub: &str) -> Result<(&str, &str)> {
    match sub.rsplit_once('/') {
        Some((server_url, username))
            if !username.is_empty() && server_url.contains("://") =>
        {
            Ok((server_url, username))
        }
        _ => Err(GiteaLinkError::InvalidInput(format!(
            "'{}' is not an account id (expected https://host/username)",
            sub
        ))),
    }
}

/// Identity for a Gitea profile
pub fn gitea_identity(server_url: &str, user: &GiteaUser) -> Result<AccountIdentity> {
    let username = user.username()?;
    Ok(AccountIdentity {
        id: format!("{}:{}", GITEA_TAG, subject(server_url, username)),
        name: username.to_string(),
        image_url: user.avatar_url.clone().unwrap_or_default(),
    })
}

/// Resolver backed by the public `users/{username}` endpoint
pub struct GiteaIdentityResolver {
    http: Client,
    retry: RetryPolicy,
}

impl GiteaIdentityResolver {
    pub fn new(http: Client) -> Self {
        Self {
            http,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Single lookup without retry
    pub async fn lookup(&self, opaque_id: &str) -> Result<AccountIdentity> {
        let (server_url, username) = split_subject(opaque_id)?;
        let client = GiteaClient::anonymous(self.http.clone(), server_url);

        let user = match client.user(username).await {
            Ok(user) => user,
            Err(err) if is_not_found(&err) => {
                return Err(GiteaLinkError::NotFound(opaque_id.to_string()))
            }
            Err(err) => {
                return Err(GiteaLinkError::Transient {
                    id: opaque_id.to_string(),
                    reason: err.to_string(),
                })
            }
        };

        gitea_identity(client.server_url(), &user).map_err(|err| GiteaLinkError::Transient {
            id: opaque_id.to_string(),
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl IdentityResolver for GiteaIdentityResolver {
    fn tag(&self) -> &'static str {
        GITEA_TAG
    }

    async fn resolve(&self, opaque_id: &str) -> Result<AccountIdentity> {
        self.retry.execute(|| self.lookup(opaque_id)).await
    }
}

/// Provider tag → resolver map, immutable once built
#[derive(Clone, Default)]
pub struct IdentityRegistry {
    resolvers: HashMap<&'static str, Arc<dyn IdentityResolver>>,
}

impl IdentityRegistry {
    pub fn builder() -> IdentityRegistryBuilder {
        IdentityRegistryBuilder::default()
    }

    /// Registry with the Gitea resolver installed
    pub fn with_gitea(http: Client, retry: RetryPolicy) -> Self {
        Self::builder()
            .register(Arc::new(GiteaIdentityResolver::new(http).with_retry(retry)))
            .build()
    }

    pub fn resolver(&self, tag: &str) -> Option<&Arc<dyn IdentityResolver>> {
        self.resolvers.get(tag)
    }

    /// Resolve a `{tag}:{opaque}` id through the matching resolver
    pub async fn resolve(&self, account_id: &str) -> Result<AccountIdentity> {
        let (tag, opaque_id) = account_id.split_once(':').ok_or_else(|| {
            GiteaLinkError::InvalidInput(format!("'{}' has no provider prefix", account_id))
        })?;
        let resolver = self.resolver(tag).ok_or_else(|| {
            GiteaLinkError::InvalidInput(format!("No identity resolver for provider '{}'", tag))
        })?;
        resolver.resolve(opaque_id).await
    }
}

#[derive(Default)]
pub struct IdentityRegistryBuilder {
    resolvers: HashMap<&'static str, Arc<dyn IdentityResolver>>,
}

impl IdentityRegistryBuilder {
    /// Add a resolver; a later registration for the same tag wins
    pub fn register(mut self, resolver: Arc<dyn IdentityResolver>) -> Self {
        self.resolvers.insert(resolver.tag(), resolver);
        self
    }

    pub fn build(self) -> IdentityRegistry {
        IdentityRegistry {
            resolvers: self.resolvers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_subject_keeps_scheme_and_path() {
        let (server, user) = split_subject("https://git.example.com/gitea/alice").unwrap();
        assert_eq!(server, "https://git.example.com/gitea");
        assert_eq!(user, "alice");
    }

    #[test]
    fn test_split_subject_rejects_bare_names() {
        assert!(split_subject("alice").is_err());
        assert!(split_subject("https://git.example.com/").is_err());
    }

    #[test]
    fn test_identity_is_prefixed_with_tag() {
        let user: GiteaUser = serde_json::from_str(r#"{"login":"alice"}"#).unwrap();
        let identity = gitea_identity("https://git.example.com", &user).unwrap();
        assert_eq!(identity.id, "gt:https://git.example.com/alice");
        assert_eq!(identity.name, "alice");
        assert_eq!(identity.image_url, "");
    }

    #[tokio::test]
    async fn test_registry_rejects_unknown_tag() {
        let registry = IdentityRegistry::with_gitea(Client::new(), RetryPolicy::none());
        assert!(registry.resolver(GITEA_TAG).is_some());

        let err = registry.resolve("gl:https://gitlab.example.com/alice").await.unwrap_err();
        assert!(err.to_string().contains("gl"));
    }
}
