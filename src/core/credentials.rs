//! Secure credential storage using the system keyring
//!
//! This module handles secure storage of sensitive credentials:
//! - Linked account tokens, keyed by `sub`
//! - The OAuth application secret
//!
//! Uses the system keyring (macOS Keychain, Linux Secret Service) with
//! in-memory caching to minimize keychain prompts.
//!
//! ## Environment Variable Fallback
//!
//! `GITEA_APPLICATION_SECRET` overrides the stored application secret.
//!
//! Priority: env var > cache > keyring

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use keyring::Entry;
use once_cell::sync::Lazy;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{GiteaLinkError, Result};
use crate::gitea::auth::{AccountToken, StoredAccountToken};

const SERVICE_NAME: &str = "gitea-link";
const ACCOUNT_TOKENS_KEY: &str = "account_tokens";
const APPLICATION_SECRET_KEY: &str = "application_secret";

const APPLICATION_SECRET_ENV: &str = "GITEA_APPLICATION_SECRET";

/// Holds issued tokens, one per `sub`
///
/// Adding a token for a `sub` that is already present replaces it.
pub trait TokenStore: Send + Sync {
    /// Every stored token keyed by `sub`
    fn tokens_by_sub(&self) -> Result<HashMap<String, AccountToken>>;

    /// Stored token for one `sub`
    fn token(&self, sub: &str) -> Result<Option<AccountToken>> {
        Ok(self.tokens_by_sub()?.remove(sub))
    }

    /// Insert or replace the token stored under `token.sub`
    fn add_token(&self, token: &AccountToken) -> Result<()>;

    /// Forget an account; missing entries are not an error
    fn remove_token(&self, sub: &str) -> Result<()>;
}

/// In-process token store
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<HashMap<String, StoredAccountToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with the given tokens
    pub fn with_tokens(tokens: impl IntoIterator<Item = AccountToken>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.tokens.lock() {
            for token in tokens {
                map.insert(token.sub.clone(), token.to_stored());
            }
        }
        store
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.tokens.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, StoredAccountToken>>> {
        self.tokens
            .lock()
            .map_err(|_| GiteaLinkError::Credential("token store lock poisoned".to_string()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn tokens_by_sub(&self) -> Result<HashMap<String, AccountToken>> {
        decode_map(self.lock()?.clone())
    }

    fn token(&self, sub: &str) -> Result<Option<AccountToken>> {
        self.lock()?
            .get(sub)
            .cloned()
            .map(AccountToken::from_stored)
            .transpose()
    }

    fn add_token(&self, token: &AccountToken) -> Result<()> {
        self.lock()?.insert(token.sub.clone(), token.to_stored());
        Ok(())
    }

    fn remove_token(&self, sub: &str) -> Result<()> {
        self.lock()?.remove(sub);
        Ok(())
    }
}

// In-memory cache of the keyring document, shared by every keyring store
//   - None = not yet fetched from keyring
//   - Some(map) = fetched (possibly empty)
static ACCOUNT_TOKENS_CACHE: Lazy<Arc<Mutex<Option<HashMap<String, StoredAccountToken>>>>> =
    Lazy::new(|| Arc::new(Mutex::new(None)));
static APPLICATION_SECRET_CACHE: Lazy<RwLock<Option<Option<SecretString>>>> =
    Lazy::new(|| RwLock::new(None));

/// Where the serialized sub → token map is persisted
pub trait TokenDocument: Send + Sync {
    /// Current document, `None` when nothing was ever written
    fn read(&self) -> Result<Option<String>>;

    fn write(&self, json: &str) -> Result<()>;
}

/// The `account_tokens` keyring entry
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringDocument;

impl TokenDocument for KeyringDocument {
    fn read(&self) -> Result<Option<String>> {
        let entry = Entry::new(SERVICE_NAME, ACCOUNT_TOKENS_KEY)?;
        match entry.get_password() {
            Ok(json) => Ok(Some(json)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(GiteaLinkError::Credential(format!(
                "Cannot access system keychain: {}",
                e
            ))),
        }
    }

    fn write(&self, json: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, ACCOUNT_TOKENS_KEY)?;
        entry.set_password(json)?;
        Ok(())
    }
}

/// Token store keeping every account in one JSON document
///
/// The cached map and the document are only touched while the cache lock is
/// held, so concurrent writers for different `sub`s never drop each other's
/// entries.
pub struct DocumentTokenStore<D> {
    document: D,
    cache: Arc<Mutex<Option<HashMap<String, StoredAccountToken>>>>,
}

/// Token store backed by the system keyring
pub type KeyringTokenStore = DocumentTokenStore<KeyringDocument>;

impl DocumentTokenStore<KeyringDocument> {
    pub fn new() -> Self {
        Self {
            document: KeyringDocument,
            cache: Arc::clone(&ACCOUNT_TOKENS_CACHE),
        }
    }
}

impl Default for DocumentTokenStore<KeyringDocument> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: TokenDocument> DocumentTokenStore<D> {
    /// Store over any document, with its own cache
    pub fn with_document(document: D) -> Self {
        Self {
            document,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Run `update` on the current map while holding the cache lock
    ///
    /// The document is rewritten only when `update` returns true.
    fn with_map<T>(
        &self,
        update: impl FnOnce(&mut HashMap<String, StoredAccountToken>) -> (T, bool),
    ) -> Result<T> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| GiteaLinkError::Credential("token cache lock poisoned".to_string()))?;

        if cache.is_none() {
            let map = match self.document.read()? {
                Some(json) => serde_json::from_str(&json).map_err(|e| {
                    GiteaLinkError::Config(format!("Invalid stored token data: {}", e))
                })?,
                None => HashMap::new(),
            };
            *cache = Some(map);
        }

        let Some(current) = cache.as_ref() else {
            return Err(GiteaLinkError::Credential("token cache not loaded".to_string()));
        };
        let mut map = current.clone();
        let (value, changed) = update(&mut map);

        if changed {
            let json = serde_json::to_string(&map).map_err(|e| {
                GiteaLinkError::Config(format!("Failed to serialize token data: {}", e))
            })?;
            self.document.write(&json)?;
            *cache = Some(map);
        }
        Ok(value)
    }
}

impl<D: TokenDocument> TokenStore for DocumentTokenStore<D> {
    fn tokens_by_sub(&self) -> Result<HashMap<String, AccountToken>> {
        decode_map(self.with_map(|map| (map.clone(), false))?)
    }

    fn add_token(&self, token: &AccountToken) -> Result<()> {
        self.with_map(|map| {
            map.insert(token.sub.clone(), token.to_stored());
            ((), true)
        })
    }

    fn remove_token(&self, sub: &str) -> Result<()> {
        self.with_map(|map| ((), map.remove(sub).is_some()))
    }
}

fn decode_map(map: HashMap<String, StoredAccountToken>) -> Result<HashMap<String, AccountToken>> {
    map.into_iter()
        .map(|(sub, stored)| Ok((sub, AccountToken::from_stored(stored)?)))
        .collect()
}

/// Credential store for the OAuth application secret
pub struct CredentialStore;

impl CredentialStore {
    /// Store the application secret securely
    ///
    /// Updates both the keyring and the in-memory cache.
    pub fn store_application_secret(secret: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, APPLICATION_SECRET_KEY)?;
        entry.set_password(secret)?;

        if let Ok(mut cache) = APPLICATION_SECRET_CACHE.write() {
            *cache = Some(Some(SecretString::from(secret.to_string())));
        }

        Ok(())
    }

    /// Retrieve the application secret
    ///
    /// Priority: environment variable > cache > keyring
    pub fn get_application_secret() -> Result<Option<SecretString>> {
        if let Ok(secret) = std::env::var(APPLICATION_SECRET_ENV) {
            if !secret.is_empty() {
                return Ok(Some(SecretString::from(secret)));
            }
        }

        if let Ok(cache) = APPLICATION_SECRET_CACHE.read() {
            if let Some(cached_value) = cache.as_ref() {
                return Ok(cached_value.clone());
            }
        }

        let entry = Entry::new(SERVICE_NAME, APPLICATION_SECRET_KEY)?;
        let result = match entry.get_password() {
            Ok(password) => Some(SecretString::from(password)),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                return Err(GiteaLinkError::Credential(format!(
                    "Cannot access system keychain. Make sure your keyring is unlocked. ({})",
                    e
                )))
            }
        };

        if let Ok(mut cache) = APPLICATION_SECRET_CACHE.write() {
            *cache = Some(result.clone());
        }

        Ok(result)
    }

    /// Delete the stored application secret
    pub fn delete_application_secret() -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, APPLICATION_SECRET_KEY)?;
        let result = match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(GiteaLinkError::Credential(e.to_string())),
        };

        if let Ok(mut cache) = APPLICATION_SECRET_CACHE.write() {
            *cache = Some(None);
        }

        result
    }

    /// Get the application secret, returning an error if not configured
    pub fn require_application_secret() -> Result<SecretString> {
        Self::get_application_secret()?.ok_or_else(|| {
            GiteaLinkError::Config(
                "OAuth application secret is not set.\n\n  → Run 'gitea-link config set application-secret SECRET'."
                    .to_string(),
            )
        })
    }

    /// Get a masked version of a token for display (shows first 4 and last 4 chars)
    pub fn mask_token(token: &SecretString) -> String {
        let exposed = token.expose_secret();
        let chars: Vec<char> = exposed.chars().collect();
        if chars.len() <= 8 {
            "*".repeat(chars.len())
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }
}
