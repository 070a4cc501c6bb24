#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use gitea_link::core::credentials::MemoryTokenStore;
use gitea_link::core::token_manager::{Modal, ModalPrompt, TokenManager};
use gitea_link::error::{GiteaLinkError, Result};
use gitea_link::gitea::auth::{
    AccountToken, AuthorizationCode, AuthorizationFlow, AuthorizationRequest,
};
use secrecy::SecretString;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Authorization flow that counts calls and hands out a fixed code
#[derive(Default)]
pub struct CountingAuthorization {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AuthorizationFlow for CountingAuthorization {
    async fn authorize(&self, _request: &AuthorizationRequest) -> Result<AuthorizationCode> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AuthorizationCode {
            code: "c1".to_string(),
        })
    }
}

/// Modal prompt that counts calls and always accepts
#[derive(Default)]
pub struct CountingPrompt {
    pub calls: AtomicUsize,
}

#[async_trait]
impl ModalPrompt for CountingPrompt {
    async fn open(&self, _modal: Modal) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Modal prompt standing in for a user who always says no
pub struct DecliningPrompt;

#[async_trait]
impl ModalPrompt for DecliningPrompt {
    async fn open(&self, _modal: Modal) -> Result<()> {
        Err(GiteaLinkError::Cancelled)
    }
}

pub fn token(server: &MockServer, access: &str, expires_in_secs: i64) -> AccountToken {
    AccountToken {
        access_token: SecretString::from(access.to_string()),
        refresh_token: Some(SecretString::from("r1")),
        expires_on: Some(Utc::now() + Duration::seconds(expires_in_secs)),
        server_url: server.uri(),
        application_id: "app-id".to_string(),
        application_secret: SecretString::from("app-secret"),
        sub: format!("{}/alice", server.uri()),
        name: "alice".to_string(),
        image_url: None,
    }
}

/// Manager over an in-memory store seeded with `tokens`
pub fn manager(tokens: Vec<AccountToken>) -> (TokenManager, Arc<MemoryTokenStore>) {
    let store = Arc::new(MemoryTokenStore::with_tokens(tokens));
    let manager = TokenManager::new(
        store.clone(),
        Arc::new(CountingAuthorization::default()),
        Arc::new(DecliningPrompt),
    );
    (manager, store)
}

pub async fn mount_user(server: &MockServer, login: &str) {
    Mock::given(method("GET"))
        .and(path("/api/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": 1,
            "login": login,
            "username": login
        })))
        .mount(server)
        .await;
}
