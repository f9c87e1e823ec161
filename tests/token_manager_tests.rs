//! Integration tests for the token lifecycle.
//!
//! These tests run the token manager against a mock token endpoint and
//! verify single-flight refresh, persistence of rotated tokens and the
//! terminal state after a rejected refresh token.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use exact_online::{
    AuthError, ClientId, ClientSecret, CredentialStore, Division, ExactConfig, HostUrl,
    MemoryCredentialStore, RedirectUri, StorageError, SyncState, TokenLifecycle, TokenManager,
    TokenState,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> ExactConfig {
    ExactConfig::builder()
        .client_id(ClientId::new("client-id").unwrap())
        .client_secret(ClientSecret::new("client-secret").unwrap())
        .redirect_uri(RedirectUri::new("https://app.example.com/callback").unwrap())
        .base_url(HostUrl::new(server.uri()).unwrap())
        .build()
        .unwrap()
}

fn expired_tokens() -> TokenState {
    TokenState::new("old-access", "old-refresh", Utc::now() - ChronoDuration::minutes(1))
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "token_type": "bearer",
        "expires_in": "600"
    })
}

/// A store whose token saves can be switched to fail.
#[derive(Default)]
struct FlakyStore {
    tokens: Mutex<Option<TokenState>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

#[async_trait]
impl CredentialStore for FlakyStore {
    async fn load_tokens(&self) -> Result<Option<TokenState>, StorageError> {
        Ok(self.tokens.lock().unwrap().clone())
    }

    async fn save_tokens(&self, tokens: &TokenState) -> Result<(), StorageError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::new("disk full"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.tokens.lock().unwrap() = Some(tokens.clone());
        Ok(())
    }

    async fn get_sync_state(
        &self,
        _division: Division,
        _resource: &str,
    ) -> Result<Option<SyncState>, StorageError> {
        Ok(None)
    }

    async fn save_sync_state(
        &self,
        _division: Division,
        _resource: &str,
        _state: &SyncState,
    ) -> Result<(), StorageError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_concurrent_callers_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("new-access", "new-refresh"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_tokens(expired_tokens()));
    let manager = TokenManager::new(config(&server), reqwest::Client::new(), store.clone());

    let results =
        futures::future::join_all((0..10).map(|_| manager.ensure_valid_token())).await;

    for result in results {
        assert_eq!(result.unwrap(), "new-access");
    }
    let stored = store.load_tokens().await.unwrap().unwrap();
    assert_eq!(stored.refresh_token, "new-refresh");
    assert!(stored.expires_at > Utc::now() + ChronoDuration::minutes(9));
    assert_eq!(manager.lifecycle().await, TokenLifecycle::Loaded);
}

#[tokio::test]
async fn test_concurrent_callers_across_tasks_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("new-access", "new-refresh"))
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_tokens(expired_tokens()));
    let manager = TokenManager::new(config(&server), reqwest::Client::new(), store);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.ensure_valid_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "new-access");
    }
}

#[tokio::test]
async fn test_rejected_refresh_token_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "refresh token expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_tokens(expired_tokens()));
    let manager = TokenManager::new(config(&server), reqwest::Client::new(), store);

    let first = manager.ensure_valid_token().await;
    assert_eq!(first, Err(AuthError::TokenExpired));
    assert!(first.unwrap_err().requires_reauthorization());
    assert_eq!(manager.lifecycle().await, TokenLifecycle::Terminal);

    // No further refresh is attempted with the dead token.
    assert_eq!(
        manager.ensure_valid_token().await,
        Err(AuthError::TokenExpired)
    );
}

#[tokio::test]
async fn test_server_error_on_refresh_is_not_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("second", "r2")))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_tokens(expired_tokens()));
    let manager = TokenManager::new(config(&server), reqwest::Client::new(), store);

    let first = manager.ensure_valid_token().await;
    assert!(matches!(
        first,
        Err(AuthError::TokenRefreshFailed { status: 503, .. })
    ));
    assert_ne!(manager.lifecycle().await, TokenLifecycle::Terminal);

    assert_eq!(manager.ensure_valid_token().await.unwrap(), "second");
}

#[tokio::test]
async fn test_unpersisted_refresh_is_saved_before_use() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("new-access", "new-refresh")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(FlakyStore::default());
    *store.tokens.lock().unwrap() = Some(expired_tokens());
    store.fail_saves.store(true, Ordering::SeqCst);
    let manager = TokenManager::new(config(&server), reqwest::Client::new(), store.clone());

    let result = manager.ensure_valid_token().await;
    assert!(matches!(result, Err(AuthError::Storage(_))));

    // Still failing: the rotated pair is not handed out.
    let result = manager.ensure_valid_token().await;
    assert!(matches!(result, Err(AuthError::Storage(_))));

    // Once the store recovers the pending pair is persisted without a second refresh.
    store.fail_saves.store(false, Ordering::SeqCst);
    assert_eq!(manager.ensure_valid_token().await.unwrap(), "new-access");
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.tokens.lock().unwrap().as_ref().unwrap().refresh_token,
        "new-refresh"
    );
}

#[tokio::test]
async fn test_exchange_code_persists_tokens() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=auth-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("first-access", "first-refresh")))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::new());
    let manager = TokenManager::new(config(&server), reqwest::Client::new(), store.clone());
    assert_eq!(
        manager.ensure_valid_token().await,
        Err(AuthError::NotAuthenticated)
    );

    let tokens = manager.exchange_code("auth-code").await.unwrap();
    assert_eq!(tokens.access_token, "first-access");
    assert_eq!(
        store.load_tokens().await.unwrap().unwrap().refresh_token,
        "first-refresh"
    );
    assert_eq!(manager.ensure_valid_token().await.unwrap(), "first-access");
}

#[tokio::test]
async fn test_rejected_code_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid code"))
        .mount(&server)
        .await;

    let manager = TokenManager::new(
        config(&server),
        reqwest::Client::new(),
        Arc::new(MemoryCredentialStore::new()),
    );

    let result = manager.exchange_code("bad").await;
    assert!(matches!(
        result,
        Err(AuthError::TokenExchangeFailed { status: 400, .. })
    ));
}

#[tokio::test]
async fn test_refresh_is_persisted_after_waiting_caller_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/oauth2/token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(token_body("new-access", "new-refresh"))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryCredentialStore::with_tokens(expired_tokens()));
    let manager = TokenManager::new(config(&server), reqwest::Client::new(), store.clone());

    let waiting = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.ensure_valid_token().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    waiting.abort();
    assert!(waiting.await.unwrap_err().is_cancelled());

    tokio::time::sleep(Duration::from_millis(600)).await;

    let stored = store.load_tokens().await.unwrap().unwrap();
    assert_eq!(stored.refresh_token, "new-refresh");
    assert_eq!(manager.ensure_valid_token().await.unwrap(), "new-access");
    assert_eq!(manager.lifecycle().await, TokenLifecycle::Loaded);
}
