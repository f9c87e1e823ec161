//! Single-flight token lifecycle management.
//!
//! Exact Online invalidates a refresh token the moment it is redeemed. Two
//! concurrent refreshes with the same refresh token leave the loser holding a
//! dead token, and access is lost until the user re-authorizes. The
//! [`TokenManager`] therefore allows at most one refresh in flight: the first
//! caller that finds the token inside the safety margin starts a refresh task,
//! and every other caller awaits the same shared result.
//!
//! The refresh runs on its own spawned task. Cancelling a waiting caller does
//! not cancel the refresh, so a rotated pair is always persisted once the
//! upstream has issued it.
//!
//! # State machine
//!
//! ```text
//! Unloaded --load/exchange--> Loaded --margin reached--> Refreshing
//!                               ^                            |
//!                               +-------- success -----------+
//!                                                            |
//!                     Terminal <------ refresh rejected -----+
//! ```

use crate::auth::errors::{AuthError, StorageError};
use crate::auth::oauth::{get_authorization_url, request_code_exchange, request_token_refresh};
use crate::auth::store::CredentialStore;
use crate::auth::token::TokenState;
use crate::config::ExactConfig;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenState, AuthError>>>;

/// Observable state of the [`TokenManager`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenLifecycle {
    /// Nothing has been loaded from the store yet.
    Unloaded,
    /// A token pair is cached.
    Loaded,
    /// A refresh is in flight.
    Refreshing,
    /// The refresh token was rejected; the user must re-authorize.
    Terminal,
}

#[derive(Default)]
struct TokenSlot {
    cached: Option<TokenState>,
    // Rotated upstream but not yet durable.
    pending: Option<TokenState>,
    in_flight: Option<RefreshFuture>,
    terminal: bool,
}

struct Inner {
    config: ExactConfig,
    http: reqwest::Client,
    store: Arc<dyn CredentialStore>,
    slot: Mutex<TokenSlot>,
}

enum RotateError {
    Auth(AuthError),
    Unpersisted(TokenState, StorageError),
}

impl From<AuthError> for RotateError {
    fn from(error: AuthError) -> Self {
        Self::Auth(error)
    }
}

impl From<StorageError> for RotateError {
    fn from(error: StorageError) -> Self {
        Self::Auth(AuthError::Storage(error))
    }
}

/// Owns the token pair and hands out access tokens that are valid for at
/// least the configured refresh margin.
///
/// Cloning is cheap; clones share the same cached state and refresh gate.
///
/// # Example
///
/// ```rust,ignore
/// use exact_online::{TokenManager, MemoryCredentialStore};
/// use std::sync::Arc;
///
/// let manager = TokenManager::new(config, reqwest::Client::new(), Arc::new(MemoryCredentialStore::new()));
/// manager.exchange_code(&code_from_callback).await?;
/// let access_token = manager.ensure_valid_token().await?;
/// ```
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

// Verify TokenManager is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<TokenManager>();
};

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.inner.config.token_url())
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Creates a manager in the `Unloaded` state.
    #[must_use]
    pub fn new(
        config: ExactConfig,
        http: reqwest::Client,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                http,
                store,
                slot: Mutex::new(TokenSlot::default()),
            }),
        }
    }

    /// Returns an access token valid for at least the refresh margin.
    ///
    /// Loads the pair from the store on first use and refreshes it when
    /// `now + margin >= expires_at`. Concurrent callers share one refresh.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if no token pair exists.
    /// - [`AuthError::TokenExpired`] if the refresh token was rejected, now or
    ///   by an earlier refresh.
    /// - [`AuthError::Storage`] if the store failed, including when a rotated
    ///   pair could not be persisted.
    /// - [`AuthError::TokenRefreshFailed`] for other refresh failures.
    pub async fn ensure_valid_token(&self) -> Result<String, AuthError> {
        let refresh = {
            let mut slot = self.inner.slot.lock().await;
            if slot.terminal {
                return Err(AuthError::TokenExpired);
            }

            if let Some(pending) = slot.pending.clone() {
                self.inner.store.save_tokens(&pending).await?;
                tracing::debug!("Persisted previously unsaved token pair");
                slot.pending = None;
                slot.cached = Some(pending);
            }

            if slot.cached.is_none() && slot.in_flight.is_none() {
                slot.cached = self.inner.store.load_tokens().await?;
            }

            match (&slot.in_flight, &slot.cached) {
                (Some(in_flight), _) => in_flight.clone(),
                (None, None) => return Err(AuthError::NotAuthenticated),
                (None, Some(tokens)) => {
                    if !tokens.needs_refresh(self.inner.config.refresh_margin()) {
                        return Ok(tokens.access_token.clone());
                    }
                    let refresh = self.spawn_refresh(tokens.clone());
                    slot.in_flight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await.map(|tokens| tokens.access_token)
    }

    /// Exchanges an authorization code for the initial token pair and
    /// persists it before returning.
    ///
    /// A successful exchange leaves the `Terminal` state.
    ///
    /// # Errors
    ///
    /// - [`AuthError::TokenExchangeFailed`] if the token endpoint rejects the code.
    /// - [`AuthError::Storage`] if the pair could not be persisted. The pair is
    ///   kept and persisting is retried on the next call.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenState, AuthError> {
        let tokens = request_code_exchange(&self.inner.http, &self.inner.config, code).await?;

        let mut slot = self.inner.slot.lock().await;
        slot.terminal = false;
        slot.cached = None;
        if let Err(error) = self.inner.store.save_tokens(&tokens).await {
            tracing::error!("Exchanged token pair could not be persisted: {error}");
            slot.pending = Some(tokens);
            return Err(error.into());
        }
        slot.pending = None;
        slot.cached = Some(tokens.clone());
        tracing::debug!("Exchanged authorization code for tokens");
        Ok(tokens)
    }

    /// Builds the URL that starts the authorization flow.
    ///
    /// This does not touch the token state.
    #[must_use]
    pub fn get_authorization_url(&self, state: Option<&str>, scope: Option<&str>) -> String {
        get_authorization_url(&self.inner.config, state, scope)
    }

    /// Returns the current lifecycle state.
    pub async fn lifecycle(&self) -> TokenLifecycle {
        let slot = self.inner.slot.lock().await;
        if slot.terminal {
            TokenLifecycle::Terminal
        } else if slot.in_flight.is_some() {
            TokenLifecycle::Refreshing
        } else if slot.cached.is_some() || slot.pending.is_some() {
            TokenLifecycle::Loaded
        } else {
            TokenLifecycle::Unloaded
        }
    }

    /// Returns the cached token pair, if any.
    pub async fn current_tokens(&self) -> Option<TokenState> {
        self.inner.slot.lock().await.cached.clone()
    }

    fn spawn_refresh(&self, cached: TokenState) -> RefreshFuture {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(Self::refresh_task(Arc::clone(&inner), cached));

        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    tracing::error!("Token refresh task failed: {join_error}");
                    inner.slot.lock().await.in_flight = None;
                    Err(AuthError::RefreshAborted)
                }
            }
        }
        .boxed()
        .shared()
    }

    async fn refresh_task(inner: Arc<Inner>, cached: TokenState) -> Result<TokenState, AuthError> {
        let result = Self::rotate(&inner, cached).await;

        let mut slot = inner.slot.lock().await;
        slot.in_flight = None;
        match result {
            Ok(tokens) => {
                slot.cached = Some(tokens.clone());
                Ok(tokens)
            }
            Err(RotateError::Unpersisted(tokens, error)) => {
                tracing::error!("Refreshed token pair could not be persisted: {error}");
                slot.cached = None;
                slot.pending = Some(tokens);
                Err(AuthError::Storage(error))
            }
            Err(RotateError::Auth(AuthError::TokenExpired)) => {
                tracing::warn!("Refresh token rejected; re-authorization required");
                slot.cached = None;
                slot.terminal = true;
                Err(AuthError::TokenExpired)
            }
            Err(RotateError::Auth(error)) => {
                tracing::warn!("Token refresh failed: {error}");
                Err(error)
            }
        }
    }

    async fn rotate(inner: &Inner, cached: TokenState) -> Result<TokenState, RotateError> {
        let margin = inner.config.refresh_margin();

        // Another process may already have rotated the pair.
        let current = inner.store.load_tokens().await?.unwrap_or(cached);
        if !current.needs_refresh(margin) {
            tracing::debug!("Stored token pair is already fresh; skipping refresh");
            return Ok(current);
        }

        tracing::debug!(expires_at = %current.expires_at, "Refreshing access token");
        let tokens =
            request_token_refresh(&inner.http, &inner.config, &current.refresh_token).await?;

        if let Err(error) = inner.store.save_tokens(&tokens).await {
            return Err(RotateError::Unpersisted(tokens, error));
        }
        tracing::debug!(expires_at = %tokens.expires_at, "Access token refreshed");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::MemoryCredentialStore;
    use crate::config::{ClientId, ClientSecret, HostUrl, RedirectUri};
    use chrono::{Duration, Utc};

    fn manager_with(store: MemoryCredentialStore) -> TokenManager {
        let config = ExactConfig::builder()
            .client_id(ClientId::new("client").unwrap())
            .client_secret(ClientSecret::new("secret").unwrap())
            .redirect_uri(RedirectUri::new("https://app.example.com/cb").unwrap())
            .base_url(HostUrl::new("http://127.0.0.1:9").unwrap())
            .build()
            .unwrap();
        TokenManager::new(config, reqwest::Client::new(), Arc::new(store))
    }

    #[tokio::test]
    async fn test_empty_store_is_not_authenticated() {
        let manager = manager_with(MemoryCredentialStore::new());
        assert_eq!(manager.lifecycle().await, TokenLifecycle::Unloaded);

        let result = manager.ensure_valid_token().await;
        assert_eq!(result, Err(AuthError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_fresh_token_is_returned_without_refresh() {
        let tokens = TokenState::new("access", "refresh", Utc::now() + Duration::minutes(10));
        let manager = manager_with(MemoryCredentialStore::with_tokens(tokens));

        assert_eq!(manager.ensure_valid_token().await.unwrap(), "access");
        assert_eq!(manager.lifecycle().await, TokenLifecycle::Loaded);
    }

    #[tokio::test]
    async fn test_unreachable_token_endpoint_keeps_state_loaded() {
        let tokens = TokenState::new("access", "refresh", Utc::now() - Duration::minutes(1));
        let manager = manager_with(MemoryCredentialStore::with_tokens(tokens));

        let result = manager.ensure_valid_token().await;
        assert!(matches!(
            result,
            Err(AuthError::TokenRefreshFailed { status: 0, .. })
        ));
        assert_eq!(manager.lifecycle().await, TokenLifecycle::Loaded);
    }

    #[tokio::test]
    async fn test_authorization_url_leaves_state_unloaded() {
        let manager = manager_with(MemoryCredentialStore::new());

        let url = manager.get_authorization_url(Some("nonce"), None);
        assert!(url.starts_with("http://127.0.0.1:9/api/oauth2/auth?client_id=client"));
        assert!(url.ends_with("&state=nonce"));
        assert_eq!(manager.lifecycle().await, TokenLifecycle::Unloaded);
    }
}
