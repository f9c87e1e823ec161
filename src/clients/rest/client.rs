//! The client context object.
//!
//! This module provides the [`RestClient`] type, which owns the request
//! pipeline, the token manager and the rate limiter for one app installation.

use std::sync::Arc;

use crate::auth::{AuthError, CredentialStore, TokenManager, TokenState};
use crate::batch::{execute_batch, BatchError, BatchRequest, BatchResult};
use crate::clients::{HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, RateLimiter};
use crate::config::{Division, ExactConfig};
use crate::error::ConfigError;

/// REST API client for Exact Online.
///
/// Provides convenient methods (`get`, `post`, `put`, `delete`) for calls
/// bound to a division. Resource traits in [`rest`](crate::rest) and the
/// [`batch`](crate::batch) module build on top of it.
///
/// There is no global state: everything a call needs lives in this value.
/// Dropping it tears the client down; a token refresh that is already in
/// flight still completes and persists its result.
///
/// # Thread Safety
///
/// `RestClient` is `Send + Sync`. Wrap it in an `Arc` to share it across
/// tasks.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use exact_online::{RestClient, ExactConfig, Division, MemoryCredentialStore};
///
/// let client = RestClient::new(config, Arc::new(MemoryCredentialStore::new()))?;
///
/// // Send the user to the authorization page, then on the callback:
/// client.exchange_code(&code).await?;
///
/// let division = Division::new(123456)?;
/// let response = client.get(division, "/crm/Accounts", &[("$top", "10")]).await?;
/// ```
#[derive(Debug)]
pub struct RestClient {
    config: ExactConfig,
    http_client: HttpClient,
}

// Verify RestClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RestClient>();
};

impl RestClient {
    /// Creates a new client for the given configuration and credential store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP stack cannot be
    /// initialized.
    pub fn new(config: ExactConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
        let http_client = HttpClient::new(&config, store)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the configuration this client was built with.
    #[must_use]
    pub const fn config(&self) -> &ExactConfig {
        &self.config
    }

    /// Returns the underlying request pipeline.
    #[must_use]
    pub const fn http_client(&self) -> &HttpClient {
        &self.http_client
    }

    /// Returns the token manager.
    #[must_use]
    pub const fn token_manager(&self) -> &TokenManager {
        self.http_client.token_manager()
    }

    /// Returns the rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        self.http_client.rate_limiter()
    }

    /// Builds the authorization URL for this app.
    #[must_use]
    pub fn authorization_url(&self, state: Option<&str>, scope: Option<&str>) -> String {
        self.token_manager().get_authorization_url(state, scope)
    }

    /// Exchanges an authorization code for the initial token pair.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::TokenExchangeFailed`] if the code is rejected,
    /// or [`AuthError::Storage`] if the pair could not be persisted.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenState, AuthError> {
        self.token_manager().exchange_code(code).await
    }

    /// Sends a GET request to an endpoint of a division.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the request fails.
    pub async fn get(
        &self,
        division: Division,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<HttpResponse, HttpError> {
        let mut builder = HttpRequest::builder(HttpMethod::Get, endpoint).division(division);
        for (key, value) in query {
            builder = builder.query_param(*key, *value);
        }
        self.request(builder.build()?).await
    }

    /// Sends a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the request fails.
    pub async fn post(
        &self,
        division: Division,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Post, endpoint)
            .division(division)
            .json(body)
            .build()?;
        self.request(request).await
    }

    /// Sends a PUT request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the request fails.
    pub async fn put(
        &self,
        division: Division,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Put, endpoint)
            .division(division)
            .json(body)
            .build()?;
        self.request(request).await
    }

    /// Sends a DELETE request.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the request fails.
    pub async fn delete(&self, division: Division, endpoint: &str) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Delete, endpoint)
            .division(division)
            .build()?;
        self.request(request).await
    }

    /// Sends a GET request that is not bound to a division, such as
    /// `/current/Me`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the request fails.
    pub async fn get_without_division(&self, endpoint: &str) -> Result<HttpResponse, HttpError> {
        let request = HttpRequest::builder(HttpMethod::Get, endpoint).build()?;
        self.request(request).await
    }

    /// Sends a prepared request through the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] if the request fails.
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        self.http_client.request(request).await
    }

    /// Executes sub-requests of one division as a single `$batch` call.
    ///
    /// # Errors
    ///
    /// See [`execute_batch`].
    pub async fn batch(&self, requests: &[BatchRequest]) -> Result<BatchResult, BatchError> {
        execute_batch(self, requests).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentialStore;
    use crate::config::{ClientId, ClientSecret, RedirectUri};

    fn client() -> RestClient {
        let config = ExactConfig::builder()
            .client_id(ClientId::new("client").unwrap())
            .client_secret(ClientSecret::new("secret").unwrap())
            .redirect_uri(RedirectUri::new("https://app.example.com/cb").unwrap())
            .build()
            .unwrap();
        RestClient::new(config, Arc::new(MemoryCredentialStore::new())).unwrap()
    }

    #[test]
    fn test_authorization_url_uses_config() {
        let url = client().authorization_url(Some("nonce"), None);
        assert!(url.starts_with("https://start.exactonline.nl/api/oauth2/auth?"));
        assert!(url.contains("client_id=client"));
    }

    #[tokio::test]
    async fn test_request_without_tokens_is_not_authenticated() {
        let client = client();
        let result = client
            .get(Division::new(1).unwrap(), "/crm/Accounts", &[])
            .await;
        assert!(matches!(
            result,
            Err(HttpError::Auth {
                source: AuthError::NotAuthenticated,
                attempts: 0
            })
        ));
    }

    #[tokio::test]
    async fn test_invalid_path_is_rejected_before_sending() {
        let result = client().delete(Division::new(1).unwrap(), "").await;
        assert!(matches!(result, Err(HttpError::InvalidRequest(_))));
    }
}
