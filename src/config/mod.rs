//! Configuration types for the Exact Online client.
//!
//! This module provides the configuration used to construct a
//! [`RestClient`](crate::RestClient): app credentials, the regional
//! deployment to talk to, and the tuning knobs of the request pipeline.
//!
//! # Overview
//!
//! - [`ExactConfig`]: The main configuration struct
//! - [`ExactConfigBuilder`]: A builder for constructing [`ExactConfig`] instances
//! - [`ClientId`], [`ClientSecret`], [`RedirectUri`]: OAuth app credentials
//! - [`Region`]: The Exact Online deployment (`nl`, `be`, `co.uk`, ...)
//! - [`Division`]: A validated division (administration) code
//! - [`HostUrl`]: A base URL override for proxies and test servers
//!
//! # Example
//!
//! ```rust
//! use exact_online::{ExactConfig, ClientId, ClientSecret, RedirectUri, Region};
//!
//! let config = ExactConfig::builder()
//!     .client_id(ClientId::new("my-client-id").unwrap())
//!     .client_secret(ClientSecret::new("my-secret").unwrap())
//!     .redirect_uri(RedirectUri::new("https://app.example.com/callback").unwrap())
//!     .region(Region::Belgium)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.api_url(), "https://start.exactonline.be/api/v1");
//! ```

mod newtypes;
mod region;

pub use newtypes::{ClientId, ClientSecret, Division, HostUrl, RedirectUri, WebhookSecret};
pub use region::Region;

use crate::clients::RetryPolicy;
use crate::error::ConfigError;
use std::time::Duration;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default safety margin before token expiry at which a refresh is triggered.
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(30);

/// Default number of calls per minute per division.
pub const DEFAULT_MINUTELY_LIMIT: u32 = 60;

/// Configuration for the Exact Online client.
///
/// # Thread Safety
///
/// `ExactConfig` is `Clone`, `Send`, and `Sync`.
///
/// # Base URL override
///
/// When [`ExactConfigBuilder::base_url`] is set, every URL (API, OAuth
/// authorization and token endpoints) is derived from the override instead of
/// the region. This is how tests point the client at a mock server.
#[derive(Clone, Debug)]
pub struct ExactConfig {
    client_id: ClientId,
    client_secret: ClientSecret,
    redirect_uri: RedirectUri,
    region: Region,
    base_url_override: Option<HostUrl>,
    timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Duration,
    refresh_margin: Duration,
    retry: RetryPolicy,
    minutely_limit: u32,
    user_agent_prefix: Option<String>,
    webhook_secret: Option<WebhookSecret>,
}

impl ExactConfig {
    /// Creates a new builder for constructing an `ExactConfig`.
    #[must_use]
    pub fn builder() -> ExactConfigBuilder {
        ExactConfigBuilder::new()
    }

    /// Returns the OAuth client ID.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Returns the OAuth client secret.
    #[must_use]
    pub const fn client_secret(&self) -> &ClientSecret {
        &self.client_secret
    }

    /// Returns the registered redirect URI.
    #[must_use]
    pub const fn redirect_uri(&self) -> &RedirectUri {
        &self.redirect_uri
    }

    /// Returns the configured region.
    #[must_use]
    pub const fn region(&self) -> Region {
        self.region
    }

    /// Returns the base URL override, if configured.
    #[must_use]
    pub const fn base_url_override(&self) -> Option<&HostUrl> {
        self.base_url_override.as_ref()
    }

    /// Returns the base URL, honoring the override.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.base_url_override
            .as_ref()
            .map_or_else(|| self.region.base_url(), |url| url.as_ref().to_string())
    }

    /// Returns the REST API root (`{base}/api/v1`).
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("{}/api/v1", self.base_url())
    }

    /// Returns the OAuth authorization endpoint.
    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}/api/oauth2/auth", self.base_url())
    }

    /// Returns the OAuth token endpoint.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/api/oauth2/token", self.base_url())
    }

    /// Returns the per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the maximum number of idle pooled connections per host.
    #[must_use]
    pub const fn pool_max_idle_per_host(&self) -> usize {
        self.pool_max_idle_per_host
    }

    /// Returns how long idle pooled connections are kept.
    #[must_use]
    pub const fn pool_idle_timeout(&self) -> Duration {
        self.pool_idle_timeout
    }

    /// Returns the token refresh safety margin.
    #[must_use]
    pub const fn refresh_margin(&self) -> Duration {
        self.refresh_margin
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Returns the assumed per-minute call limit used before any rate limit
    /// headers have been observed.
    #[must_use]
    pub const fn minutely_limit(&self) -> u32 {
        self.minutely_limit
    }

    /// Returns the user agent prefix, if configured.
    #[must_use]
    pub fn user_agent_prefix(&self) -> Option<&str> {
        self.user_agent_prefix.as_deref()
    }

    /// Returns the webhook secret, if configured.
    #[must_use]
    pub const fn webhook_secret(&self) -> Option<&WebhookSecret> {
        self.webhook_secret.as_ref()
    }
}

// Verify ExactConfig is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ExactConfig>();
};

/// Builder for constructing [`ExactConfig`] instances.
///
/// Required fields are `client_id`, `client_secret` and `redirect_uri`.
///
/// # Defaults
///
/// - `region`: [`Region::Netherlands`]
/// - `timeout`: 30 seconds
/// - `pool_max_idle_per_host`: 20
/// - `pool_idle_timeout`: 5 seconds
/// - `refresh_margin`: 30 seconds
/// - `retry`: exponential backoff with [`RetryConfig::default`](crate::RetryConfig)
/// - `minutely_limit`: 60
/// - `base_url`, `user_agent_prefix`, `webhook_secret`: `None`
#[derive(Debug, Default)]
pub struct ExactConfigBuilder {
    client_id: Option<ClientId>,
    client_secret: Option<ClientSecret>,
    redirect_uri: Option<RedirectUri>,
    region: Option<Region>,
    base_url_override: Option<HostUrl>,
    timeout: Option<Duration>,
    pool_max_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    refresh_margin: Option<Duration>,
    retry: Option<RetryPolicy>,
    minutely_limit: Option<u32>,
    user_agent_prefix: Option<String>,
    webhook_secret: Option<WebhookSecret>,
}

impl ExactConfigBuilder {
    /// Creates a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the OAuth client ID (required).
    #[must_use]
    pub fn client_id(mut self, id: ClientId) -> Self {
        self.client_id = Some(id);
        self
    }

    /// Sets the OAuth client secret (required).
    #[must_use]
    pub fn client_secret(mut self, secret: ClientSecret) -> Self {
        self.client_secret = Some(secret);
        self
    }

    /// Sets the redirect URI registered with the app (required).
    #[must_use]
    pub fn redirect_uri(mut self, uri: RedirectUri) -> Self {
        self.redirect_uri = Some(uri);
        self
    }

    /// Sets the region.
    #[must_use]
    pub const fn region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    /// Overrides the base URL derived from the region.
    #[must_use]
    pub fn base_url(mut self, url: HostUrl) -> Self {
        self.base_url_override = Some(url);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the maximum number of idle pooled connections per host.
    #[must_use]
    pub const fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = Some(max);
        self
    }

    /// Sets how long idle pooled connections are kept.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Sets the token refresh safety margin.
    #[must_use]
    pub const fn refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = Some(margin);
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Sets the assumed per-minute call limit.
    #[must_use]
    pub const fn minutely_limit(mut self, limit: u32) -> Self {
        self.minutely_limit = Some(limit);
        self
    }

    /// Sets the user agent prefix for HTTP requests.
    #[must_use]
    pub fn user_agent_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.user_agent_prefix = Some(prefix.into());
        self
    }

    /// Sets the secret used to verify webhook signatures.
    #[must_use]
    pub fn webhook_secret(mut self, secret: WebhookSecret) -> Self {
        self.webhook_secret = Some(secret);
        self
    }

    /// Builds the [`ExactConfig`], validating that required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingRequiredField`] if `client_id`,
    /// `client_secret` or `redirect_uri` are not set, and
    /// [`ConfigError::InvalidRetryConfig`] if the retry policy is inconsistent.
    pub fn build(self) -> Result<ExactConfig, ConfigError> {
        let client_id = self
            .client_id
            .ok_or(ConfigError::MissingRequiredField { field: "client_id" })?;
        let client_secret = self
            .client_secret
            .ok_or(ConfigError::MissingRequiredField {
                field: "client_secret",
            })?;
        let redirect_uri = self
            .redirect_uri
            .ok_or(ConfigError::MissingRequiredField {
                field: "redirect_uri",
            })?;

        let retry = self.retry.unwrap_or_default();
        retry.validate()?;

        Ok(ExactConfig {
            client_id,
            client_secret,
            redirect_uri,
            region: self.region.unwrap_or_default(),
            base_url_override: self.base_url_override,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            pool_max_idle_per_host: self.pool_max_idle_per_host.unwrap_or(20),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(Duration::from_secs(5)),
            refresh_margin: self.refresh_margin.unwrap_or(DEFAULT_REFRESH_MARGIN),
            retry,
            minutely_limit: self.minutely_limit.unwrap_or(DEFAULT_MINUTELY_LIMIT),
            user_agent_prefix: self.user_agent_prefix,
            webhook_secret: self.webhook_secret,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::RetryConfig;

    fn required() -> ExactConfigBuilder {
        ExactConfig::builder()
            .client_id(ClientId::new("client").unwrap())
            .client_secret(ClientSecret::new("secret").unwrap())
            .redirect_uri(RedirectUri::new("https://app.example.com/callback").unwrap())
    }

    #[test]
    fn test_builder_requires_client_id() {
        let result = ExactConfigBuilder::new()
            .client_secret(ClientSecret::new("secret").unwrap())
            .redirect_uri(RedirectUri::new("https://app.example.com/cb").unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField { field: "client_id" })
        ));
    }

    #[test]
    fn test_builder_requires_redirect_uri() {
        let result = ExactConfigBuilder::new()
            .client_id(ClientId::new("client").unwrap())
            .client_secret(ClientSecret::new("secret").unwrap())
            .build();

        assert!(matches!(
            result,
            Err(ConfigError::MissingRequiredField {
                field: "redirect_uri"
            })
        ));
    }

    #[test]
    fn test_builder_provides_sensible_defaults() {
        let config = required().build().unwrap();

        assert_eq!(config.region(), Region::Netherlands);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.pool_max_idle_per_host(), 20);
        assert_eq!(config.pool_idle_timeout(), Duration::from_secs(5));
        assert_eq!(config.refresh_margin(), Duration::from_secs(30));
        assert_eq!(config.minutely_limit(), 60);
        assert!(matches!(config.retry(), RetryPolicy::Backoff(_)));
        assert!(config.base_url_override().is_none());
        assert!(config.user_agent_prefix().is_none());
        assert!(config.webhook_secret().is_none());
    }

    #[test]
    fn test_urls_follow_region() {
        let config = required().region(Region::UnitedKingdom).build().unwrap();

        assert_eq!(config.api_url(), "https://start.exactonline.co.uk/api/v1");
        assert_eq!(
            config.token_url(),
            "https://start.exactonline.co.uk/api/oauth2/token"
        );
    }

    #[test]
    fn test_base_url_override_replaces_region_urls() {
        let config = required()
            .region(Region::Germany)
            .base_url(HostUrl::new("http://127.0.0.1:9000/").unwrap())
            .build()
            .unwrap();

        assert_eq!(config.api_url(), "http://127.0.0.1:9000/api/v1");
        assert_eq!(config.auth_url(), "http://127.0.0.1:9000/api/oauth2/auth");
        assert_eq!(config.token_url(), "http://127.0.0.1:9000/api/oauth2/token");
    }

    #[test]
    fn test_builder_rejects_invalid_retry_config() {
        let retry = RetryConfig {
            exponential_base: 0.5,
            ..RetryConfig::default()
        };
        let result = required().retry(RetryPolicy::Backoff(retry)).build();

        assert!(matches!(
            result,
            Err(ConfigError::InvalidRetryConfig { .. })
        ));
    }

    #[test]
    fn test_config_debug_does_not_leak_secret() {
        let config = required()
            .webhook_secret(WebhookSecret::new("hook-secret").unwrap())
            .build()
            .unwrap();

        let debug_str = format!("{config:?}");
        assert!(debug_str.contains("ExactConfig"));
        assert!(!debug_str.contains("\"secret\""));
        assert!(!debug_str.contains("hook-secret"));
    }
}
