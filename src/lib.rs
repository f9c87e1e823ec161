//! # Exact Online Rust Client
//!
//! A resilient client core for the Exact Online REST API: OAuth token
//! lifecycle, rate limited and retried requests, paginated and incremental
//! reads, batch calls and signed webhooks.
//!
//! ## Overview
//!
//! This crate provides:
//! - Type-safe configuration via [`ExactConfig`] and [`ExactConfigBuilder`]
//! - Validated newtypes for credentials and division codes
//! - OAuth 2.0 authorization code flow via [`auth::oauth`]
//! - A [`TokenManager`] that refreshes rotating refresh tokens exactly once,
//!   however many tasks need a token at the same time
//! - A pluggable [`CredentialStore`] for tokens and sync watermarks
//! - A per-division [`RateLimiter`] that admits one request at a time and
//!   waits out exhausted minute windows
//! - Exponential backoff retry via [`RetryPolicy`]
//! - Cursor pagination and timestamp-based incremental sync via [`rest`]
//! - OData `$batch` calls via [`batch`]
//! - Webhook signature verification via [`webhooks`]
//!
//! ## Quick Start
//!
//! ```rust
//! use exact_online::{ExactConfig, ClientId, ClientSecret, RedirectUri, Region};
//!
//! let config = ExactConfig::builder()
//!     .client_id(ClientId::new("your-client-id").unwrap())
//!     .client_secret(ClientSecret::new("your-client-secret").unwrap())
//!     .redirect_uri(RedirectUri::new("https://app.example.com/callback").unwrap())
//!     .region(Region::Netherlands)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.api_url(), "https://start.exactonline.nl/api/v1");
//! ```
//!
//! ## Authorizing
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use exact_online::{MemoryCredentialStore, RestClient};
//! use exact_online::auth::oauth::StateParam;
//!
//! let client = RestClient::new(config, Arc::new(MemoryCredentialStore::new()))?;
//!
//! let state = StateParam::new();
//! let url = client.authorization_url(Some(state.as_ref()), None);
//! // Redirect the user to `url`; on the callback, check the state and:
//! client.exchange_code(&code).await?;
//! ```
//!
//! ## Making API Requests
//!
//! ```rust,ignore
//! use exact_online::Division;
//! use exact_online::rest::{Listable, ListParams};
//! use exact_online::rest::resources::Account;
//!
//! let division = Division::new(123456)?;
//!
//! // Raw request
//! let response = client.get(division, "/crm/Accounts", &[("$top", "10")]).await?;
//!
//! // Typed resource
//! let accounts = Account::list(&client, division, &ListParams::new().top(10)).await?;
//! ```
//!
//! ## Design Principles
//!
//! - **No global state**: Everything lives in a [`RestClient`] value
//! - **Fail-fast validation**: All newtypes validate on construction
//! - **Thread-safe**: All client types are `Send + Sync`
//! - **Async-first**: Designed for use with the Tokio runtime
//! - **Persist before use**: A rotated refresh token is stored before the
//!   new access token is handed out

pub mod auth;
pub mod batch;
pub mod clients;
pub mod config;
pub mod error;
pub mod rest;
pub mod webhooks;

// Re-export public types at crate root for convenience
pub use config::{
    ClientId, ClientSecret, Division, ExactConfig, ExactConfigBuilder, HostUrl, RedirectUri,
    Region, WebhookSecret,
};
pub use error::ConfigError;

// Re-export token lifecycle types
pub use auth::{
    AuthError, CredentialStore, MemoryCredentialStore, StorageError, SyncState, TokenLifecycle,
    TokenManager, TokenState,
};

// Re-export HTTP client types
pub use clients::{
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpRequestBuilder, HttpResponse,
    HttpResponseError, InvalidHttpRequestError, RateLimiter, RestClient, RetryConfig,
    RetryPolicy,
};

// Re-export batch types
pub use batch::{execute_batch, BatchError, BatchRequest, BatchResponse, BatchResult};
