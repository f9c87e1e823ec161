//! Error types for the Exact Online client.
//!
//! This module contains the configuration error type. Errors raised by the
//! request pipeline, the token manager, the resource layer and the webhook
//! parser live next to the code that produces them:
//!
//! - [`ConfigError`]: invalid or missing configuration values
//! - [`HttpError`](crate::clients::HttpError): request pipeline failures
//! - [`AuthError`](crate::auth::AuthError): token lifecycle failures
//! - [`ResourceError`](crate::rest::ResourceError): listing and sync failures
//! - [`BatchError`](crate::batch::BatchError): batch encoding and decoding failures
//! - [`WebhookError`](crate::webhooks::WebhookError): webhook verification failures
//!
//! # Example
//!
//! ```rust
//! use exact_online::{ClientId, ConfigError};
//!
//! let result = ClientId::new("");
//! assert!(matches!(result, Err(ConfigError::EmptyClientId)));
//! ```

use thiserror::Error;

/// Errors that can occur while building the client configuration.
///
/// Every constructor of a configuration newtype validates its input and
/// returns one of these variants on failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty. Please provide the client ID of your Exact Online app.")]
    EmptyClientId,

    /// Client secret cannot be empty.
    #[error("Client secret cannot be empty. Please provide the client secret of your Exact Online app.")]
    EmptyClientSecret,

    /// Webhook secret cannot be empty.
    #[error("Webhook secret cannot be empty.")]
    EmptyWebhookSecret,

    /// Redirect URI is invalid.
    #[error("Invalid redirect URI '{uri}'. Expected an absolute http(s) URL registered with your app.")]
    InvalidRedirectUri {
        /// The invalid URI that was provided.
        uri: String,
    },

    /// Host URL is invalid.
    #[error("Invalid host URL '{url}'. Please provide a valid URL with scheme (e.g., 'https://proxy.example.com').")]
    InvalidHostUrl {
        /// The invalid URL that was provided.
        url: String,
    },

    /// Region code is not one of the supported Exact Online regions.
    #[error("Invalid region '{region}'. Expected one of: nl, be, de, co.uk, com, es, fr.")]
    InvalidRegion {
        /// The region string that was provided.
        region: String,
    },

    /// Division code is invalid.
    #[error("Invalid division '{division}'. Division codes are positive integers.")]
    InvalidDivision {
        /// The invalid division value.
        division: String,
    },

    /// Retry configuration is inconsistent.
    #[error("Invalid retry configuration: {reason}")]
    InvalidRetryConfig {
        /// The reason the configuration was rejected.
        reason: String,
    },

    /// A required field is missing.
    #[error("Missing required field: '{field}'. This field must be set before building the configuration.")]
    MissingRequiredField {
        /// The name of the missing field.
        field: &'static str,
    },

    /// The underlying HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {reason}")]
    HttpClientBuild {
        /// The reason reported by the HTTP stack.
        reason: String,
    },
}
