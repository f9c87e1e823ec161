//! HTTP-specific error types for the Exact Online client.
//!
//! Every error surfaced by the request pipeline carries enough detail to
//! decide on user-facing behavior: the status code (when there was a
//! response), the upstream message and the number of attempts made.
//!
//! # Example
//!
//! ```rust,ignore
//! use exact_online::HttpError;
//!
//! match client.get(division, "/crm/Accounts", &[]).await {
//!     Ok(response) => println!("{}", response.body),
//!     Err(HttpError::Auth { source, .. }) if source.requires_reauthorization() => {
//!         // send the user through the authorization flow again
//!     }
//!     Err(HttpError::RateLimited { retry_after, .. }) => {
//!         println!("Rate limited, retry after {retry_after:?}s");
//!     }
//!     Err(e) => println!("Failed after {} attempts: {e}", e.attempts()),
//! }
//! ```

use crate::auth::AuthError;
use thiserror::Error;

/// A non-2xx response that was not retried (or could not be retried).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("HTTP {code}: {message}")]
pub struct HttpResponseError {
    /// The HTTP status code of the response.
    pub code: u16,
    /// The upstream error message.
    pub message: String,
    /// The number of attempts made, including the failing one.
    pub attempts: u32,
}

/// Error returned when a request fails validation before it is sent.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InvalidHttpRequestError {
    /// A POST or PUT request was made without a body.
    #[error("Cannot use {method} without specifying data.")]
    MissingBody {
        /// The HTTP method that requires a body.
        method: String,
    },

    /// The request path is empty.
    #[error("Invalid request path '{path}'.")]
    InvalidPath {
        /// The path that was provided.
        path: String,
    },
}

/// Unified error type for the request pipeline.
#[derive(Debug, Error)]
pub enum HttpError {
    /// No valid access token could be obtained. Never retried.
    #[error("{source}")]
    Auth {
        /// Requests sent before the token was needed and could not be obtained.
        attempts: u32,
        /// The token lifecycle failure.
        #[source]
        source: AuthError,
    },

    /// The API rejected the access token or the app lacks permission (401/403).
    #[error("Unauthorized: {0}")]
    Unauthorized(HttpResponseError),

    /// Any other fatal non-2xx response.
    #[error(transparent)]
    Response(HttpResponseError),

    /// Still rate limited (429) after all attempts.
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimited {
        /// The number of attempts made.
        attempts: u32,
        /// Seconds to wait before trying again, from `Retry-After`.
        retry_after: Option<f64>,
    },

    /// A retryable server error persisted through all attempts.
    #[error("Exceeded maximum retry count of {tries}. Last status {code}: {message}")]
    MaxRetries {
        /// The HTTP status code of the last response.
        code: u16,
        /// The number of attempts made.
        tries: u32,
        /// The upstream message of the last response.
        message: String,
    },

    /// The request could not be sent or no response was received.
    #[error("Network error after {attempts} attempts: {message}")]
    Network {
        /// The number of attempts made.
        attempts: u32,
        /// Description of the transport failure.
        message: String,
        /// The underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// The request failed validation and was never sent.
    #[error(transparent)]
    InvalidRequest(#[from] InvalidHttpRequestError),
}

impl From<AuthError> for HttpError {
    fn from(source: AuthError) -> Self {
        Self::Auth {
            attempts: 0,
            source,
        }
    }
}

impl HttpError {
    /// Returns the number of attempts made before this error was surfaced.
    ///
    /// Errors raised before any request was sent report 0. For
    /// [`HttpError::Auth`] this counts the requests sent before the token
    /// failure, so an operation whose token could not be refreshed for its
    /// second attempt reports 1.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 0,
            Self::Unauthorized(e) | Self::Response(e) => e.attempts,
            Self::Auth { attempts, .. }
            | Self::RateLimited { attempts, .. }
            | Self::Network { attempts, .. } => *attempts,
            Self::MaxRetries { tries, .. } => *tries,
        }
    }

    /// Returns the HTTP status code of the last response, if there was one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(e) | Self::Response(e) => Some(e.code),
            Self::RateLimited { .. } => Some(429),
            Self::MaxRetries { code, .. } => Some(*code),
            Self::Auth { .. } | Self::Network { .. } | Self::InvalidRequest(_) => None,
        }
    }
}
