//! Resource-specific error types for REST API operations.
//!
//! This module contains [`ResourceError`], which extends
//! [`HttpError`](crate::clients::HttpError) with resource semantics like
//! `NotFound` and decoding failures.
//!
//! # Example
//!
//! ```rust,ignore
//! use exact_online::rest::{Listable, ResourceError};
//! use exact_online::rest::resources::Account;
//!
//! match Account::get(&client, division, "8a1f...").await {
//!     Ok(account) => println!("Found: {:?}", account.name),
//!     Err(ResourceError::NotFound { resource, id }) => {
//!         println!("{resource} with id {id} not found");
//!     }
//!     Err(e) => println!("Other error: {e}"),
//! }
//! ```

use crate::auth::StorageError;
use crate::clients::HttpError;
use thiserror::Error;

/// Boxed error returned by caller-supplied sync callbacks.
pub type ProcessingError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for REST resource operations.
///
/// # Example
///
/// ```rust
/// use exact_online::rest::ResourceError;
///
/// let error = ResourceError::NotFound {
///     resource: "accounts",
///     id: "8a1f".to_string(),
/// };
/// assert_eq!(error.to_string(), "accounts with id 8a1f not found");
/// ```
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The record was not found (HTTP 404).
    #[error("{resource} with id {id} not found")]
    NotFound {
        /// The name of the resource (e.g., "accounts").
        resource: &'static str,
        /// The ID that was requested.
        id: String,
    },

    /// The response did not contain the expected `{"d": ...}` envelope.
    #[error("Unexpected response shape for {resource}")]
    InvalidEnvelope {
        /// The name of the resource.
        resource: &'static str,
    },

    /// A record could not be deserialized.
    #[error("Failed to deserialize {resource}: {source}")]
    Deserialize {
        /// The name of the resource.
        resource: &'static str,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// The caller's page callback failed during a stored sync.
    ///
    /// The watermark of the failed page was not persisted.
    #[error("Processing {resource} failed: {source}")]
    Processing {
        /// The name of the resource.
        resource: &'static str,
        /// The error returned by the callback.
        #[source]
        source: ProcessingError,
    },

    /// Reading or writing sync state failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// An HTTP-level error occurred.
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl ResourceError {
    /// Returns the HTTP status code behind this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Http(e) => e.status(),
            _ => None,
        }
    }
}
