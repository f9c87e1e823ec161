//! Token lifecycle error types.
//!
//! [`AuthError`] is `Clone` because a single refresh outcome is shared by
//! every caller that was waiting on it.

use thiserror::Error;

/// Error raised by a [`CredentialStore`](crate::CredentialStore) backend.
///
/// # Example
///
/// ```rust
/// use exact_online::StorageError;
///
/// let error = StorageError::new("disk full");
/// assert_eq!(error.to_string(), "Credential store error: disk full");
/// ```
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Credential store error: {message}")]
pub struct StorageError {
    /// Description of the storage failure.
    pub message: String,
}

impl StorageError {
    /// Creates a new storage error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur while obtaining, refreshing or exchanging tokens.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No token pair is cached or stored. Complete the authorization flow.
    #[error("Not authenticated: no tokens available. Complete the OAuth authorization flow first.")]
    NotAuthenticated,

    /// The refresh token was rejected. Re-authorization is required.
    ///
    /// This is terminal: retrying with the same refresh token cannot succeed.
    #[error("Refresh token expired or revoked. Re-authorization is required.")]
    TokenExpired,

    /// The refresh request failed for a non-terminal reason.
    #[error("Token refresh failed with status {status}: {message}")]
    TokenRefreshFailed {
        /// The HTTP status code, or 0 for transport failures.
        status: u16,
        /// The error message from the response.
        message: String,
    },

    /// The authorization code exchange failed.
    #[error("Token exchange failed with status {status}: {message}")]
    TokenExchangeFailed {
        /// The HTTP status code, or 0 for transport failures.
        status: u16,
        /// The error message from the response.
        message: String,
    },

    /// Tokens were obtained but could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The background refresh task ended without producing a result.
    #[error("Token refresh task aborted")]
    RefreshAborted,
}

impl AuthError {
    /// Returns `true` if the caller must restart the authorization flow.
    #[must_use]
    pub const fn requires_reauthorization(&self) -> bool {
        matches!(self, Self::NotAuthenticated | Self::TokenExpired)
    }
}
