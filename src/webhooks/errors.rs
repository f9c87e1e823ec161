//! Webhook-specific error types.
//!
//! - [`WebhookError::InvalidSignature`]: the signature did not match; the
//!   payload was not parsed
//! - [`WebhookError::InvalidPayload`]: the body is not a JSON event envelope
//! - [`WebhookError::MissingField`]: a required event field is absent
//!
//! # Example
//!
//! ```rust
//! use exact_online::webhooks::WebhookError;
//!
//! let error = WebhookError::MissingField { field: "Topic" };
//! assert_eq!(error.to_string(), "Webhook payload missing 'Topic' field");
//! ```

use thiserror::Error;

/// Error type for webhook verification and parsing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WebhookError {
    /// The provided signature does not match the payload.
    ///
    /// Respond with 401 and discard the payload.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// The payload could not be parsed.
    #[error("Invalid webhook payload: {reason}")]
    InvalidPayload {
        /// Why the payload was rejected.
        reason: String,
    },

    /// A required field is missing from the event.
    #[error("Webhook payload missing '{field}' field")]
    MissingField {
        /// The missing field, in the API's PascalCase spelling.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            WebhookError::InvalidSignature.to_string(),
            "Invalid webhook signature"
        );
        let error = WebhookError::InvalidPayload {
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(error.to_string().starts_with("Invalid webhook payload:"));
    }
}
