//! Webhook signature verification.
//!
//! Exact Online signs every webhook with HMAC-SHA256 over the raw request
//! body, keyed with the webhook secret, and sends the hex digest in the
//! [`HEADER_SIGNATURE`] header.
//!
//! # Example
//!
//! ```rust
//! use exact_online::webhooks::{compute_signature, verify_and_parse};
//!
//! let body = br#"{"Content":{"Topic":"Accounts","Action":"Update","Division":123,"Key":"5b8e"}}"#;
//! let signature = compute_signature(body, "hook-secret");
//!
//! let event = verify_and_parse(body, &signature, "hook-secret").unwrap();
//! assert_eq!(event.topic, "Accounts");
//! assert_eq!(event.division.code(), 123);
//!
//! assert!(verify_and_parse(body, "00ff", "hook-secret").is_err());
//! ```
//!
//! # Security
//!
//! Signatures are compared in constant time. [`verify_and_parse`] checks the
//! signature before it looks at the payload, so an unauthenticated body is
//! never parsed.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::{ExactConfig, WebhookSecret};
use crate::webhooks::{parse_without_validation, WebhookError, WebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// HTTP header carrying the webhook signature.
pub const HEADER_SIGNATURE: &str = "X-Exact-Signature";

/// Computes the lowercase hex HMAC-SHA256 signature of a payload.
///
/// ```rust
/// use exact_online::webhooks::compute_signature;
///
/// let signature = compute_signature(br#"{"test":"data"}"#, "secret");
/// assert_eq!(signature.len(), 64);
/// ```
#[must_use]
#[allow(clippy::missing_panics_doc)] // HMAC accepts any key size, so this never panics
pub fn compute_signature(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Returns `true` if `signature` is the payload's signature under `secret`.
///
/// Hex case is ignored. The comparison is constant-time.
#[must_use]
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let expected = compute_signature(payload, secret);
    let provided = signature.trim().to_ascii_lowercase();
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Verifies the signature, then parses the event.
///
/// # Errors
///
/// Returns [`WebhookError::InvalidSignature`] if the signature does not
/// match; the payload is not parsed in that case. Returns a parse error
/// if the signature matches but the payload is not a valid event.
pub fn verify_and_parse(
    payload: &[u8],
    signature: &str,
    secret: &str,
) -> Result<WebhookEvent, WebhookError> {
    if !verify_signature(payload, signature, secret) {
        tracing::warn!(payload_len = payload.len(), "Webhook signature validation failed");
        return Err(WebhookError::InvalidSignature);
    }
    parse_without_validation(payload)
}

/// Verifies webhooks with a configured secret.
///
/// ```rust
/// use exact_online::webhooks::{compute_signature, WebhookVerifier};
/// use exact_online::WebhookSecret;
///
/// let verifier = WebhookVerifier::new(WebhookSecret::new("hook-secret").unwrap());
/// let body = br#"{"Topic":"Items","Action":"Delete","Division":"7","Key":"k"}"#;
/// let event = verifier
///     .verify_and_parse(body, &compute_signature(body, "hook-secret"))
///     .unwrap();
/// assert_eq!(event.key, "k");
/// ```
#[derive(Clone, Debug)]
pub struct WebhookVerifier {
    secret: WebhookSecret,
}

impl WebhookVerifier {
    /// Creates a verifier for a secret.
    #[must_use]
    pub const fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// Creates a verifier from the configured webhook secret, if one is set.
    #[must_use]
    pub fn from_config(config: &ExactConfig) -> Option<Self> {
        config.webhook_secret().cloned().map(Self::new)
    }

    /// Returns `true` if `signature` matches the payload.
    #[must_use]
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        verify_signature(payload, signature, self.secret.as_ref())
    }

    /// Verifies the signature, then parses the event.
    ///
    /// # Errors
    ///
    /// See [`verify_and_parse`].
    pub fn verify_and_parse(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> Result<WebhookEvent, WebhookError> {
        verify_and_parse(payload, signature, self.secret.as_ref())
    }
}
