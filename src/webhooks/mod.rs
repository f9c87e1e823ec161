//! Inbound webhook handling for Exact Online.
//!
//! The application hosts its own webhook endpoint; this module verifies and
//! parses what arrives there. It is independent of the request pipeline and
//! holds no state.
//!
//! - [`verify_and_parse`]: checks the [`HEADER_SIGNATURE`] signature, then
//!   parses the body into a [`WebhookEvent`]
//! - [`WebhookVerifier`]: the same, bound to a configured secret
//! - [`parse_without_validation`]: parsing only, for callers that verify in
//!   another layer
//!
//! # Example
//!
//! ```rust,ignore
//! use exact_online::webhooks::{WebhookError, WebhookVerifier, HEADER_SIGNATURE};
//!
//! let verifier = WebhookVerifier::from_config(&config).expect("webhook secret configured");
//! let signature = headers.get(HEADER_SIGNATURE).unwrap_or_default();
//!
//! match verifier.verify_and_parse(&body, signature) {
//!     Ok(event) => println!("{} {} in {}: {}", event.action, event.topic, event.division, event.key),
//!     Err(WebhookError::InvalidSignature) => return StatusCode::UNAUTHORIZED,
//!     Err(_) => return StatusCode::BAD_REQUEST,
//! }
//! ```

mod errors;
mod event;
mod verification;

pub use errors::WebhookError;
pub use event::{parse_without_validation, WebhookAction, WebhookEvent};
pub use verification::{
    compute_signature, verify_and_parse, verify_signature, WebhookVerifier, HEADER_SIGNATURE,
};
