//! OAuth `state` parameter for CSRF protection.
//!
//! A [`StateParam`] is either a bare random nonce or a URL-safe base64 JSON
//! document carrying a nonce plus caller data (e.g. the page to return to
//! after authorization).
//!
//! # Example
//!
//! ```rust
//! use exact_online::auth::oauth::StateParam;
//!
//! let state = StateParam::with_data(&"/dashboard");
//! let returned = StateParam::from_raw(state.as_ref());
//!
//! assert!(state.matches(returned.as_ref()));
//! assert_eq!(returned.extract_data::<String>().as_deref(), Some("/dashboard"));
//! ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

const NONCE_LENGTH: usize = 32;

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    nonce: String,
    data: T,
}

#[derive(Deserialize)]
struct NonceOnly {
    nonce: String,
}

/// The `state` value sent with the authorization request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateParam {
    value: String,
}

impl StateParam {
    /// Creates a state holding only a random alphanumeric nonce.
    #[must_use]
    pub fn new() -> Self {
        Self {
            value: random_nonce(),
        }
    }

    /// Creates a state that carries `data` alongside a random nonce.
    #[must_use]
    pub fn with_data<T: Serialize>(data: &T) -> Self {
        let envelope = Envelope {
            nonce: random_nonce(),
            data,
        };
        let json = serde_json::to_vec(&envelope).unwrap_or_default();
        Self {
            value: URL_SAFE_NO_PAD.encode(json),
        }
    }

    /// Wraps a state value received on the callback.
    #[must_use]
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self { value: raw.into() }
    }

    /// Returns the nonce, decoding it from a data-carrying state if needed.
    #[must_use]
    pub fn nonce(&self) -> String {
        decode::<NonceOnly>(&self.value).map_or_else(|| self.value.clone(), |n| n.nonce)
    }

    /// Decodes the embedded data, if this state carries any of type `T`.
    #[must_use]
    pub fn extract_data<T: DeserializeOwned>(&self) -> Option<T> {
        decode::<Envelope<T>>(&self.value).map(|envelope| envelope.data)
    }

    /// Compares the full state value with one received on the callback in
    /// constant time.
    #[must_use]
    pub fn matches(&self, received: &str) -> bool {
        self.value.as_bytes().ct_eq(received.as_bytes()).into()
    }
}

impl Default for StateParam {
    fn default() -> Self {
        Self::new()
    }
}

impl AsRef<str> for StateParam {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for StateParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

fn random_nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

fn decode<T: DeserializeOwned>(value: &str) -> Option<T> {
    let bytes = URL_SAFE_NO_PAD.decode(value.as_bytes()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_alphanumeric_nonce() {
        let state = StateParam::new();
        assert_eq!(state.as_ref().len(), NONCE_LENGTH);
        assert!(state.as_ref().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(state.nonce(), state.as_ref());
    }

    #[test]
    fn test_states_are_unique() {
        assert_ne!(StateParam::new(), StateParam::new());
    }

    #[test]
    fn test_data_state_is_url_safe() {
        let state = StateParam::with_data(&serde_json::json!({"return": "/a?b=c&d=e"}));
        assert!(!state.as_ref().contains(['+', '/', '=']));
        assert_eq!(state.nonce().len(), NONCE_LENGTH);
    }

    #[test]
    fn test_bare_nonce_carries_no_data() {
        assert!(StateParam::new().extract_data::<String>().is_none());
    }

    #[test]
    fn test_matches_rejects_other_values() {
        let state = StateParam::new();
        assert!(state.matches(state.as_ref()));
        assert!(!state.matches("forged"));
        assert!(!state.matches(""));
    }
}
