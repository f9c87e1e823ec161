//! The OAuth token pair and its expiry arithmetic.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifetime assumed when a token response omits `expires_in`.
pub const DEFAULT_EXPIRES_IN: i64 = 600;

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// An access/refresh token pair with an absolute UTC expiry.
///
/// Exact Online rotates refresh tokens: every refresh consumes the current
/// `refresh_token` and issues a new one. The `Debug` output masks both tokens.
///
/// # Example
///
/// ```rust
/// use exact_online::TokenState;
/// use chrono::{Duration, Utc};
///
/// let tokens = TokenState::new("access", "refresh", Utc::now() + Duration::minutes(10));
/// assert!(!tokens.is_expired());
/// assert!(!tokens.needs_refresh(std::time::Duration::from_secs(30)));
/// assert!(!format!("{tokens:?}").contains("access"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenState {
    /// The bearer token sent with API requests.
    pub access_token: String,
    /// The single-use token that obtains the next pair.
    pub refresh_token: String,
    /// The token type, normally `Bearer`.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// When the access token stops being accepted.
    pub expires_at: DateTime<Utc>,
}

impl TokenState {
    /// Creates a bearer token pair.
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            token_type: default_token_type(),
            expires_at,
        }
    }

    /// Builds a token pair from a token endpoint response received at `now`.
    #[must_use]
    pub fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);
        let expires_at = now
            .checked_add_signed(ChronoDuration::seconds(expires_in.clamp(0, 86_400 * 365)))
            .unwrap_or(now);
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            token_type: response.token_type.unwrap_or_else(default_token_type),
            expires_at,
        }
    }

    /// Returns `true` if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns `true` if the access token expires within `margin` from now.
    #[must_use]
    pub fn needs_refresh(&self, margin: Duration) -> bool {
        self.needs_refresh_at(margin, Utc::now())
    }

    /// Returns `true` if `now + margin >= expires_at`.
    #[must_use]
    pub fn needs_refresh_at(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        ChronoDuration::from_std(margin)
            .ok()
            .and_then(|margin| now.checked_add_signed(margin))
            .map_or(true, |deadline| deadline >= self.expires_at)
    }
}

impl fmt::Debug for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenState")
            .field("access_token", &"*****")
            .field("refresh_token", &"*****")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Body returned by the token endpoint for both grant types.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    /// The new access token.
    pub access_token: String,
    /// The new refresh token.
    pub refresh_token: String,
    /// Token type, usually `bearer`.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds. Exact Online sends this as a string.
    #[serde(default, deserialize_with = "deserialize_expires_in")]
    pub expires_in: Option<i64>,
}

fn deserialize_expires_in<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(i64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_needs_refresh_inside_margin() {
        let tokens = TokenState::new("a", "r", at(1_000));
        let margin = Duration::from_secs(30);

        assert!(!tokens.needs_refresh_at(margin, at(969)));
        assert!(tokens.needs_refresh_at(margin, at(970)));
        assert!(tokens.needs_refresh_at(margin, at(2_000)));
    }

    #[test]
    fn test_from_response_accepts_string_expires_in() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","token_type":"bearer","expires_in":"600"}"#,
        )
        .unwrap();
        let tokens = TokenState::from_response(response, at(0));

        assert_eq!(tokens.expires_at, at(600));
        assert_eq!(tokens.token_type, "bearer");
    }

    #[test]
    fn test_from_response_defaults_missing_fields() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"r"}"#).unwrap();
        let tokens = TokenState::from_response(response, at(100));

        assert_eq!(tokens.expires_at, at(100 + DEFAULT_EXPIRES_IN));
        assert_eq!(tokens.token_type, "Bearer");
    }

    #[test]
    fn test_response_without_refresh_token_is_rejected() {
        let result = serde_json::from_str::<TokenResponse>(r#"{"access_token":"a"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_masks_tokens() {
        let tokens = TokenState::new("secret-access", "secret-refresh", at(0));
        let debug_str = format!("{tokens:?}");
        assert!(!debug_str.contains("secret-access"));
        assert!(!debug_str.contains("secret-refresh"));
        assert!(debug_str.contains("Bearer"));
    }

    #[test]
    fn test_serde_keeps_timezone() {
        let tokens = TokenState::new("a", "r", at(1_700_000_000));
        let json = serde_json::to_string(&tokens).unwrap();
        assert!(json.contains("2023-11-14T22:13:20Z"));
        let parsed: TokenState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tokens);
    }
}
