//! HTTP response types for the Exact Online API.
//!
//! This module provides the [`HttpResponse`] type and the parsed
//! [`RateLimitHeaders`] that accompany every response.

use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;

/// Epoch values above this are milliseconds rather than seconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Rate limit information parsed from Exact Online response headers.
///
/// Exact Online reports two windows per division:
///
/// - minutely: `X-RateLimit-Minutely-Limit`, `X-RateLimit-Minutely-Remaining`,
///   `X-RateLimit-Minutely-Reset`
/// - daily: `X-RateLimit-Limit`, `X-RateLimit-Remaining`, `X-RateLimit-Reset`
///
/// Reset values are epoch timestamps in milliseconds. Missing or malformed
/// headers leave the corresponding field `None`.
///
/// # Example
///
/// ```rust
/// use exact_online::clients::RateLimitHeaders;
/// use std::collections::HashMap;
///
/// let mut headers = HashMap::new();
/// headers.insert("x-ratelimit-minutely-remaining".to_string(), vec!["59".to_string()]);
/// headers.insert("x-ratelimit-minutely-reset".to_string(), vec!["1700000060000".to_string()]);
///
/// let limits = RateLimitHeaders::from_headers(&headers);
/// assert_eq!(limits.minutely_remaining, Some(59));
/// assert_eq!(limits.minutely_reset.unwrap().timestamp(), 1_700_000_060);
/// assert!(limits.daily_remaining.is_none());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RateLimitHeaders {
    /// Calls allowed per minute.
    pub minutely_limit: Option<u32>,
    /// Calls left in the current minute.
    pub minutely_remaining: Option<u32>,
    /// When the minute window resets.
    pub minutely_reset: Option<DateTime<Utc>>,
    /// Calls allowed per day.
    pub daily_limit: Option<u32>,
    /// Calls left today.
    pub daily_remaining: Option<u32>,
    /// When the day window resets.
    pub daily_reset: Option<DateTime<Utc>>,
}

impl RateLimitHeaders {
    /// Parses rate limit headers from lowercased response headers.
    #[must_use]
    pub fn from_headers(headers: &HashMap<String, Vec<String>>) -> Self {
        let number = |name: &str| -> Option<u32> { first(headers, name)?.trim().parse().ok() };
        let instant = |name: &str| -> Option<DateTime<Utc>> {
            parse_epoch(first(headers, name)?.trim().parse().ok()?)
        };

        Self {
            minutely_limit: number("x-ratelimit-minutely-limit"),
            minutely_remaining: number("x-ratelimit-minutely-remaining"),
            minutely_reset: instant("x-ratelimit-minutely-reset"),
            daily_limit: number("x-ratelimit-limit"),
            daily_remaining: number("x-ratelimit-remaining"),
            daily_reset: instant("x-ratelimit-reset"),
        }
    }

    /// Returns `true` if no rate limit header was present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.minutely_limit.is_none()
            && self.minutely_remaining.is_none()
            && self.minutely_reset.is_none()
            && self.daily_limit.is_none()
            && self.daily_remaining.is_none()
            && self.daily_reset.is_none()
    }
}

fn first<'a>(headers: &'a HashMap<String, Vec<String>>, name: &str) -> Option<&'a str> {
    headers.get(name)?.first().map(String::as_str)
}

fn parse_epoch(value: i64) -> Option<DateTime<Utc>> {
    if value >= MILLIS_THRESHOLD {
        Utc.timestamp_millis_opt(value).single()
    } else {
        Utc.timestamp_opt(value, 0).single()
    }
}

/// An HTTP response from the Exact Online API.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub code: u16,
    /// Response headers, keyed by lowercased name.
    pub headers: HashMap<String, Vec<String>>,
    /// The body parsed as JSON, or `Null` if it is not JSON.
    pub body: serde_json::Value,
    /// The raw body text.
    pub text: String,
    /// Parsed rate limit headers.
    pub rate_limit: RateLimitHeaders,
    /// Seconds to wait before retrying (from the `Retry-After` header).
    pub retry_after: Option<f64>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse`, parsing the body and known headers.
    #[must_use]
    pub fn new(code: u16, headers: HashMap<String, Vec<String>>, text: String) -> Self {
        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::Null)
        };
        let rate_limit = RateLimitHeaders::from_headers(&headers);
        let retry_after = first(&headers, "retry-after").and_then(|v| v.trim().parse().ok());

        Self {
            code,
            headers,
            body,
            text,
            rate_limit,
            retry_after,
        }
    }

    /// Returns `true` for 2xx status codes.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.code >= 200 && self.code <= 299
    }

    /// Returns the first value of a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        first(&self.headers, &name.to_ascii_lowercase())
    }

    /// Extracts a human readable error message.
    ///
    /// Exact Online reports errors as `{"error":{"message":{"value":"..."}}}`.
    /// Other shapes fall back to `error_description`, a string `error`, or
    /// the raw body text.
    #[must_use]
    pub fn error_message(&self) -> String {
        extract_error_message(&self.body).unwrap_or_else(|| self.text.trim().to_string())
    }
}

/// Extracts the upstream error message from an OData error body.
#[must_use]
pub fn extract_error_message(body: &serde_json::Value) -> Option<String> {
    let error = body.get("error")?;
    error
        .get("message")
        .and_then(|message| message.get("value").or(Some(message)))
        .and_then(serde_json::Value::as_str)
        .or_else(|| body.get("error_description").and_then(serde_json::Value::as_str))
        .or_else(|| error.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers(pairs: &[(&str, &str)]) -> HashMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), vec![(*v).to_string()]))
            .collect()
    }

    #[test]
    fn test_parses_both_windows() {
        let limits = RateLimitHeaders::from_headers(&headers(&[
            ("x-ratelimit-minutely-limit", "60"),
            ("x-ratelimit-minutely-remaining", "0"),
            ("x-ratelimit-minutely-reset", "1700000060000"),
            ("x-ratelimit-limit", "5000"),
            ("x-ratelimit-remaining", "4321"),
            ("x-ratelimit-reset", "1700006400"),
        ]));

        assert_eq!(limits.minutely_limit, Some(60));
        assert_eq!(limits.minutely_remaining, Some(0));
        assert_eq!(limits.minutely_reset.unwrap().timestamp(), 1_700_000_060);
        assert_eq!(limits.daily_limit, Some(5000));
        assert_eq!(limits.daily_remaining, Some(4321));
        assert_eq!(limits.daily_reset.unwrap().timestamp(), 1_700_006_400);
    }

    #[test]
    fn test_missing_or_malformed_headers_are_none() {
        let limits =
            RateLimitHeaders::from_headers(&headers(&[("x-ratelimit-minutely-remaining", "n/a")]));
        assert!(limits.is_empty());
    }

    #[test]
    fn test_non_json_body_is_kept_as_text() {
        let response = HttpResponse::new(502, HashMap::new(), "<html>Bad Gateway</html>".into());
        assert!(response.body.is_null());
        assert_eq!(response.error_message(), "<html>Bad Gateway</html>");
        assert!(!response.is_ok());
    }

    #[test]
    fn test_retry_after_header() {
        let response = HttpResponse::new(429, headers(&[("retry-after", "7")]), String::new());
        assert_eq!(response.retry_after, Some(7.0));
        assert_eq!(response.header("Retry-After"), Some("7"));
    }

    #[test]
    fn test_extracts_odata_error_message() {
        let body = json!({"error": {"code": "", "message": {"lang": "", "value": "Account not found"}}});
        assert_eq!(
            extract_error_message(&body).as_deref(),
            Some("Account not found")
        );

        let body = json!({"error": "invalid_grant", "error_description": "expired"});
        assert_eq!(extract_error_message(&body).as_deref(), Some("expired"));

        let body = json!({"error": "forbidden"});
        assert_eq!(extract_error_message(&body).as_deref(), Some("forbidden"));
    }
}
