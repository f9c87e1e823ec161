//! Validated newtype wrappers for configuration values.
//!
//! This module provides type-safe wrappers around raw strings and integers
//! that validate their contents on construction. Secret-bearing types mask
//! their value in `Debug` output so they never leak into logs.

use crate::error::ConfigError;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A validated Exact Online app client ID.
///
/// # Example
///
/// ```rust
/// use exact_online::ClientId;
///
/// let id = ClientId::new("b81cc4de-d192-400e-bcb4-09254394c52a").unwrap();
/// assert_eq!(id.as_ref(), "b81cc4de-d192-400e-bcb4-09254394c52a");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientId(String);

impl ClientId {
    /// Creates a new validated client ID.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyClientId`] if the ID is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, ConfigError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ConfigError::EmptyClientId);
        }
        Ok(Self(id))
    }
}

impl AsRef<str> for ClientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A validated Exact Online app client secret.
///
/// The `Debug` implementation masks the value.
///
/// ```rust
/// use exact_online::ClientSecret;
///
/// let secret = ClientSecret::new("my-secret").unwrap();
/// assert_eq!(format!("{:?}", secret), "ClientSecret(*****)");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSecret(String);

impl ClientSecret {
    /// Creates a new validated client secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyClientSecret`] if the secret is empty.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptyClientSecret);
        }
        Ok(Self(secret))
    }
}

impl AsRef<str> for ClientSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientSecret(*****)")
    }
}

/// The shared secret used to sign webhook deliveries.
///
/// Masked in `Debug` output like [`ClientSecret`].
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Creates a new validated webhook secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyWebhookSecret`] if the secret is empty.
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptyWebhookSecret);
        }
        Ok(Self(secret))
    }
}

impl AsRef<str> for WebhookSecret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(*****)")
    }
}

/// An Exact Online division (administration) code.
///
/// Every resource call, rate limit budget and sync watermark is scoped to a
/// division. Codes are positive integers.
///
/// # Example
///
/// ```rust
/// use exact_online::Division;
///
/// let division = Division::new(123_456).unwrap();
/// assert_eq!(division.code(), 123_456);
/// assert_eq!(division.to_string(), "123456");
///
/// let parsed: Division = "42".parse().unwrap();
/// assert_eq!(parsed.code(), 42);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Division(u32);

impl Division {
    /// Creates a new validated division.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDivision`] if the code is zero.
    pub fn new(code: u32) -> Result<Self, ConfigError> {
        if code == 0 {
            return Err(ConfigError::InvalidDivision {
                division: code.to_string(),
            });
        }
        Ok(Self(code))
    }

    /// Returns the numeric division code.
    #[must_use]
    pub const fn code(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Division {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidDivision {
                division: s.to_string(),
            })?;
        Self::new(code)
    }
}

impl Serialize for Division {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for Division {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u32::deserialize(deserializer)?;
        Self::new(code).map_err(de::Error::custom)
    }
}

/// A validated absolute URL with an explicit scheme.
///
/// Used for the API base URL override (proxies, test servers). A trailing
/// slash is dropped so paths can be appended directly.
///
/// # Example
///
/// ```rust
/// use exact_online::HostUrl;
///
/// let url = HostUrl::new("http://localhost:8080/").unwrap();
/// assert_eq!(url.scheme(), "http");
/// assert_eq!(url.host_name(), Some("localhost"));
/// assert_eq!(url.as_ref(), "http://localhost:8080");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostUrl {
    url: String,
    scheme_end: usize,
    host_start: usize,
    host_end: usize,
}

impl HostUrl {
    /// Creates a new validated host URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidHostUrl`] if the URL has no scheme or host.
    pub fn new(url: impl Into<String>) -> Result<Self, ConfigError> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        let invalid = || ConfigError::InvalidHostUrl { url: url.clone() };

        let scheme_end = url.find("://").ok_or_else(invalid)?;
        let scheme = &url[..scheme_end];
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let host_start = scheme_end + 3;
        if host_start >= url.len() {
            return Err(invalid());
        }

        let host_end = url[host_start..]
            .find([':', '/', '?', '#'])
            .map_or(url.len(), |i| host_start + i);
        if host_end == host_start {
            return Err(invalid());
        }

        Ok(Self {
            url,
            scheme_end,
            host_start,
            host_end,
        })
    }

    /// Returns the URL scheme (e.g., "https").
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.url[..self.scheme_end]
    }

    /// Returns the host name portion of the URL.
    #[must_use]
    pub fn host_name(&self) -> Option<&str> {
        Some(&self.url[self.host_start..self.host_end]).filter(|host| !host.is_empty())
    }
}

impl AsRef<str> for HostUrl {
    fn as_ref(&self) -> &str {
        &self.url
    }
}

/// The OAuth redirect URI registered with the Exact Online app.
///
/// Must be an absolute `http` or `https` URL; the value is sent verbatim in
/// both the authorization request and the code exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectUri(String);

impl RedirectUri {
    /// Creates a new validated redirect URI.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRedirectUri`] if the URI is not an
    /// absolute http(s) URL.
    pub fn new(uri: impl Into<String>) -> Result<Self, ConfigError> {
        let uri = uri.into();
        let valid = HostUrl::new(uri.as_str())
            .is_ok_and(|parsed| matches!(parsed.scheme(), "http" | "https"));
        if !valid {
            return Err(ConfigError::InvalidRedirectUri { uri });
        }
        Ok(Self(uri.trim().to_string()))
    }
}

impl AsRef<str> for RedirectUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
