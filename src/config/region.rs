//! Exact Online regional endpoints.
//!
//! Exact Online runs a separate deployment per country. Every regional
//! deployment exposes the same REST API, OAuth endpoints and rate limits under
//! its own top-level domain.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Exact Online region.
///
/// # Example
///
/// ```rust
/// use exact_online::Region;
///
/// let region: Region = "be".parse().unwrap();
/// assert_eq!(region, Region::Belgium);
/// assert_eq!(region.base_url(), "https://start.exactonline.be");
/// assert_eq!(region.token_url(), "https://start.exactonline.be/api/oauth2/token");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Region {
    /// The Netherlands (`start.exactonline.nl`).
    #[default]
    Netherlands,
    /// Belgium (`start.exactonline.be`).
    Belgium,
    /// Germany (`start.exactonline.de`).
    Germany,
    /// United Kingdom (`start.exactonline.co.uk`).
    UnitedKingdom,
    /// United States (`start.exactonline.com`).
    UnitedStates,
    /// Spain (`start.exactonline.es`).
    Spain,
    /// France (`start.exactonline.fr`).
    France,
}

impl Region {
    /// All supported regions.
    pub const ALL: [Self; 7] = [
        Self::Netherlands,
        Self::Belgium,
        Self::Germany,
        Self::UnitedKingdom,
        Self::UnitedStates,
        Self::Spain,
        Self::France,
    ];

    /// Returns the top-level domain used by this region.
    #[must_use]
    pub const fn tld(&self) -> &'static str {
        match self {
            Self::Netherlands => "nl",
            Self::Belgium => "be",
            Self::Germany => "de",
            Self::UnitedKingdom => "co.uk",
            Self::UnitedStates => "com",
            Self::Spain => "es",
            Self::France => "fr",
        }
    }

    /// Returns the base URL for this region.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://start.exactonline.{}", self.tld())
    }

    /// Returns the REST API root for this region.
    #[must_use]
    pub fn api_url(&self) -> String {
        format!("{}/api/v1", self.base_url())
    }

    /// Returns the OAuth authorization endpoint for this region.
    #[must_use]
    pub fn auth_url(&self) -> String {
        format!("{}/api/oauth2/auth", self.base_url())
    }

    /// Returns the OAuth token endpoint for this region.
    #[must_use]
    pub fn token_url(&self) -> String {
        format!("{}/api/oauth2/token", self.base_url())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tld())
    }
}

impl FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|region| region.tld() == normalized)
            .or_else(|| match normalized.as_str() {
                "uk" | "gb" => Some(Self::UnitedKingdom),
                "us" => Some(Self::UnitedStates),
                _ => None,
            })
            .ok_or_else(|| ConfigError::InvalidRegion {
                region: s.to_string(),
            })
    }
}

impl Serialize for Region {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tld())
    }
}

impl<'de> Deserialize<'de> for Region {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_region_is_netherlands() {
        assert_eq!(Region::default(), Region::Netherlands);
    }

    #[test]
    fn test_region_urls() {
        let region = Region::UnitedKingdom;
        assert_eq!(region.base_url(), "https://start.exactonline.co.uk");
        assert_eq!(region.api_url(), "https://start.exactonline.co.uk/api/v1");
        assert_eq!(
            region.auth_url(),
            "https://start.exactonline.co.uk/api/oauth2/auth"
        );
    }

    #[test]
    fn test_parse_accepts_tlds_and_aliases() {
        assert_eq!("nl".parse::<Region>().unwrap(), Region::Netherlands);
        assert_eq!(".co.uk".parse::<Region>().unwrap(), Region::UnitedKingdom);
        assert_eq!("UK".parse::<Region>().unwrap(), Region::UnitedKingdom);
        assert_eq!("com".parse::<Region>().unwrap(), Region::UnitedStates);
        assert_eq!("us".parse::<Region>().unwrap(), Region::UnitedStates);
    }

    #[test]
    fn test_parse_rejects_unknown_region() {
        let result = "xx".parse::<Region>();
        assert!(matches!(result, Err(ConfigError::InvalidRegion { .. })));
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for region in Region::ALL {
            assert_eq!(region.to_string().parse::<Region>().unwrap(), region);
        }
    }

    #[test]
    fn test_serde_uses_tld() {
        let json = serde_json::to_string(&Region::France).unwrap();
        assert_eq!(json, r#""fr""#);
        let parsed: Region = serde_json::from_str(r#""de""#).unwrap();
        assert_eq!(parsed, Region::Germany);
    }
}
