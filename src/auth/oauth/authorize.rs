//! Authorization URL construction.

use crate::config::ExactConfig;

/// Builds the URL the user is redirected to in order to authorize the app.
///
/// This is pure: no state is recorded. The caller keeps `state` (see
/// [`StateParam`](super::StateParam)) and compares it on the callback.
///
/// # Example
///
/// ```rust
/// use exact_online::{ExactConfig, ClientId, ClientSecret, RedirectUri};
/// use exact_online::auth::oauth::get_authorization_url;
///
/// let config = ExactConfig::builder()
///     .client_id(ClientId::new("my-app").unwrap())
///     .client_secret(ClientSecret::new("secret").unwrap())
///     .redirect_uri(RedirectUri::new("https://app.example.com/cb").unwrap())
///     .build()
///     .unwrap();
///
/// let url = get_authorization_url(&config, Some("xyz"), None);
/// assert!(url.starts_with("https://start.exactonline.nl/api/oauth2/auth?"));
/// assert!(url.contains("response_type=code"));
/// assert!(url.contains("state=xyz"));
/// ```
#[must_use]
pub fn get_authorization_url(
    config: &ExactConfig,
    state: Option<&str>,
    scope: Option<&str>,
) -> String {
    let mut params = vec![
        ("client_id", config.client_id().as_ref()),
        ("redirect_uri", config.redirect_uri().as_ref()),
        ("response_type", "code"),
    ];
    if let Some(state) = state.filter(|s| !s.is_empty()) {
        params.push(("state", state));
    }
    if let Some(scope) = scope.filter(|s| !s.is_empty()) {
        params.push(("scope", scope));
    }

    let query = params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{query}", config.auth_url())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClientId, ClientSecret, RedirectUri, Region};

    fn config() -> ExactConfig {
        ExactConfig::builder()
            .client_id(ClientId::new("client-123").unwrap())
            .client_secret(ClientSecret::new("secret").unwrap())
            .redirect_uri(RedirectUri::new("https://app.example.com/oauth/callback").unwrap())
            .region(Region::Belgium)
            .build()
            .unwrap()
    }

    #[test]
    fn test_url_encodes_redirect_uri() {
        let url = get_authorization_url(&config(), None, None);
        assert_eq!(
            url,
            "https://start.exactonline.be/api/oauth2/auth?client_id=client-123\
             &redirect_uri=https%3A%2F%2Fapp.example.com%2Foauth%2Fcallback&response_type=code"
        );
    }

    #[test]
    fn test_state_and_scope_are_appended() {
        let url = get_authorization_url(&config(), Some("a b"), Some("read"));
        assert!(url.ends_with("&state=a%20b&scope=read"));
    }

    #[test]
    fn test_empty_state_is_omitted() {
        let url = get_authorization_url(&config(), Some(""), None);
        assert!(!url.contains("state="));
    }
}
