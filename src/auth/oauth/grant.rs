//! Token endpoint calls for the authorization-code and refresh-token grants.
//!
//! These functions only talk to the token endpoint. Persisting the result and
//! serializing refreshes is the job of [`TokenManager`](crate::TokenManager).

use crate::auth::errors::AuthError;
use crate::auth::token::{TokenResponse, TokenState};
use crate::config::ExactConfig;
use chrono::Utc;

const AUTHORIZATION_CODE_GRANT_TYPE: &str = "authorization_code";
const REFRESH_TOKEN_GRANT_TYPE: &str = "refresh_token";

/// Exchanges an authorization code for an initial token pair.
///
/// Codes are single use and valid for a few minutes.
///
/// # Errors
///
/// Returns [`AuthError::TokenExchangeFailed`] if the request fails or the
/// response cannot be parsed. Transport failures carry status 0.
pub async fn request_code_exchange(
    http: &reqwest::Client,
    config: &ExactConfig,
    code: &str,
) -> Result<TokenState, AuthError> {
    let form = [
        ("grant_type", AUTHORIZATION_CODE_GRANT_TYPE),
        ("code", code),
        ("redirect_uri", config.redirect_uri().as_ref()),
        ("client_id", config.client_id().as_ref()),
        ("client_secret", config.client_secret().as_ref()),
    ];

    let response = http
        .post(config.token_url())
        .form(&form)
        .send()
        .await
        .map_err(|e| AuthError::TokenExchangeFailed {
            status: 0,
            message: format!("Network error: {e}"),
        })?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(AuthError::TokenExchangeFailed { status, message });
    }

    let body: TokenResponse =
        response
            .json()
            .await
            .map_err(|e| AuthError::TokenExchangeFailed {
                status,
                message: format!("Failed to parse token response: {e}"),
            })?;

    Ok(TokenState::from_response(body, Utc::now()))
}

/// Redeems a refresh token for a new token pair.
///
/// The refresh token is consumed by the upstream whatever the outcome.
///
/// # Errors
///
/// - [`AuthError::TokenExpired`] if the token endpoint rejects the refresh
///   token (HTTP 400 or 401, or an `invalid_grant` body).
/// - [`AuthError::TokenRefreshFailed`] for any other failure. Transport
///   failures carry status 0.
pub async fn request_token_refresh(
    http: &reqwest::Client,
    config: &ExactConfig,
    refresh_token: &str,
) -> Result<TokenState, AuthError> {
    let form = [
        ("grant_type", REFRESH_TOKEN_GRANT_TYPE),
        ("refresh_token", refresh_token),
        ("client_id", config.client_id().as_ref()),
        ("client_secret", config.client_secret().as_ref()),
    ];

    let response = http
        .post(config.token_url())
        .form(&form)
        .send()
        .await
        .map_err(|e| AuthError::TokenRefreshFailed {
            status: 0,
            message: format!("Network error: {e}"),
        })?;

    let status = response.status().as_u16();
    if !response.status().is_success() {
        let message = response.text().await.unwrap_or_default();
        if is_rejected_grant(status, &message) {
            return Err(AuthError::TokenExpired);
        }
        return Err(AuthError::TokenRefreshFailed { status, message });
    }

    let body: TokenResponse =
        response
            .json()
            .await
            .map_err(|e| AuthError::TokenRefreshFailed {
                status,
                message: format!("Failed to parse token response: {e}"),
            })?;

    Ok(TokenState::from_response(body, Utc::now()))
}

fn is_rejected_grant(status: u16, body: &str) -> bool {
    matches!(status, 400 | 401) || body.contains("invalid_grant")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejected_grant_detection() {
        assert!(is_rejected_grant(400, ""));
        assert!(is_rejected_grant(401, "Unauthorized"));
        assert!(is_rejected_grant(403, r#"{"error":"invalid_grant"}"#));
        assert!(!is_rejected_grant(500, "Internal Server Error"));
        assert!(!is_rejected_grant(503, ""));
    }
}
