//! The request pipeline.
//!
//! Every API call goes through [`HttpClient::request`], which runs the
//! following steps for each attempt:
//!
//! 1. obtain a valid access token from the [`TokenManager`]
//! 2. wait for admission from the [`RateLimiter`] (division requests only),
//!    then check the token again since admission can wait out a full window
//! 3. send the request
//! 4. record the rate limit headers of the response, success or not
//! 5. on failure, classify it and either sleep the backoff delay and loop, or
//!    surface it
//!
//! The division's gate is released before sleeping, so other operations on
//! the same division can proceed while this one backs off.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{CredentialStore, TokenManager};
use crate::clients::errors::{HttpError, HttpResponseError};
use crate::clients::http_request::{HttpMethod, HttpRequest, RequestBody};
use crate::clients::http_response::HttpResponse;
use crate::clients::rate_limiter::RateLimiter;
use crate::clients::retry::{classify_network, classify_status, FailureClass, RetryContext, RetryPolicy};
use crate::config::{Division, ExactConfig};
use crate::error::ConfigError;

/// Client version from Cargo.toml.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The resilient HTTP client for the Exact Online API.
///
/// # Thread Safety
///
/// `HttpClient` is `Send + Sync`. Share one instance (or one
/// [`RestClient`](crate::RestClient)) per app installation so that all calls
/// go through the same token manager and rate limiter.
#[derive(Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    api_url: String,
    default_headers: HashMap<String, String>,
    tokens: TokenManager,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

// Verify HttpClient is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<HttpClient>();
};

impl HttpClient {
    /// Creates a pipeline with its own token manager and rate limiter.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::HttpClientBuild`] if the HTTP stack cannot be
    /// initialized.
    pub fn new(config: &ExactConfig, store: Arc<dyn CredentialStore>) -> Result<Self, ConfigError> {
        let client = build_reqwest_client(config)?;
        let tokens = TokenManager::new(config.clone(), client.clone(), store);
        let limiter = Arc::new(RateLimiter::new(config.minutely_limit()));
        Ok(Self::with_parts(config, client, tokens, limiter))
    }

    /// Creates a pipeline from existing parts.
    #[must_use]
    pub fn with_parts(
        config: &ExactConfig,
        client: reqwest::Client,
        tokens: TokenManager,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let user_agent_prefix = config
            .user_agent_prefix()
            .map_or(String::new(), |prefix| format!("{prefix} | "));
        let rust_version = env!("CARGO_PKG_RUST_VERSION");
        let user_agent =
            format!("{user_agent_prefix}Exact Online Rust Client v{SDK_VERSION} | Rust {rust_version}");

        let mut default_headers = HashMap::new();
        default_headers.insert("User-Agent".to_string(), user_agent);
        default_headers.insert("Accept".to_string(), "application/json".to_string());

        Self {
            client,
            api_url: config.api_url(),
            default_headers,
            tokens,
            limiter,
            retry: config.retry().clone(),
        }
    }

    /// Returns the REST API root, e.g. `https://start.exactonline.nl/api/v1`.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Returns the default headers sent with every request.
    #[must_use]
    pub const fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    /// Returns the token manager.
    #[must_use]
    pub const fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Returns the rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Returns the retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Builds and sends a request for a division.
    ///
    /// # Errors
    ///
    /// See [`request`](Self::request).
    pub async fn execute(
        &self,
        division: Division,
        method: HttpMethod,
        path: &str,
        query: BTreeMap<String, String>,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, HttpError> {
        let mut builder = HttpRequest::builder(method, path)
            .division(division)
            .query(query);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.request(builder.build()?).await
    }

    /// Sends a request through the pipeline.
    ///
    /// Retryable failures (transport errors, 429, 5xx) are retried according
    /// to the retry policy. A 429 `Retry-After` lengthens the backoff delay
    /// but never past `max_delay`. Fatal failures are returned immediately.
    ///
    /// # Errors
    ///
    /// - [`HttpError::InvalidRequest`] if the request fails validation
    /// - [`HttpError::Auth`] if no valid access token can be obtained; it
    ///   reports the number of requests already sent
    /// - [`HttpError::Unauthorized`] for 401 and 403 responses
    /// - [`HttpError::Response`] for other fatal responses
    /// - [`HttpError::RateLimited`] if still rate limited after all attempts
    /// - [`HttpError::MaxRetries`] if a server error persisted through all attempts
    /// - [`HttpError::Network`] if the last attempt failed in transport
    pub async fn request(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        request.verify()?;
        let url = request.url(&self.api_url);
        let mut retry = RetryContext::new(&self.retry);

        loop {
            let attempt = retry.begin_attempt();
            let mut token = self.token(attempt).await?;

            let permit = match request.division {
                Some(division) => {
                    let permit = self.limiter.admit(division).await;
                    // Admission may have waited out a window; the token must
                    // still be valid when the request leaves.
                    token = self.token(attempt).await?;
                    Some(permit)
                }
                None => None,
            };

            let response = match self.send(&request, &url, &token).await {
                Ok(response) => response,
                Err(error) => {
                    drop(permit);
                    let class = classify_network(&error);
                    if let Some(delay) = retry.next_delay(class) {
                        tracing::warn!(
                            attempt,
                            delay_ms = millis(delay),
                            path = %request.path,
                            "Network error: {error}. Retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(HttpError::Network {
                        attempts: attempt,
                        message: error.to_string(),
                        source: error,
                    });
                }
            };

            if let Some(division) = request.division {
                self.limiter.record(division, &response.rate_limit);
            }
            drop(permit);

            if response.is_ok() {
                return Ok(response);
            }

            let class = classify_status(response.code);
            let retry_after = response
                .retry_after
                .filter(|_| response.code == 429)
                .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok());
            if let Some(delay) = retry.next_delay_after(class, retry_after) {
                tracing::warn!(
                    attempt,
                    status = response.code,
                    delay_ms = millis(delay),
                    path = %request.path,
                    "Retryable response from Exact Online. Retrying"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(Self::failure(&response, attempt, class));
        }
    }

    async fn token(&self, attempt: u32) -> Result<String, HttpError> {
        self.tokens
            .ensure_valid_token()
            .await
            .map_err(|source| HttpError::Auth {
                attempts: attempt.saturating_sub(1),
                source,
            })
    }

    async fn send(
        &self,
        request: &HttpRequest,
        url: &str,
        token: &str,
    ) -> Result<HttpResponse, reqwest::Error> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        builder = builder.bearer_auth(token);
        // Extra headers replace defaults of the same name.
        for (key, value) in &self.default_headers {
            let overridden = request
                .extra_headers
                .keys()
                .any(|extra| extra.eq_ignore_ascii_case(key));
            if !overridden {
                builder = builder.header(key, value);
            }
        }
        for (key, value) in &request.extra_headers {
            builder = builder.header(key, value);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header("Content-Type", body.content_type())
                .body(RequestBody::encode(body));
        }

        let res = builder.send().await?;
        let code = res.status().as_u16();
        let headers = Self::parse_response_headers(res.headers());
        let text = res.text().await?;

        Ok(HttpResponse::new(code, headers, text))
    }

    fn failure(response: &HttpResponse, attempts: u32, class: FailureClass) -> HttpError {
        let detail = HttpResponseError {
            code: response.code,
            message: response.error_message(),
            attempts,
        };
        tracing::debug!(
            status = detail.code,
            attempts,
            "Exact Online request failed: {}",
            detail.message
        );

        match response.code {
            401 | 403 => HttpError::Unauthorized(detail),
            429 => HttpError::RateLimited {
                attempts,
                retry_after: response.retry_after,
            },
            _ if class == FailureClass::Retryable && attempts > 1 => HttpError::MaxRetries {
                code: detail.code,
                tries: attempts,
                message: detail.message,
            },
            _ => HttpError::Response(detail),
        }
    }

    /// Parses response headers into a `HashMap` keyed by lowercased name.
    fn parse_response_headers(
        headers: &reqwest::header::HeaderMap,
    ) -> HashMap<String, Vec<String>> {
        let mut result: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in headers {
            let key = name.as_str().to_lowercase();
            let value = value.to_str().unwrap_or_default().to_string();
            result.entry(key).or_default().push(value);
        }
        result
    }
}

/// Builds the pooled reqwest client described by the configuration.
///
/// # Errors
///
/// Returns [`ConfigError::HttpClientBuild`] if the TLS backend cannot be
/// initialized.
pub fn build_reqwest_client(config: &ExactConfig) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(config.timeout())
        .pool_max_idle_per_host(config.pool_max_idle_per_host())
        .pool_idle_timeout(config.pool_idle_timeout())
        .build()
        .map_err(|e| ConfigError::HttpClientBuild {
            reason: e.to_string(),
        })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
