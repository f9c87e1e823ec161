//! HTTP client types for Exact Online API communication.
//!
//! This module provides the request pipeline and the components it
//! coordinates:
//!
//! - [`HttpClient`]: The pipeline that runs every API call
//! - [`HttpRequest`]: A request to be sent to the API
//! - [`HttpResponse`]: A parsed response, including [`RateLimitHeaders`]
//! - [`RateLimiter`]: Per-division call budgets and request serialization
//! - [`RetryPolicy`]: Failure classification and exponential backoff
//! - [`rest::RestClient`]: The client context object
//!
//! # Retry Behavior
//!
//! - **429 (Rate Limited)**: Retried after `Retry-After`, or the backoff delay
//! - **5xx (Server Error)**: Retried with exponential backoff
//! - **Connection failures and timeouts**: Retried with exponential backoff
//! - **Other errors (4xx)**: Returned immediately without retry
//!
//! The default policy makes up to 4 attempts (3 retries). Use
//! [`RetryPolicy::None`] to surface the first failure.

mod errors;
mod http_client;
mod http_request;
mod http_response;
mod rate_limiter;
pub mod rest;
mod retry;

pub use errors::{HttpError, HttpResponseError, InvalidHttpRequestError};
pub use http_client::{build_reqwest_client, HttpClient, SDK_VERSION};
pub use http_request::{HttpMethod, HttpRequest, HttpRequestBuilder, RequestBody};
pub use http_response::{extract_error_message, HttpResponse, RateLimitHeaders};
pub use rate_limiter::{AdmitPermit, RateBudget, RateLimiter};
pub use retry::{
    classify_network, classify_status, FailureClass, RetryConfig, RetryContext, RetryPolicy,
};

pub use rest::RestClient;
