//! Batch sub-requests and the multipart request encoder.

use std::collections::BTreeMap;

use serde_json::Value;
use uuid::Uuid;

use crate::clients::HttpMethod;
use crate::config::Division;

const CRLF: &str = "\r\n";

/// One operation inside a batch.
///
/// # Example
///
/// ```rust
/// use exact_online::batch::BatchRequest;
/// use exact_online::Division;
/// use serde_json::json;
///
/// let division = Division::new(123).unwrap();
///
/// let read = BatchRequest::get(division, "/crm/Accounts").query_param("$top", "5");
/// let write = BatchRequest::post(division, "/crm/Accounts", json!({"Name": "Acme"}))
///     .content_id("new-account");
///
/// assert_eq!(write.content_id.as_deref(), Some("new-account"));
/// assert_eq!(read.query.get("$top").map(String::as_str), Some("5"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BatchRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The division the operation belongs to.
    pub division: Division,
    /// The endpoint below the division, e.g. `/crm/Accounts`.
    pub endpoint: String,
    /// Query parameters.
    pub query: BTreeMap<String, String>,
    /// The JSON body of a POST or PUT.
    pub body: Option<Value>,
    /// The `Content-ID` of a write. Defaults to its 1-based position.
    pub content_id: Option<String>,
}

impl BatchRequest {
    fn new(method: HttpMethod, division: Division, endpoint: &str, body: Option<Value>) -> Self {
        let endpoint = if endpoint.starts_with('/') {
            endpoint.to_string()
        } else {
            format!("/{endpoint}")
        };
        Self {
            method,
            division,
            endpoint,
            query: BTreeMap::new(),
            body,
            content_id: None,
        }
    }

    /// Creates a GET sub-request.
    #[must_use]
    pub fn get(division: Division, endpoint: &str) -> Self {
        Self::new(HttpMethod::Get, division, endpoint, None)
    }

    /// Creates a POST sub-request.
    #[must_use]
    pub fn post(division: Division, endpoint: &str, body: Value) -> Self {
        Self::new(HttpMethod::Post, division, endpoint, Some(body))
    }

    /// Creates a PUT sub-request.
    #[must_use]
    pub fn put(division: Division, endpoint: &str, body: Value) -> Self {
        Self::new(HttpMethod::Put, division, endpoint, Some(body))
    }

    /// Creates a DELETE sub-request.
    #[must_use]
    pub fn delete(division: Division, endpoint: &str) -> Self {
        Self::new(HttpMethod::Delete, division, endpoint, None)
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Sets the `Content-ID` of a write.
    #[must_use]
    pub fn content_id(mut self, id: impl Into<String>) -> Self {
        self.content_id = Some(id.into());
        self
    }

    /// Returns the absolute URL of this operation below `api_url`.
    #[must_use]
    pub fn url(&self, api_url: &str) -> String {
        let mut url = format!("{api_url}/{}{}", self.division, self.endpoint);
        if !self.query.is_empty() {
            let query: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }
}

/// An encoded `multipart/mixed` batch body.
#[derive(Clone, Debug)]
pub struct EncodedBatch {
    /// The `Content-Type` header value, including the boundary.
    pub content_type: String,
    /// The encoded body.
    pub body: String,
}

/// Encodes sub-requests into one multipart body, in caller order.
///
/// GETs become top-level parts. Every write is wrapped in a changeset of
/// its own, so one failing write cannot roll back another.
#[must_use]
pub fn encode_batch(requests: &[BatchRequest], api_url: &str) -> EncodedBatch {
    let boundary = format!("batch_{}", Uuid::new_v4().simple());
    let mut parts = Vec::with_capacity(requests.len() + 1);
    let mut writes = 0usize;

    for request in requests {
        let url = request.url(api_url);
        if request.method.is_write() {
            writes += 1;
            let changeset = format!("changeset_{}", Uuid::new_v4().simple());
            let content_id = request
                .content_id
                .clone()
                .unwrap_or_else(|| writes.to_string());
            let body = request.body.as_ref().map(Value::to_string).unwrap_or_default();
            let operation = [
                format!("--{changeset}"),
                "Content-Type: application/http".to_string(),
                "Content-Transfer-Encoding: binary".to_string(),
                format!("Content-ID: {content_id}"),
                String::new(),
                format!("{} {url} HTTP/1.1", request.method),
                "Content-Type: application/json".to_string(),
                "Accept: application/json".to_string(),
                String::new(),
                body,
                format!("--{changeset}--"),
            ];
            parts.push(
                [
                    format!("--{boundary}"),
                    format!("Content-Type: multipart/mixed; boundary={changeset}"),
                    String::new(),
                    operation.join(CRLF),
                ]
                .join(CRLF),
            );
        } else {
            parts.push(
                [
                    format!("--{boundary}"),
                    "Content-Type: application/http".to_string(),
                    "Content-Transfer-Encoding: binary".to_string(),
                    String::new(),
                    format!("GET {url} HTTP/1.1"),
                    "Accept: application/json".to_string(),
                    String::new(),
                ]
                .join(CRLF),
            );
        }
    }
    parts.push(format!("--{boundary}--"));

    EncodedBatch {
        content_type: format!("multipart/mixed; boundary={boundary}"),
        body: parts.join(CRLF),
    }
}
