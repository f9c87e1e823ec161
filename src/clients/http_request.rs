//! HTTP request types for the Exact Online API.
//!
//! This module provides the [`HttpRequest`] type and its builder. A request
//! names the division it belongs to; the division selects both the URL prefix
//! (`/api/v1/{division}`) and the rate limit partition.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::clients::errors::InvalidHttpRequestError;
use crate::config::Division;

/// HTTP methods supported by the Exact Online REST API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method for retrieving resources.
    Get,
    /// HTTP POST method for creating resources.
    Post,
    /// HTTP PUT method for updating resources.
    Put,
    /// HTTP DELETE method for removing resources.
    Delete,
}

impl HttpMethod {
    /// Returns `true` for methods that modify data.
    #[must_use]
    pub const fn is_write(&self) -> bool {
        !matches!(self, Self::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A request body.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// A JSON document, sent as `application/json`.
    Json(serde_json::Value),
    /// A pre-encoded body with an explicit content type.
    Text {
        /// The `Content-Type` header value.
        content_type: String,
        /// The encoded body.
        text: String,
    },
}

impl RequestBody {
    /// Returns the `Content-Type` header value for this body.
    #[must_use]
    pub fn content_type(&self) -> &str {
        match self {
            Self::Json(_) => "application/json",
            Self::Text { content_type, .. } => content_type,
        }
    }

    /// Returns the encoded body.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            Self::Json(value) => value.to_string(),
            Self::Text { text, .. } => text.clone(),
        }
    }
}

/// An HTTP request to be sent through the request pipeline.
///
/// # Example
///
/// ```rust
/// use exact_online::clients::{HttpRequest, HttpMethod};
/// use exact_online::Division;
/// use serde_json::json;
///
/// let division = Division::new(123).unwrap();
///
/// let list = HttpRequest::builder(HttpMethod::Get, "/crm/Accounts")
///     .division(division)
///     .query_param("$top", "10")
///     .build()
///     .unwrap();
///
/// let create = HttpRequest::builder(HttpMethod::Post, "/crm/Accounts")
///     .division(division)
///     .json(json!({"Name": "Acme"}))
///     .build()
///     .unwrap();
///
/// let me = HttpRequest::builder(HttpMethod::Get, "/current/Me")
///     .build()
///     .unwrap();
/// assert!(me.division.is_none());
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method for this request.
    pub method: HttpMethod,
    /// The division this request belongs to, if any.
    pub division: Option<Division>,
    /// Whether the division is inserted into the URL path.
    pub division_in_path: bool,
    /// The path below the API root (and division, when in the path).
    pub path: String,
    /// Query parameters to append to the URL.
    pub query: BTreeMap<String, String>,
    /// The request body, if any.
    pub body: Option<RequestBody>,
    /// Additional headers to include in the request.
    pub extra_headers: HashMap<String, String>,
}

impl HttpRequest {
    /// Creates a new builder for constructing an `HttpRequest`.
    #[must_use]
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> HttpRequestBuilder {
        HttpRequestBuilder::new(method, path)
    }

    /// Returns the full URL for this request below `api_url`.
    #[must_use]
    pub fn url(&self, api_url: &str) -> String {
        match self.division.filter(|_| self.division_in_path) {
            Some(division) => format!("{api_url}/{division}{}", self.path),
            None => format!("{api_url}{}", self.path),
        }
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError::MissingBody`] if a POST or PUT has no
    /// body, and [`InvalidHttpRequestError::InvalidPath`] if the path is empty.
    pub fn verify(&self) -> Result<(), InvalidHttpRequestError> {
        if self.path.trim_matches('/').is_empty() {
            return Err(InvalidHttpRequestError::InvalidPath {
                path: self.path.clone(),
            });
        }

        if matches!(self.method, HttpMethod::Post | HttpMethod::Put) && self.body.is_none() {
            return Err(InvalidHttpRequestError::MissingBody {
                method: self.method.to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    request: HttpRequest,
}

impl HttpRequestBuilder {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            request: HttpRequest {
                method,
                division: None,
                division_in_path: true,
                path,
                query: BTreeMap::new(),
                body: None,
                extra_headers: HashMap::new(),
            },
        }
    }

    /// Sets the division, which selects the URL prefix and rate limit partition.
    #[must_use]
    pub const fn division(mut self, division: Division) -> Self {
        self.request.division = Some(division);
        self
    }

    /// Controls whether the division is inserted into the URL path.
    ///
    /// The batch endpoint lives at the API root but is still rate limited per
    /// division.
    #[must_use]
    pub const fn division_in_path(mut self, in_path: bool) -> Self {
        self.request.division_in_path = in_path;
        self
    }

    /// Sets a JSON body.
    #[must_use]
    pub fn json(mut self, body: impl Into<serde_json::Value>) -> Self {
        self.request.body = Some(RequestBody::Json(body.into()));
        self
    }

    /// Sets a pre-encoded body with an explicit content type.
    #[must_use]
    pub fn text_body(mut self, content_type: impl Into<String>, text: impl Into<String>) -> Self {
        self.request.body = Some(RequestBody::Text {
            content_type: content_type.into(),
            text: text.into(),
        });
        self
    }

    /// Sets all query parameters at once.
    #[must_use]
    pub fn query(mut self, query: BTreeMap<String, String>) -> Self {
        self.request.query = query;
        self
    }

    /// Adds a single query parameter.
    #[must_use]
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.query.insert(key.into(), value.into());
        self
    }

    /// Adds a single extra header.
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.extra_headers.insert(key.into(), value.into());
        self
    }

    /// Builds the [`HttpRequest`], validating it in the process.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidHttpRequestError`] if the request fails validation.
    pub fn build(self) -> Result<HttpRequest, InvalidHttpRequestError> {
        self.request.verify()?;
        Ok(self.request)
    }
}
