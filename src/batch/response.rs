//! Batch sub-responses and the multipart response decoder.

use serde_json::Value;

use crate::clients::extract_error_message;

/// The outcome of one sub-request.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchResponse {
    /// The sub-response status code.
    pub status_code: u16,
    /// The JSON body, or `Null` when there is none.
    pub data: Value,
    /// The upstream error message of a failed sub-request.
    pub error: Option<String>,
    /// The `Content-ID` echoed for a write.
    pub content_id: Option<String>,
}

impl BatchResponse {
    /// Returns `true` for 2xx status codes.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status_code >= 200 && self.status_code <= 299
    }

    /// Returns `true` for 4xx and 5xx status codes.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

/// The ordered outcomes of a batch, one per sub-request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchResult {
    responses: Vec<BatchResponse>,
}

impl BatchResult {
    /// Wraps decoded sub-responses.
    #[must_use]
    pub const fn new(responses: Vec<BatchResponse>) -> Self {
        Self { responses }
    }

    /// Returns `true` if every sub-request succeeded.
    #[must_use]
    pub fn all_successful(&self) -> bool {
        self.responses.iter().all(BatchResponse::is_success)
    }

    /// Returns the number of failed sub-requests.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_error()).count()
    }

    /// Iterates over the sub-responses in request order.
    pub fn iter(&self) -> std::slice::Iter<'_, BatchResponse> {
        self.responses.iter()
    }

    /// Returns the number of sub-responses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns `true` if there are no sub-responses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Returns the sub-response at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BatchResponse> {
        self.responses.get(index)
    }

    /// Consumes the result, returning the sub-responses.
    #[must_use]
    pub fn into_inner(self) -> Vec<BatchResponse> {
        self.responses
    }
}

impl IntoIterator for BatchResult {
    type Item = BatchResponse;
    type IntoIter = std::vec::IntoIter<BatchResponse>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

impl<'a> IntoIterator for &'a BatchResult {
    type Item = &'a BatchResponse;
    type IntoIter = std::slice::Iter<'a, BatchResponse>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

/// Extracts the `boundary` parameter of a multipart `Content-Type`.
#[must_use]
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_string())
            .filter(|b| !b.is_empty())
    })
}

/// Decodes a multipart batch body into sub-responses, in wire order.
///
/// Changesets are decoded recursively. Parts without an HTTP status line
/// are skipped.
#[must_use]
pub fn decode_batch(body: &str, boundary: &str) -> Vec<BatchResponse> {
    let mut responses = Vec::new();
    let delimiter = format!("--{boundary}");

    for part in body.split(delimiter.as_str()) {
        let part = part.trim_start_matches(['\r', '\n']);
        if part.trim().is_empty() || part.starts_with("--") {
            continue;
        }

        let (headers, content) = split_head(part);
        let content_type = header(headers, "content-type").unwrap_or_default();
        if content_type.to_ascii_lowercase().starts_with("multipart/mixed") {
            if let Some(nested) = boundary_from_content_type(content_type) {
                responses.extend(decode_batch(content, &nested));
            }
            continue;
        }

        if let Some(response) = decode_operation(content, header(headers, "content-id")) {
            responses.push(response);
        }
    }
    responses
}

fn decode_operation(message: &str, content_id: Option<&str>) -> Option<BatchResponse> {
    let (head, body) = split_head(message);
    let status_line = head.lines().next()?.trim();
    if !status_line.starts_with("HTTP/") {
        return None;
    }
    let status_code: u16 = status_line.split_whitespace().nth(1)?.parse().ok()?;
    // A Content-ID may also sit in the inner headers.
    let content_id = content_id
        .or_else(|| header(head, "content-id"))
        .map(str::to_string);

    let body = body.trim();
    let data = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(body).unwrap_or(Value::Null)
    };
    let error = (status_code >= 400).then(|| {
        extract_error_message(&data).unwrap_or_else(|| {
            if body.is_empty() {
                status_line.to_string()
            } else {
                body.to_string()
            }
        })
    });

    Some(BatchResponse {
        status_code,
        data,
        error,
        content_id,
    })
}

/// Splits a MIME entity into its header block and its content.
fn split_head(entity: &str) -> (&str, &str) {
    [("\r\n\r\n", 4), ("\n\n", 2)]
        .iter()
        .filter_map(|(sep, len)| entity.find(sep).map(|at| (at, *len)))
        .min_by_key(|(at, _)| *at)
        .map_or((entity, ""), |(at, len)| (&entity[..at], &entity[at + len..]))
}

fn header<'a>(headers: &'a str, name: &str) -> Option<&'a str> {
    headers.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: &str = "--batch_r\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 200 OK\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"d\":{\"results\":[{\"Name\":\"A\"}]}}\r\n\
--batch_r\r\n\
Content-Type: multipart/mixed; boundary=changeset_r\r\n\
\r\n\
--changeset_r\r\n\
Content-Type: application/http\r\n\
Content-ID: 1\r\n\
\r\n\
HTTP/1.1 400 Bad Request\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"error\":{\"code\":\"\",\"message\":{\"lang\":\"\",\"value\":\"Name is required\"}}}\r\n\
--changeset_r--\r\n\
--batch_r\r\n\
Content-Type: multipart/mixed; boundary=\"changeset_s\"\r\n\
\r\n\
--changeset_s\r\n\
Content-Type: application/http\r\n\
Content-ID: 2\r\n\
\r\n\
HTTP/1.1 204 No Content\r\n\
\r\n\
\r\n\
--changeset_s--\r\n\
--batch_r--\r\n";

    #[test]
    fn test_boundary_from_content_type() {
        assert_eq!(
            boundary_from_content_type("multipart/mixed; boundary=batch_abc").as_deref(),
            Some("batch_abc")
        );
        assert_eq!(
            boundary_from_content_type("multipart/mixed; Boundary=\"b\"; charset=utf-8").as_deref(),
            Some("b")
        );
        assert_eq!(boundary_from_content_type("application/json"), None);
    }

    #[test]
    fn test_decode_mixed_batch() {
        let responses = decode_batch(MIXED, "batch_r");
        assert_eq!(responses.len(), 3);

        assert!(responses[0].is_success());
        assert_eq!(responses[0].data["d"]["results"][0]["Name"], "A");
        assert_eq!(responses[0].content_id, None);

        assert!(responses[1].is_error());
        assert_eq!(responses[1].error.as_deref(), Some("Name is required"));
        assert_eq!(responses[1].content_id.as_deref(), Some("1"));

        assert_eq!(responses[2].status_code, 204);
        assert_eq!(responses[2].data, Value::Null);
        assert_eq!(responses[2].content_id.as_deref(), Some("2"));
    }

    #[test]
    fn test_decode_bare_newlines_and_text_error() {
        let body = "--b\nContent-Type: application/http\n\nHTTP/1.1 500 Internal Server Error\n\nboom\n--b--";
        let responses = decode_batch(body, "b");
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_result_counts() {
        let result = BatchResult::new(decode_batch(MIXED, "batch_r"));
        assert_eq!(result.len(), 3);
        assert!(!result.all_successful());
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.iter().filter(|r| r.is_success()).count(), 2);
    }
}
