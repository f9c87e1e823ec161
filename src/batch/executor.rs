//! Sends a batch through the request pipeline.

use crate::batch::request::encode_batch;
use crate::batch::response::{boundary_from_content_type, decode_batch};
use crate::batch::{BatchError, BatchRequest, BatchResult};
use crate::clients::{HttpError, HttpMethod, HttpRequest, RestClient};

/// Executes sub-requests of one division as a single `$batch` call.
///
/// The call goes through the request pipeline, so it is admitted by the
/// division's rate limiter and retried as a whole on transient failure.
/// Sub-requests are never retried individually: resubmit the failed ones
/// as a new batch or as single calls.
///
/// # Errors
///
/// - [`BatchError::Empty`] if `requests` is empty
/// - [`BatchError::MixedDivisions`] if the sub-requests span divisions
/// - [`BatchError::Http`] if the batch call itself fails
/// - [`BatchError::MissingBoundary`] or [`BatchError::ResultCountMismatch`]
///   if the response cannot be matched to the requests
///
/// # Example
///
/// ```rust,ignore
/// use exact_online::batch::{execute_batch, BatchRequest};
/// use serde_json::json;
///
/// let result = execute_batch(&client, &[
///     BatchRequest::get(division, "/crm/Accounts").query_param("$top", "5"),
///     BatchRequest::post(division, "/crm/Accounts", json!({"Name": "Acme"})),
/// ])
/// .await?;
///
/// for response in &result {
///     match &response.error {
///         None => println!("{}: {}", response.status_code, response.data),
///         Some(error) => println!("failed: {error}"),
///     }
/// }
/// ```
pub async fn execute_batch(
    client: &RestClient,
    requests: &[BatchRequest],
) -> Result<BatchResult, BatchError> {
    let first = requests.first().ok_or(BatchError::Empty)?;
    let division = first.division;
    if let Some(other) = requests.iter().find(|r| r.division != division) {
        return Err(BatchError::MixedDivisions {
            first: division.code(),
            other: other.division.code(),
        });
    }

    let http = client.http_client();
    let encoded = encode_batch(requests, http.api_url());
    let request = HttpRequest::builder(HttpMethod::Post, "/$batch")
        .division(division)
        .division_in_path(false)
        .text_body(encoded.content_type, encoded.body)
        .header("Accept", "multipart/mixed")
        .build()
        .map_err(HttpError::from)?;

    let response = http.request(request).await?;
    let boundary = response
        .header("content-type")
        .and_then(boundary_from_content_type)
        .ok_or(BatchError::MissingBoundary)?;

    let responses = decode_batch(&response.text, &boundary);
    if responses.len() != requests.len() {
        return Err(BatchError::ResultCountMismatch {
            expected: requests.len(),
            actual: responses.len(),
        });
    }

    let result = BatchResult::new(responses);
    tracing::debug!(
        division = %division,
        requests = requests.len(),
        failed = result.failed_count(),
        "Batch executed"
    );
    Ok(result)
}
