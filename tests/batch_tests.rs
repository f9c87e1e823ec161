//! Integration tests for `$batch` execution.
//!
//! These tests verify that a batch is sent as one multipart request and that
//! each sub-response is decoded on its own, including when one of them fails.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use exact_online::batch::{execute_batch, BatchError, BatchRequest};
use exact_online::{
    ClientId, ClientSecret, Division, ExactConfig, HostUrl, MemoryCredentialStore, RedirectUri,
    RestClient, RetryPolicy, TokenState,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> RestClient {
    let config = ExactConfig::builder()
        .client_id(ClientId::new("client-id").unwrap())
        .client_secret(ClientSecret::new("client-secret").unwrap())
        .redirect_uri(RedirectUri::new("https://app.example.com/callback").unwrap())
        .base_url(HostUrl::new(server.uri()).unwrap())
        .retry(RetryPolicy::None)
        .build()
        .unwrap();
    let tokens = TokenState::new("access-token", "refresh-token", Utc::now() + ChronoDuration::minutes(10));
    RestClient::new(config, Arc::new(MemoryCredentialStore::with_tokens(tokens))).unwrap()
}

fn division(code: u32) -> Division {
    Division::new(code).unwrap()
}

const MIXED_RESPONSE: &str = "--batchresponse_1\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 200 OK\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"d\":{\"results\":[{\"ID\":\"a\",\"Name\":\"First\"}]}}\r\n\
--batchresponse_1\r\n\
Content-Type: multipart/mixed; boundary=changesetresponse_1\r\n\
\r\n\
--changesetresponse_1\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
Content-ID: 1\r\n\
\r\n\
HTTP/1.1 400 Bad Request\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"error\":{\"code\":\"\",\"message\":{\"lang\":\"\",\"value\":\"Name is required\"}}}\r\n\
--changesetresponse_1--\r\n\
--batchresponse_1\r\n\
Content-Type: application/http\r\n\
Content-Transfer-Encoding: binary\r\n\
\r\n\
HTTP/1.1 200 OK\r\n\
Content-Type: application/json\r\n\
\r\n\
{\"d\":{\"results\":[{\"ID\":\"c\",\"Name\":\"Third\"}]}}\r\n\
--batchresponse_1--\r\n";

#[tokio::test]
async fn test_batch_with_one_failing_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/$batch"))
        .and(header("Authorization", "Bearer access-token"))
        .and(header("Accept", "multipart/mixed"))
        .and(header_regex("Content-Type", "^multipart/mixed; boundary=batch_[0-9a-f]+$"))
        .and(body_string_contains("/api/v1/42/crm/Accounts?%24top=1 HTTP/1.1"))
        .and(body_string_contains("POST "))
        .and(body_string_contains("Content-ID: 1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "multipart/mixed; boundary=batchresponse_1")
                .set_body_string(MIXED_RESPONSE),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let requests = [
        BatchRequest::get(division(42), "/crm/Accounts").query_param("$top", "1"),
        BatchRequest::post(division(42), "/crm/Accounts", json!({"Code": "X"})),
        BatchRequest::get(division(42), "/crm/Accounts").query_param("$top", "2"),
    ];

    let result = assert_ok!(execute_batch(&client, &requests).await);

    assert_eq!(result.len(), 3);
    assert!(!result.all_successful());
    assert_eq!(result.failed_count(), 1);

    let responses: Vec<_> = result.iter().collect();
    assert!(responses[0].is_success());
    assert_eq!(responses[0].data["d"]["results"][0]["Name"], "First");

    assert!(responses[1].is_error());
    assert_eq!(responses[1].status_code, 400);
    assert_eq!(responses[1].error.as_deref(), Some("Name is required"));
    assert_eq!(responses[1].content_id.as_deref(), Some("1"));

    assert!(responses[2].is_success());
    assert_eq!(responses[2].data["d"]["results"][0]["Name"], "Third");
}

#[tokio::test]
async fn test_batch_through_rest_client_counts_against_division() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/$batch"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "multipart/mixed; boundary=b")
                .set_body_string(
                    "--b\r\nContent-Type: application/http\r\n\r\nHTTP/1.1 200 OK\r\n\r\n{\"d\":{}}\r\n--b--",
                ),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let result = assert_ok!(
        client
            .batch(&[BatchRequest::get(division(7), "/current/Me")])
            .await
    );

    assert!(result.all_successful());
    assert_eq!(client.rate_limiter().budget(division(7)).unwrap().minutely_remaining, 59);
}

#[tokio::test]
async fn test_batch_rejects_invalid_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let client = client(&server);

    let empty = assert_err!(execute_batch(&client, &[]).await);
    assert!(matches!(empty, BatchError::Empty));

    let mixed = assert_err!(
        execute_batch(
            &client,
            &[
                BatchRequest::get(division(1), "/crm/Accounts"),
                BatchRequest::delete(division(2), "/crm/Accounts(guid'x')"),
            ],
        )
        .await
    );
    assert!(matches!(mixed, BatchError::MixedDivisions { first: 1, other: 2 }));
}

#[tokio::test]
async fn test_batch_response_count_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/$batch"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "multipart/mixed; boundary=b")
                .set_body_string(
                    "--b\r\nContent-Type: application/http\r\n\r\nHTTP/1.1 200 OK\r\n\r\n{}\r\n--b--",
                ),
        )
        .mount(&server)
        .await;

    let client = client(&server);
    let error = assert_err!(
        execute_batch(
            &client,
            &[
                BatchRequest::get(division(1), "/crm/Accounts"),
                BatchRequest::get(division(1), "/crm/Contacts"),
            ],
        )
        .await
    );
    assert!(matches!(
        error,
        BatchError::ResultCountMismatch {
            expected: 2,
            actual: 1
        }
    ));
}

#[tokio::test]
async fn test_batch_response_without_boundary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/$batch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"d": {}})))
        .mount(&server)
        .await;

    let client = client(&server);
    let error = assert_err!(
        execute_batch(&client, &[BatchRequest::get(division(1), "/crm/Accounts")]).await
    );
    assert!(matches!(error, BatchError::MissingBoundary));
}

#[tokio::test]
async fn test_failed_batch_call_is_an_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/$batch"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&server)
        .await;

    let client = client(&server);
    let error = assert_err!(
        execute_batch(&client, &[BatchRequest::get(division(1), "/crm/Accounts")]).await
    );
    assert!(matches!(error, BatchError::Http(e) if e.status() == Some(403)));
}
