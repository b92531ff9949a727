//! Tests for the embedding API client and provider.
//!
//! Covered:
//! 1. Request format and headers
//! 2. Status-code classification (429, 401/403, 5xx, other 4xx)
//! 3. Single attempt per call
//! 4. Batching and dimension checks in the provider

use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::embeddings::api::{ApiConfig, EmbeddingApiClient};
use crate::embeddings::EmbeddingProvider;
use crate::error::{ErrorKind, FactbaseError};

fn test_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        api_key: Some("test-api-key".to_string()),
        model: "text-embedding-3-small".to_string(),
        timeout_secs: 10,
    }
}

fn embedding_response(embeddings: Vec<Vec<f32>>) -> serde_json::Value {
    json!({
        "data": embeddings.into_iter().map(|e| json!({ "embedding": e })).collect::<Vec<_>>()
    })
}

/// Mounts a responder that counts calls and always returns `status`.
async fn mount_status(server: &MockServer, status: u16) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with({
            let count = Arc::clone(&count);
            move |_: &wiremock::Request| {
                count.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(status)
                    .set_body_json(json!({ "error": "nope" }))
                    .insert_header("retry-after", "12")
            }
        })
        .mount(server)
        .await;
    count
}

// =============================================================================
// Request format
// =============================================================================

#[tokio::test]
async fn test_api_client_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_response(vec![
            vec![0.1, 0.2, 0.3],
            vec![0.4, 0.5, 0.6],
        ])))
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let embeddings = client.embed(&["text 1", "text 2"]).await.unwrap();

    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[0], vec![0.1, 0.2, 0.3]);
    assert_eq!(embeddings[1], vec![0.4, 0.5, 0.6]);
}

#[tokio::test]
async fn test_api_client_request_format_and_auth_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer test-api-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "model": "text-embedding-3-small",
            "input": ["hello world"]
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.1, 0.2, 0.3]])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    assert!(client.embed(&["hello world"]).await.is_ok());
}

#[tokio::test]
async fn test_api_client_trailing_slash_in_base_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.1, 0.2, 0.3]])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&format!("{}/", mock_server.uri()));
    let client = EmbeddingApiClient::new(config).unwrap();
    assert!(client.embed(&["x"]).await.is_ok());
}

#[tokio::test]
async fn test_api_client_count_mismatch_is_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.1, 0.2, 0.3]])),
        )
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let err = client.embed(&["a", "b"]).await.unwrap_err();
    assert!(matches!(err, FactbaseError::Embedding(_)));
}

// =============================================================================
// Error classification
// =============================================================================

#[tokio::test]
async fn test_rate_limit_is_classified_with_retry_after() {
    let mock_server = MockServer::start().await;
    let count = mount_status(&mock_server, 429).await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let err = client.embed(&["test"]).await.unwrap_err();

    assert!(matches!(
        err,
        FactbaseError::RateLimited {
            retry_after: Some(12)
        }
    ));
    assert!(err.is_retryable());
    assert_eq!(count.load(Ordering::SeqCst), 1, "client must not retry");
}

#[tokio::test]
async fn test_server_errors_are_transient() {
    for status in [500u16, 502, 503] {
        let mock_server = MockServer::start().await;
        let count = mount_status(&mock_server, status).await;

        let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
        let err = client.embed(&["test"]).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transient, "status {status}");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}

#[tokio::test]
async fn test_auth_errors_are_not_retryable() {
    for status in [401u16, 403] {
        let mock_server = MockServer::start().await;
        mount_status(&mock_server, status).await;

        let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
        let err = client.embed(&["test"]).await.unwrap_err();

        assert!(matches!(err, FactbaseError::Auth(_)), "status {status}");
        assert!(!err.is_retryable());
    }
}

#[tokio::test]
async fn test_bad_request_is_plain_embedding_error() {
    let mock_server = MockServer::start().await;
    mount_status(&mock_server, 400).await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    let err = client.embed(&["test"]).await.unwrap_err();
    assert!(matches!(err, FactbaseError::Embedding(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_transient() {
    // Nothing listens on port 9 of localhost in the test environment.
    let client = EmbeddingApiClient::new(test_config("http://127.0.0.1:9")).unwrap();
    let err = client.embed(&["test"]).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transient);
}

#[tokio::test]
async fn test_api_client_dimension_detection() {
    let mock_server = MockServer::start().await;

    let dims_1536: Vec<f32> = (0..1536).map(|i| i as f32 * 0.0001).collect();
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(embedding_response(vec![dims_1536])))
        .mount(&mock_server)
        .await;

    let client = EmbeddingApiClient::new(test_config(&mock_server.uri())).unwrap();
    assert_eq!(client.detect_dimensions().await.unwrap(), 1536);
}

// =============================================================================
// Provider batching and dimension checks
// =============================================================================

#[tokio::test]
async fn test_provider_splits_into_batches() {
    let mock_server = MockServer::start().await;
    let calls = Arc::new(AtomicUsize::new(0));

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with({
            let calls = Arc::clone(&calls);
            move |req: &wiremock::Request| {
                calls.fetch_add(1, Ordering::SeqCst);
                let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
                let n = body["input"].as_array().unwrap().len();
                ResponseTemplate::new(200)
                    .set_body_json(embedding_response(vec![vec![1.0, 0.0, 0.0]; n]))
            }
        })
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::from_api(test_config(&mock_server.uri()), 3, 2).unwrap();
    let texts: Vec<String> = (0..5).map(|i| format!("text {i}")).collect();
    let vectors = provider.generate(&texts).await.unwrap();

    assert_eq!(vectors.len(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_provider_rejects_wrong_dimensions() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(embedding_response(vec![vec![0.1, 0.2]])),
        )
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::from_api(test_config(&mock_server.uri()), 3, 8).unwrap();
    let err = provider.embed_passage("hello").await.unwrap_err();

    assert!(matches!(
        err,
        FactbaseError::DimensionMismatch {
            expected: 3,
            actual: 2
        }
    ));
}

#[tokio::test]
async fn test_provider_empty_input_makes_no_call() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    let provider = EmbeddingProvider::from_api(test_config(&mock_server.uri()), 3, 8).unwrap();
    assert!(provider.generate(&[]).await.unwrap().is_empty());
}
