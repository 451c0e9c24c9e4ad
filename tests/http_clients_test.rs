//! Contract tests for the Together and Turbopuffer HTTP clients.
//!
//! Verify request format (path, auth header, body) and response parsing
//! against a local mock server.

use pagesearch::config::{EmbeddingConfig, IndexConfig};
use pagesearch::embedding::together::TogetherEmbeddingProvider;
use pagesearch::embedding::{EmbeddingError, EmbeddingProvider};
use pagesearch::provider::turbopuffer::TurbopufferProvider;
use pagesearch::provider::{CandidateProvider, CandidateQuery, ProviderError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn index_config(server: &MockServer) -> IndexConfig {
    IndexConfig {
        api_key: Some("tpuf-key".to_string()),
        base_url: Some(server.uri()),
        namespace: "pages-test".to_string(),
        ..IndexConfig::default()
    }
}

fn embedding_config(server: &MockServer) -> EmbeddingConfig {
    EmbeddingConfig {
        api_key: Some("tg-key".to_string()),
        base_url: format!("{}/v1", server.uri()),
        ..EmbeddingConfig::default()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Together embeddings
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_embed_sends_model_and_input() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .and(header("authorization", "Bearer tg-key"))
        .and(body_partial_json(json!({
            "model": "BAAI/bge-base-en-v1.5",
            "input": "whole earth"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.25, -0.5, 1.0]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TogetherEmbeddingProvider::new(&embedding_config(&server)).unwrap();
    let embedding = provider.embed("whole earth").await.unwrap();
    assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
    assert_eq!(provider.model_name(), "BAAI/bge-base-en-v1.5");
}

#[tokio::test]
async fn test_embed_maps_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&server)
        .await;

    let provider = TogetherEmbeddingProvider::new(&embedding_config(&server)).unwrap();
    match provider.embed("q").await {
        Err(EmbeddingError::Api { status, message }) => {
            assert_eq!(status, 429);
            assert_eq!(message, "rate limited");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_embed_empty_data_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .mount(&server)
        .await;

    let provider = TogetherEmbeddingProvider::new(&embedding_config(&server)).unwrap();
    assert!(matches!(
        provider.embed("q").await,
        Err(EmbeddingError::Generation(_))
    ));
}

#[test]
fn test_embed_requires_api_key() {
    let config = EmbeddingConfig::default();
    assert!(matches!(
        TogetherEmbeddingProvider::new(&config),
        Err(EmbeddingError::NotConfigured(_))
    ));
}

// ────────────────────────────────────────────────────────────────────────────
// Turbopuffer queries
// ────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lexical_query_request_and_rows() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/namespaces/pages-test/query"))
        .and(header("authorization", "Bearer tpuf-key"))
        .and(body_partial_json(json!({
            "rank_by": ["ocr_result", "BM25", "geodesic domes"],
            "top_k": 30
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rows": [
                {
                    "id": "7d1c",
                    "$dist": 12.5,
                    "parent_issue_id": "issue-1",
                    "page_number": 4,
                    "ocr_result": "geodesic domes",
                    "r2_object_id": "7d1c.jpg"
                },
                {
                    "id": "8e2d",
                    "parent_issue_id": null,
                    "page_number": "9"
                }
            ],
            "billing": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TurbopufferProvider::new(&index_config(&server)).unwrap();
    let rows = provider
        .query(&CandidateQuery::Lexical { text: "geodesic domes".into() }, 30)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].id, "7d1c");
    assert_eq!(rows[0].score, 12.5);
    assert_eq!(rows[0].attributes.object_ref(), Some("7d1c.jpg"));
    assert_eq!(rows[1].id, "8e2d");
    assert_eq!(rows[1].score, 0.0);
    assert_eq!(rows[1].attributes.parent_issue_id, None);
    assert_eq!(rows[1].attributes.page_number, Some(9));
    assert_eq!(rows[1].attributes.object_ref(), None);
}

#[tokio::test]
async fn test_vector_query_sends_ann_rank_by() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/namespaces/pages-test/query"))
        .and(body_partial_json(json!({
            "rank_by": ["vector", "ANN", [0.5, 0.25]],
            "include_attributes": ["parent_issue_id", "page_number", "ocr_result", "r2_object_id"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"rows": [{"id": "a"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TurbopufferProvider::new(&index_config(&server)).unwrap();
    let rows = provider
        .query(&CandidateQuery::Vector { embedding: vec![0.5, 0.25] }, 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_filter_query_sends_eq_filter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/namespaces/pages-test/query"))
        .and(body_partial_json(json!({
            "filters": ["parent_issue_id", "Eq", "issue-3"],
            "top_k": 1000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TurbopufferProvider::new(&index_config(&server)).unwrap();
    let rows = provider
        .query(
            &CandidateQuery::Filter {
                attribute: "parent_issue_id".into(),
                equals: "issue-3".into(),
            },
            1000,
        )
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_query_maps_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/namespaces/pages-test/query"))
        .respond_with(ResponseTemplate::new(404).set_body_string("namespace not found"))
        .mount(&server)
        .await;

    let provider = TurbopufferProvider::new(&index_config(&server)).unwrap();
    match provider.query(&CandidateQuery::Lexical { text: "q".into() }, 5).await {
        Err(ProviderError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert!(message.contains("namespace not found"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_query_rejects_malformed_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/namespaces/pages-test/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let provider = TurbopufferProvider::new(&index_config(&server)).unwrap();
    assert!(matches!(
        provider.query(&CandidateQuery::Lexical { text: "q".into() }, 5).await,
        Err(ProviderError::Decode(_))
    ));
}

#[tokio::test]
async fn test_warm_cache_hint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/namespaces/pages-test/hint_cache_warm"))
        .and(header("authorization", "Bearer tpuf-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ACCEPTED",
            "message": "cache starting to warm"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = TurbopufferProvider::new(&index_config(&server)).unwrap();
    let status = provider.warm_cache().await.unwrap();
    assert_eq!(status.status, "ACCEPTED");
    assert_eq!(status.message.as_deref(), Some("cache starting to warm"));
}
