//! Tests for the Ollama embedder against a mock `/api/embed` endpoint.

use axum::{Json, Router, routing::post};
use ragdemo_common::RagError;
use ragdemo_store::{Embedder, OllamaEmbedder};
use serde_json::{Value, json};

async fn start_mock() -> String {
    // One-hot vector keyed on input length, so each text gets a fixed vector.
    let router = Router::new().route(
        "/api/embed",
        post(|Json(body): Json<Value>| async move {
            let inputs = body["input"].as_array().cloned().unwrap_or_default();
            let embeddings: Vec<Vec<f32>> = inputs
                .iter()
                .map(|text| {
                    let len = text.as_str().unwrap_or_default().len();
                    let mut v = vec![0.0; 4];
                    v[len % 4] = 1.0;
                    v
                })
                .collect();
            Json(json!({ "model": body["model"], "embeddings": embeddings }))
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_embed_single_and_batch() {
    let base = start_mock().await;
    let embedder = OllamaEmbedder::new(Some(base), "all-minilm".to_string(), 4);

    let single = embedder.embed("fruit").await.unwrap();
    assert_eq!(single.vector(), &[0.0, 1.0, 0.0, 0.0]);

    let batch = embedder
        .embed_all(&["fruit".to_string(), "chess".to_string(), "pizza!".to_string()])
        .await
        .unwrap();
    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0], single);
    assert_eq!(batch[2].vector(), &[0.0, 0.0, 1.0, 0.0]);
}

#[tokio::test]
async fn test_embed_is_deterministic() {
    let base = start_mock().await;
    let embedder = OllamaEmbedder::new(Some(base), "all-minilm".to_string(), 4);
    let a = embedder.embed("banana").await.unwrap();
    let b = embedder.embed("banana").await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_model_unavailable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let embedder = OllamaEmbedder::new(Some(format!("http://{}", addr)), "all-minilm".into(), 4);
    let err = embedder.embed("fruit").await.unwrap_err();
    assert!(matches!(err, RagError::ModelUnavailable(_)), "got {err:?}");
}
