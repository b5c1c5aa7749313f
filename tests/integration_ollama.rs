#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Ollama client tests against a mock HTTP server. The client is blocking,
// so every call runs inside spawn_blocking while the mock server drives the
// async side.

use ragcmp::backends::{Embedder, Generator, OllamaClient};
use ragcmp::config::{Config, OllamaConfig};
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> OllamaClient {
    let addr = server.address();
    let config = Config {
        ollama: OllamaConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            batch_size: 4,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };

    OllamaClient::new(&config)
        .expect("Failed to create client")
        .with_retry_attempts(1)
}

async fn run_blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .expect("blocking task panicked")
}

#[tokio::test]
async fn ping_hits_tags_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "models": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = run_blocking(move || client.ping()).await;
    assert!(result.is_ok(), "ping should succeed: {result:?}");
}

#[tokio::test]
async fn list_models_parses_names_and_sizes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                { "name": "nomic-embed-text", "size": 274_302_450u64 },
                { "name": "llama3.1:8b" }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let models = run_blocking(move || client.list_models())
        .await
        .expect("list models");

    assert_eq!(models.len(), 2);
    assert_eq!(models[0].name, "nomic-embed-text");
    assert_eq!(models[0].size, Some(274_302_450));
    assert_eq!(models[1].size, None);
}

#[tokio::test]
async fn health_check_fails_when_model_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [{ "name": "some-other-model" }]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = run_blocking(move || client.health_check()).await;
    assert!(result.is_err(), "health check should flag a missing model");
}

#[tokio::test]
async fn query_embedding_uses_single_prompt_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .and(body_partial_json(json!({
            "model": "nomic-embed-text",
            "prompt": "what is chunking?"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embedding": [0.1, 0.2, 0.3]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let vector = run_blocking(move || client.embed_query("what is chunking?"))
        .await
        .expect("embed query");

    assert_eq!(vector, vec![0.1, 0.2, 0.3]);
}

#[tokio::test]
async fn batch_embedding_uses_input_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["alpha", "beta"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0], [0.0, 1.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["alpha".to_string(), "beta".to_string()];
    let vectors = run_blocking(move || client.embed(&texts))
        .await
        .expect("embed batch");

    assert_eq!(vectors.len(), 2);
    assert_eq!(vectors[0], vec![1.0, 0.0]);
}

#[tokio::test]
async fn oversized_batch_is_split_across_requests() {
    let server = MockServer::start().await;
    // batch_size is 4, so six texts arrive as two requests.
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["t0", "t1", "t2", "t3"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0], [2.0], [3.0], [4.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "input": ["t4", "t5"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[5.0], [6.0]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts: Vec<String> = (0..6).map(|i| format!("t{i}")).collect();
    let vectors = run_blocking(move || client.embed(&texts))
        .await
        .expect("embed batches");

    assert_eq!(vectors.len(), 6);
    assert_eq!(vectors[5], vec![6.0]);
}

#[tokio::test]
async fn batch_count_mismatch_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0]]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["alpha".to_string(), "beta".to_string()];
    let result = run_blocking(move || client.embed(&texts)).await;
    assert!(result.is_err(), "count mismatch must not pass silently");
}

#[tokio::test]
async fn inconsistent_dimensions_are_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [[1.0, 0.0], [0.5]]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let texts = vec!["alpha".to_string(), "beta".to_string()];
    let result = run_blocking(move || client.embed(&texts)).await;
    assert!(result.is_err(), "ragged embeddings must be rejected");
}

#[tokio::test]
async fn chat_returns_message_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.1:8b",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": { "role": "assistant", "content": "  The answer.  " }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let answer = run_blocking(move || client.generate("system", "user question"))
        .await
        .expect("chat");

    assert_eq!(answer, "The answer.");
}

#[tokio::test]
async fn chat_without_content_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = run_blocking(move || client.generate("system", "user question")).await;
    assert!(result.is_err(), "empty chat responses must surface as errors");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).with_retry_attempts(3);
    let result = run_blocking(move || client.embed_query("text")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embeddings"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).with_retry_attempts(2);
    let result = run_blocking(move || client.embed_query("text")).await;
    assert!(result.is_err());
}

// Optional checks against a real local Ollama. Run with
// `cargo test --test integration_ollama -- --ignored`.

fn live_client() -> OllamaClient {
    let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("OLLAMA_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(11434);

    let config = Config {
        ollama: OllamaConfig {
            host,
            port,
            ..OllamaConfig::default()
        },
        ..Config::default()
    };

    OllamaClient::new(&config).expect("Failed to create client")
}

#[test]
#[ignore = "requires a local Ollama instance"]
fn live_health_check() {
    let client = live_client();
    let result = client.health_check();
    assert!(result.is_ok(), "health check failed: {result:?}");
}

#[test]
#[ignore = "requires a local Ollama instance with the embedding model pulled"]
fn live_embedding_has_stable_dimension() {
    let client = live_client();

    let single = client
        .embed_query("A short test sentence about retrieval.")
        .expect("single embedding");
    assert!(single.len() >= 100, "suspiciously small embedding");

    let texts = vec![
        "Documents are split into overlapping chunks.".to_string(),
        "Chunks are embedded and stored row-aligned with metadata.".to_string(),
    ];
    let batch = client.embed(&texts).expect("batch embedding");
    assert_eq!(batch.len(), 2);
    assert!(batch.iter().all(|v| v.len() == single.len()));
}

#[test]
#[ignore = "requires a local Ollama instance with the chat model pulled"]
fn live_chat_produces_text() {
    let client = live_client();
    let answer = client
        .generate("You are a helpful assistant. Answer concisely.", "Say hello.")
        .expect("chat");
    assert!(!answer.trim().is_empty());
}
