//! Runs the commands against a local index and a mock embedding service.

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sdd_cli::{Command, execute};
use sdd_ticket_dedup::{DedupConfig, EmbeddingProviderType, IndexBackend};

async fn mock_embedding(server: &MockServer, input: &str, vector: [f32; 3]) {
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(body_partial_json(json!({ "input": input })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "embedding": vector, "index": 0 }],
            "model": "text-embedding-3-small",
            "usage": { "prompt_tokens": 4, "total_tokens": 4 }
        })))
        .mount(server)
        .await;
}

fn config(server: &MockServer, dir: &TempDir) -> DedupConfig {
    let mut config = DedupConfig::default();
    config.search.backend = IndexBackend::Local;
    config.search.local_path = dir.path().join("tickets.json");
    config.embedding.provider = EmbeddingProviderType::OpenAI;
    config.embedding.endpoint = Some(server.uri());
    config.embedding.api_key = Some("test-key".to_string());
    config.embedding.dimension = 3;
    config
}

#[tokio::test]
async fn record_then_search_and_history() {
    let server = MockServer::start().await;
    mock_embedding(&server, "Users can reset their password", [1.0, 0.0, 0.0]).await;
    mock_embedding(&server, "Password reset via email link", [0.95, 0.312, 0.0]).await;
    mock_embedding(&server, "Export invoices", [0.0, 1.0, 0.0]).await;
    let dir = TempDir::new().unwrap();
    let config = config(&server, &dir);

    let saved = execute(
        Command::Record {
            spec_link: "https://x.atlassian.net/browse/KAN-1".to_string(),
            content: Some("Users can reset their password".to_string()),
            file: None,
            dev_link: "https://x.atlassian.net/browse/KAN-7".to_string(),
            issue_link: "https://github.com/o/r/issues/3".to_string(),
        },
        &config,
    )
    .await
    .unwrap();
    assert!(saved.starts_with("Ticket mapping saved."));

    let found = execute(
        Command::Search {
            content: Some("Password reset via email link".to_string()),
            file: None,
            threshold: None,
        },
        &config,
    )
    .await
    .unwrap();
    assert!(found.starts_with("Found 1 similar existing ticket(s):"));
    assert!(found.contains("dev ticket: https://x.atlassian.net/browse/KAN-7"));

    let not_found = execute(
        Command::Search {
            content: Some("Export invoices".to_string()),
            file: None,
            threshold: None,
        },
        &config,
    )
    .await
    .unwrap();
    assert!(not_found.starts_with("No similar existing tickets found."));

    let history = execute(Command::History { count: None }, &config).await.unwrap();
    assert!(history.starts_with("Recent ticket mapping history (1 of 1):"));
    assert!(history.contains("summary: Users can reset their password"));
}

#[tokio::test]
async fn ensure_index_reports_name_and_dimension() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let output = execute(Command::EnsureIndex, &config(&server, &dir)).await.unwrap();

    assert_eq!(output, "Index 'sdd-tickets-index' is ready (3 dimensions).");
}

#[tokio::test]
async fn invalid_config_fails_before_any_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&server, &dir);
    config.embedding.api_key = None;

    let err = execute(
        Command::Search {
            content: Some("Users can reset their password".to_string()),
            file: None,
            threshold: None,
        },
        &config,
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "configuration error: embedding API key is not set"
    );
}

#[tokio::test]
async fn index_commands_run_without_embedding_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let mut config = config(&server, &dir);
    config.embedding.api_key = None;
    config.embedding.endpoint = None;

    let ready = execute(Command::EnsureIndex, &config).await.unwrap();
    assert_eq!(ready, "Index 'sdd-tickets-index' is ready (3 dimensions).");

    let history = execute(Command::History { count: Some(3) }, &config)
        .await
        .unwrap();
    assert!(history.starts_with("No ticket mapping history"));
}
