//! Ollama connector endpoint tests against a mock HTTP server

use ai_connectors::error::ConnectorError;
use ai_connectors::ollama::{OllamaConfig, OllamaConnector};
use ai_connectors::traits::{ChatCompletion, EmbeddingGeneration};
use synaptik_types::{ChatHistory, PromptExecutionSettings};

fn connector_for(server: &mockito::ServerGuard) -> OllamaConnector {
    OllamaConnector::new(OllamaConfig::default().with_base_url(server.url())).unwrap()
}

#[tokio::test]
async fn test_chat_happy_path() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "model": "llama3.1",
                "created_at": "2024-06-01T12:00:00Z",
                "message": {"role": "assistant", "content": "local reply"},
                "done": true,
                "prompt_eval_count": 20,
                "eval_count": 5
            })
            .to_string(),
        )
        .create_async()
        .await;

    let connector = connector_for(&server);
    let mut history = ChatHistory::new();
    history.add_user_message("hi");

    let result = connector
        .complete(&history, &PromptExecutionSettings::default())
        .await
        .unwrap();

    assert_eq!(result.content, "local reply");
    let usage = result.usage.unwrap();
    assert_eq!(usage.prompt_tokens, 20);
    assert_eq!(usage.total_tokens, 25);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_without_token_counts() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "model": "llama3.1",
                "message": {"role": "assistant", "content": "ok"},
                "done": true
            })
            .to_string(),
        )
        .create_async()
        .await;

    let connector = connector_for(&server);
    let mut history = ChatHistory::new();
    history.add_user_message("hi");

    let result = connector
        .complete(&history, &PromptExecutionSettings::default())
        .await
        .unwrap();
    assert!(result.usage.is_none());
}

#[tokio::test]
async fn test_batched_embeddings() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/embed")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "model": "nomic-embed-text",
                "embeddings": [[0.1, 0.2], [0.3, 0.4]]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let connector = connector_for(&server);
    let embeddings = connector
        .generate_embeddings(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[1].as_slice(), &[0.3, 0.4]);
}

#[tokio::test]
async fn test_server_error_translated() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body(r#"{"error": "model not loaded"}"#)
        .create_async()
        .await;

    let connector = connector_for(&server);
    let mut history = ChatHistory::new();
    history.add_user_message("hi");

    let result = connector
        .complete(&history, &PromptExecutionSettings::default())
        .await;
    assert!(matches!(
        result,
        Err(ConnectorError::Api { status: 500, .. })
    ));
}
