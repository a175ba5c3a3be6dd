//! OpenAI connector endpoint tests against a mock HTTP server

use ai_connectors::error::ConnectorError;
use ai_connectors::openai::{OpenAiConfig, OpenAiConnector};
use ai_connectors::traits::{ChatCompletion, EmbeddingGeneration, TextToAudio};
use synaptik_types::{ChatHistory, PromptExecutionSettings};

fn connector_for(server: &mockito::ServerGuard) -> OpenAiConnector {
    OpenAiConnector::new(OpenAiConfig::new("sk-test").with_base_url(server.url())).unwrap()
}

#[tokio::test]
async fn test_chat_completion_happy_path() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "hello there"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
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

    assert_eq!(result.content, "hello there");
    assert_eq!(result.usage.unwrap().total_tokens, 12);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_completion_auth_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body(r#"{"error": {"message": "Incorrect API key"}}"#)
        .create_async()
        .await;

    let connector = connector_for(&server);
    let mut history = ChatHistory::new();
    history.add_user_message("hi");

    let result = connector
        .complete(&history, &PromptExecutionSettings::default())
        .await;
    assert!(matches!(result, Err(ConnectorError::Auth(_))));
}

#[tokio::test]
async fn test_rate_limit_translation() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/embeddings")
        .with_status(429)
        .with_body(r#"{"error": {"message": "Rate limit reached"}}"#)
        .create_async()
        .await;

    let connector = connector_for(&server);
    let result = connector.generate_embeddings(&["text".to_string()]).await;
    assert!(matches!(result, Err(ConnectorError::RateLimit(_))));
}

#[tokio::test]
async fn test_embeddings_reordered_by_index() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "data": [
                    {"index": 1, "embedding": [0.3, 0.4]},
                    {"index": 0, "embedding": [0.1, 0.2]}
                ],
                "model": "text-embedding-3-small"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let connector = connector_for(&server);
    let embeddings = connector
        .generate_embeddings(&["first".to_string(), "second".to_string()])
        .await
        .unwrap();

    assert_eq!(embeddings.len(), 2);
    assert_eq!(embeddings[0].as_slice(), &[0.1, 0.2]);
    assert_eq!(embeddings[1].as_slice(), &[0.3, 0.4]);
}

#[tokio::test]
async fn test_embedding_count_mismatch_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/embeddings")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "data": [{"index": 0, "embedding": [0.1]}],
                "model": "text-embedding-3-small"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let connector = connector_for(&server);
    let result = connector
        .generate_embeddings(&["a".to_string(), "b".to_string()])
        .await;
    assert!(matches!(result, Err(ConnectorError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_speech_returns_raw_bytes() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/audio/speech")
        .with_status(200)
        .with_header("content-type", "audio/mpeg")
        .with_body(&[0x49u8, 0x44, 0x33, 0x04][..])
        .create_async()
        .await;

    let connector = connector_for(&server);
    let audio = connector.generate_audio("hello", "alloy").await.unwrap();
    assert_eq!(audio.data, vec![0x49, 0x44, 0x33, 0x04]);
    assert_eq!(audio.mime_type, "audio/mpeg");
}
