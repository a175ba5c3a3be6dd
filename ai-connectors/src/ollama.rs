//! Ollama connector
//!
//! Talks to a local Ollama server (default `http://localhost:11434`):
//! - Chat (`/api/chat`, non-streaming)
//! - Embeddings (`/api/embed`, batched input)
//!
//! Ollama has no authentication; availability means a base URL is
//! configured.
// Copyright 2025 Synaptik Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use synaptik_types::{ChatHistory, ChatResult, Embedding, PromptExecutionSettings, TokenUsage};

use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::{ChatCompletion, EmbeddingGeneration};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama connector configuration
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_model: "llama3.1".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_seconds: 120,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("OLLAMA_CHAT_MODEL") {
            config.chat_model = model;
        }
        if let Ok(model) = std::env::var("OLLAMA_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct OllamaChatRequest {
    pub model: String,
    pub messages: Vec<OllamaMessage>,
    /// Always false; the connector consumes single-shot responses
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OllamaMessage {
    pub role: String,
    pub content: String,
}

/// Model options forwarded in the `options` map
#[derive(Debug, Default, Serialize)]
pub struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Ollama's name for max generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl OllamaOptions {
    fn from_settings(settings: &PromptExecutionSettings) -> Option<Self> {
        if settings.temperature.is_none()
            && settings.top_p.is_none()
            && settings.max_tokens.is_none()
            && settings.stop_sequences.is_none()
        {
            return None;
        }
        Some(Self {
            temperature: settings.temperature,
            top_p: settings.top_p,
            num_predict: settings.max_tokens,
            stop: settings.stop_sequences.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OllamaChatResponse {
    pub model: String,
    pub message: OllamaMessage,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub prompt_eval_count: Option<u32>,
    #[serde(default)]
    pub eval_count: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct OllamaEmbedRequest {
    pub model: String,
    pub input: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OllamaEmbedResponse {
    pub embeddings: Vec<Vec<f32>>,
}

// ============================================================================
// Connector
// ============================================================================

/// Ollama connector
pub struct OllamaConnector {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaConnector {
    pub fn new(config: OllamaConfig) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ConnectorResult<T> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let response = self.client.post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ConnectorError::from_status(status, error_text));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatCompletion for OllamaConnector {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_available(&self) -> bool {
        !self.config.base_url.is_empty()
    }

    async fn complete(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> ConnectorResult<ChatResult> {
        if history.is_empty() {
            return Err(ConnectorError::Configuration(
                "Chat history must contain at least one message".to_string(),
            ));
        }

        let model = settings
            .model_id
            .clone()
            .unwrap_or_else(|| self.config.chat_model.clone());

        debug!(model = %model, messages = history.len(), "Ollama chat");

        let request = OllamaChatRequest {
            model,
            messages: history
                .messages()
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: false,
            options: OllamaOptions::from_settings(settings),
        };

        let response: OllamaChatResponse = self.post_json("api/chat", &request).await?;

        // Token counts are optional on the wire; only report usage when both sides exist
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        Ok(ChatResult {
            content: response.message.content,
            model: response.model,
            usage,
        })
    }
}

#[async_trait]
impl EmbeddingGeneration for OllamaConnector {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_available(&self) -> bool {
        !self.config.base_url.is_empty()
    }

    async fn generate_embeddings(&self, texts: &[String]) -> ConnectorResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OllamaEmbedRequest {
            model: self.config.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let response: OllamaEmbedResponse = self.post_json("api/embed", &request).await?;

        if response.embeddings.len() != texts.len() {
            return Err(ConnectorError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }

        Ok(response.embeddings.into_iter().map(Embedding::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_pins_stream_false() {
        let request = OllamaChatRequest {
            model: "llama3.1".to_string(),
            messages: vec![OllamaMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            stream: false,
            options: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], false);
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_options_built_only_when_needed() {
        let empty = PromptExecutionSettings::default();
        assert!(OllamaOptions::from_settings(&empty).is_none());

        let with_knobs = PromptExecutionSettings::default()
            .with_max_tokens(64)
            .with_temperature(0.7);
        let options = OllamaOptions::from_settings(&with_knobs).unwrap();
        assert_eq!(options.num_predict, Some(64));
        assert_eq!(options.temperature, Some(0.7));
    }

    #[test]
    fn test_chat_response_deserialization() {
        let body = serde_json::json!({
            "model": "llama3.1",
            "created_at": "2024-01-01T00:00:00Z",
            "message": {"role": "assistant", "content": "hello"},
            "done": true,
            "prompt_eval_count": 12,
            "eval_count": 4
        });
        let response: OllamaChatResponse = serde_json::from_value(body).unwrap();
        assert!(response.done);
        assert_eq!(response.message.content, "hello");
        assert_eq!(response.eval_count, Some(4));
    }
}
