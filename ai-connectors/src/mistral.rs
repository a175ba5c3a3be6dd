//! Mistral connector
//!
//! Adapts the Mistral "La Plateforme" REST API:
//! - Chat completions (`/v1/chat/completions`)
//! - Embeddings (`/v1/embeddings`)
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

/// Mistral connector configuration
#[derive(Debug, Clone)]
pub struct MistralConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    /// Prepend Mistral's safety prompt to conversations
    pub safe_prompt: bool,
    /// Seed for deterministic sampling, when the provider honors it
    pub random_seed: Option<u64>,
    pub timeout_seconds: u64,
}

impl MistralConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            chat_model: "mistral-small-latest".to_string(),
            embedding_model: "mistral-embed".to_string(),
            safe_prompt: false,
            random_seed: None,
            timeout_seconds: 30,
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("MISTRAL_API_KEY").ok().map(|api_key| {
            let mut config = Self::new(api_key);
            config.base_url = std::env::var("MISTRAL_BASE_URL").ok();
            if let Ok(model) = std::env::var("MISTRAL_CHAT_MODEL") {
                config.chat_model = model;
            }
            config.timeout_seconds = std::env::var("MISTRAL_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30);
            config
        })
    }
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct MistralChatRequest {
    pub model: String,
    pub messages: Vec<MistralMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub safe_prompt: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MistralMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MistralChatResponse {
    pub model: String,
    pub choices: Vec<MistralChoice>,
    pub usage: Option<MistralUsage>,
}

#[derive(Debug, Deserialize)]
pub struct MistralChoice {
    pub message: MistralMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MistralUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct MistralEmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct MistralEmbeddingResponse {
    pub data: Vec<MistralEmbeddingData>,
}

#[derive(Debug, Deserialize)]
pub struct MistralEmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

// ============================================================================
// Connector
// ============================================================================

/// Mistral connector
pub struct MistralConnector {
    config: MistralConfig,
    client: reqwest::Client,
}

impl MistralConnector {
    pub fn new(config: MistralConfig) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://api.mistral.ai/v1")
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ConnectorResult<T> {
        let url = format!("{}/{}", self.base_url(), endpoint);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ConnectorError::from_status(status, error_text));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl ChatCompletion for MistralConnector {
    fn name(&self) -> &str {
        "mistral"
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
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

        debug!(model = %model, messages = history.len(), "Mistral chat completion");

        let request = MistralChatRequest {
            model,
            messages: history
                .messages()
                .iter()
                .map(|m| MistralMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop: settings.stop_sequences.clone(),
            random_seed: self.config.random_seed,
            safe_prompt: self.config.safe_prompt,
        };

        let response: MistralChatResponse = self.post_json("chat/completions", &request).await?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ConnectorError::InvalidResponse("No choices in response".to_string())
        })?;

        Ok(ChatResult {
            content: choice.message.content,
            model: response.model,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl EmbeddingGeneration for MistralConnector {
    fn name(&self) -> &str {
        "mistral"
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn generate_embeddings(&self, texts: &[String]) -> ConnectorResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = MistralEmbeddingRequest {
            model: self.config.embedding_model.clone(),
            input: texts.to_vec(),
        };

        let mut response: MistralEmbeddingResponse =
            self.post_json("embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(ConnectorError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        response.data.sort_by_key(|d| d.index);
        Ok(response
            .data
            .into_iter()
            .map(|d| Embedding::from(d.embedding))
            .collect())
    }
}
