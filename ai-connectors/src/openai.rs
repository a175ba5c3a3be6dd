//! OpenAI connector
//!
//! Adapts the OpenAI REST API to the Synaptik service traits:
//! - Chat completions (`/chat/completions`)
//! - Embeddings (`/embeddings`)
//! - Image generation (`/images/generations`)
//! - Speech synthesis (`/audio/speech`)
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
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use synaptik_types::{
    AudioContent, ChatHistory, ChatResult, Embedding, GeneratedImage, PromptExecutionSettings,
    TokenUsage,
};

use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::{ChatCompletion, EmbeddingGeneration, TextToAudio, TextToImage};

/// OpenAI connector configuration
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub chat_model: String,
    pub embedding_model: String,
    pub image_model: String,
    pub audio_model: String,
    pub timeout_seconds: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
            organization: None,
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            image_model: "dall-e-3".to_string(),
            audio_model: "tts-1".to_string(),
            timeout_seconds: 30,
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("OPENAI_API_KEY").ok().map(|api_key| {
            let mut config = Self::new(api_key);
            config.base_url = std::env::var("OPENAI_BASE_URL").ok();
            config.organization = std::env::var("OPENAI_ORGANIZATION").ok();
            if let Ok(model) = std::env::var("OPENAI_CHAT_MODEL") {
                config.chat_model = model;
            }
            if let Ok(model) = std::env::var("OPENAI_EMBEDDING_MODEL") {
                config.embedding_model = model;
            }
            config.timeout_seconds = std::env::var("OPENAI_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30);
            config
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }
}

// ============================================================================
// Wire DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessageDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessageDto {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<UsageDto>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessageDto,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UsageDto {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

impl From<UsageDto> for TokenUsage {
    fn from(usage: UsageDto) -> Self {
        TokenUsage {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: Vec<String>,
    pub encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    pub data: Vec<EmbeddingData>,
    pub usage: Option<UsageDto>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    pub index: usize,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
pub struct ImageGenerationRequest {
    pub model: String,
    pub prompt: String,
    pub n: u8,
    pub size: String,
    pub response_format: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ImageGenerationResponse {
    pub data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
pub struct ImageData {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SpeechRequest {
    pub model: String,
    pub input: String,
    pub voice: String,
    pub response_format: &'static str,
}

// ============================================================================
// Connector
// ============================================================================

/// OpenAI connector
pub struct OpenAiConnector {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiConnector {
    pub fn new(config: OpenAiConfig) -> ConnectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://api.openai.com/v1")
    }

    fn authorized_post(&self, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.config.api_key));
        if let Some(ref org) = self.config.organization {
            request = request.header("OpenAI-Organization", org);
        }
        request
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> ConnectorResult<T> {
        let url = format!("{}/{}", self.base_url(), endpoint);
        let response = self.authorized_post(&url).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ConnectorError::from_status(status, error_text));
        }

        Ok(response.json().await?)
    }

    /// Sizes accepted by the configured image model
    fn validate_image_size(&self, width: u32, height: u32) -> ConnectorResult<String> {
        let supported: &[(u32, u32)] = if self.config.image_model == "dall-e-2" {
            &[(256, 256), (512, 512), (1024, 1024)]
        } else {
            &[(1024, 1024), (1792, 1024), (1024, 1792)]
        };
        if !supported.contains(&(width, height)) {
            return Err(ConnectorError::Configuration(format!(
                "Size {}x{} not supported by model {}",
                width, height, self.config.image_model
            )));
        }
        Ok(format!("{}x{}", width, height))
    }
}

fn history_to_dto(history: &ChatHistory) -> Vec<ChatMessageDto> {
    history
        .messages()
        .iter()
        .map(|m| ChatMessageDto {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
            name: m.name.clone(),
        })
        .collect()
}

#[async_trait]
impl ChatCompletion for OpenAiConnector {
    fn name(&self) -> &str {
        "openai"
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

        debug!(model = %model, messages = history.len(), "OpenAI chat completion");

        let request = ChatCompletionRequest {
            model,
            messages: history_to_dto(history),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop: settings.stop_sequences.clone(),
            user: settings.user.clone(),
        };

        let response: ChatCompletionResponse =
            self.post_json("chat/completions", &request).await?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            ConnectorError::InvalidResponse("No choices in response".to_string())
        })?;

        Ok(ChatResult {
            content: choice.message.content,
            model: response.model,
            usage: response.usage.map(Into::into),
        })
    }
}

#[async_trait]
impl EmbeddingGeneration for OpenAiConnector {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn generate_embeddings(&self, texts: &[String]) -> ConnectorResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: self.config.embedding_model.clone(),
            input: texts.to_vec(),
            encoding_format: "float",
        };

        let mut response: EmbeddingResponse = self.post_json("embeddings", &request).await?;

        if response.data.len() != texts.len() {
            return Err(ConnectorError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                response.data.len()
            )));
        }

        // Provider order is by index, not necessarily input order
        response.data.sort_by_key(|d| d.index);
        Ok(response
            .data
            .into_iter()
            .map(|d| Embedding::from(d.embedding))
            .collect())
    }
}

#[async_trait]
impl TextToImage for OpenAiConnector {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn generate_image(
        &self,
        description: &str,
        width: u32,
        height: u32,
    ) -> ConnectorResult<GeneratedImage> {
        if description.is_empty() {
            return Err(ConnectorError::Configuration(
                "Image description must not be empty".to_string(),
            ));
        }
        let size = self.validate_image_size(width, height)?;

        info!(model = %self.config.image_model, size = %size, "OpenAI image generation");

        let request = ImageGenerationRequest {
            model: self.config.image_model.clone(),
            prompt: description.to_string(),
            n: 1,
            size,
            response_format: "url",
        };

        let response: ImageGenerationResponse =
            self.post_json("images/generations", &request).await?;

        let image = response.data.into_iter().next().ok_or_else(|| {
            ConnectorError::InvalidResponse("No image in response".to_string())
        })?;

        if let Some(url) = image.url {
            Ok(GeneratedImage::Url(url))
        } else if let Some(b64) = image.b64_json {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(b64)
                .map_err(|e| ConnectorError::InvalidResponse(format!("Bad base64 image: {}", e)))?;
            Ok(GeneratedImage::Bytes(bytes))
        } else {
            Err(ConnectorError::InvalidResponse(
                "Image response carried neither url nor b64_json".to_string(),
            ))
        }
    }
}

#[async_trait]
impl TextToAudio for OpenAiConnector {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn generate_audio(&self, text: &str, voice: &str) -> ConnectorResult<AudioContent> {
        if text.is_empty() {
            return Err(ConnectorError::Configuration(
                "Speech input must not be empty".to_string(),
            ));
        }
        if voice.is_empty() {
            return Err(ConnectorError::Configuration(
                "Voice must not be empty".to_string(),
            ));
        }

        info!(model = %self.config.audio_model, voice = %voice, "OpenAI speech synthesis");

        let request = SpeechRequest {
            model: self.config.audio_model.clone(),
            input: text.to_string(),
            voice: voice.to_string(),
            response_format: "mp3",
        };

        // Speech responses are raw audio bytes, not JSON
        let url = format!("{}/audio/speech", self.base_url());
        let response = self.authorized_post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ConnectorError::from_status(status, error_text));
        }

        let data = response.bytes().await?.to_vec();
        Ok(AudioContent {
            data,
            mime_type: "audio/mpeg".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector() -> OpenAiConnector {
        OpenAiConnector::new(OpenAiConfig::new("sk-test")).unwrap()
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatCompletionRequest {
            model: "gpt-4o-mini".to_string(),
            messages: vec![ChatMessageDto {
                role: "user".to_string(),
                content: "hi".to_string(),
                name: None,
            }],
            max_tokens: Some(16),
            temperature: None,
            top_p: None,
            stop: None,
            user: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 16
            })
        );
    }

    #[test]
    fn test_chat_response_deserialization() {
        let body = serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "hello"},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
        });
        let response: ChatCompletionResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.choices[0].message.content, "hello");
        assert_eq!(response.usage.as_ref().unwrap().total_tokens, 7);
    }

    #[test]
    fn test_image_size_validation() {
        let c = connector();
        // dall-e-3 default
        assert!(c.validate_image_size(1024, 1024).is_ok());
        assert!(c.validate_image_size(1792, 1024).is_ok());
        assert!(c.validate_image_size(512, 512).is_err());

        let mut config = OpenAiConfig::new("sk-test");
        config.image_model = "dall-e-2".to_string();
        let c2 = OpenAiConnector::new(config).unwrap();
        assert!(c2.validate_image_size(512, 512).is_ok());
        assert!(c2.validate_image_size(1792, 1024).is_err());
    }

    #[tokio::test]
    async fn test_empty_history_rejected() {
        let c = connector();
        let result = c
            .complete(
                &synaptik_types::ChatHistory::new(),
                &PromptExecutionSettings::default(),
            )
            .await;
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_empty_embedding_input_short_circuits() {
        let c = connector();
        let embeddings = c.generate_embeddings(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
