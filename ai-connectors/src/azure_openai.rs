//! Azure OpenAI connector
//!
//! Speaks the same wire schema as the OpenAI connector but addresses
//! deployment-scoped endpoints
//! (`{endpoint}/openai/deployments/{deployment}/{op}?api-version=...`)
//! and authenticates with an `api-key` header. Works against any Azure
//! OpenAI-compatible endpoint.
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

use synaptik_types::{ChatHistory, ChatResult, Embedding, PromptExecutionSettings};

use crate::error::{ConnectorError, ConnectorResult};
use crate::openai::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessageDto, EmbeddingRequest,
    EmbeddingResponse,
};
use crate::traits::{ChatCompletion, EmbeddingGeneration};

const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Azure OpenAI connector configuration
#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    /// Resource endpoint, e.g. `https://my-resource.openai.azure.com`
    pub endpoint: String,
    pub api_key: String,
    pub chat_deployment: String,
    pub embedding_deployment: String,
    pub api_version: String,
    pub timeout_seconds: u64,
}

impl AzureOpenAiConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        chat_deployment: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            chat_deployment: chat_deployment.into(),
            embedding_deployment: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_seconds: 30,
        }
    }

    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").ok()?;
        let api_key = std::env::var("AZURE_OPENAI_API_KEY").ok()?;
        let chat_deployment = std::env::var("AZURE_OPENAI_CHAT_DEPLOYMENT").ok()?;
        let mut config = Self::new(endpoint, api_key, chat_deployment);
        if let Ok(deployment) = std::env::var("AZURE_OPENAI_EMBEDDING_DEPLOYMENT") {
            config.embedding_deployment = deployment;
        }
        if let Ok(version) = std::env::var("AZURE_OPENAI_API_VERSION") {
            config.api_version = version;
        }
        Some(config)
    }

    pub fn with_embedding_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.embedding_deployment = deployment.into();
        self
    }
}

/// Azure OpenAI connector
pub struct AzureOpenAiConnector {
    config: AzureOpenAiConfig,
    client: reqwest::Client,
}

impl AzureOpenAiConnector {
    pub fn new(config: AzureOpenAiConfig) -> ConnectorResult<Self> {
        if config.endpoint.is_empty() {
            return Err(ConnectorError::Configuration(
                "Azure OpenAI endpoint must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    /// Deployment-scoped operation URL
    fn operation_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            deployment,
            operation,
            self.config.api_version
        )
    }

    async fn post_json<B: Serialize, T: for<'de> Deserialize<'de>>(
        &self,
        deployment: &str,
        operation: &str,
        body: &B,
    ) -> ConnectorResult<T> {
        if deployment.is_empty() {
            return Err(ConnectorError::Configuration(format!(
                "No deployment configured for {}",
                operation
            )));
        }
        let url = self.operation_url(deployment, operation);
        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
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
impl ChatCompletion for AzureOpenAiConnector {
    fn name(&self) -> &str {
        "azure_openai"
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty() && !self.config.chat_deployment.is_empty()
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

        debug!(
            deployment = %self.config.chat_deployment,
            messages = history.len(),
            "Azure OpenAI chat completion"
        );

        // Azure routes by deployment; the model field is informational
        let request = ChatCompletionRequest {
            model: self.config.chat_deployment.clone(),
            messages: history
                .messages()
                .iter()
                .map(|m| ChatMessageDto {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                    name: m.name.clone(),
                })
                .collect(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            top_p: settings.top_p,
            stop: settings.stop_sequences.clone(),
            user: settings.user.clone(),
        };

        let response: ChatCompletionResponse = self
            .post_json(
                &self.config.chat_deployment.clone(),
                "chat/completions",
                &request,
            )
            .await?;

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
impl EmbeddingGeneration for AzureOpenAiConnector {
    fn name(&self) -> &str {
        "azure_openai"
    }

    fn is_available(&self) -> bool {
        !self.config.api_key.is_empty() && !self.config.embedding_deployment.is_empty()
    }

    async fn generate_embeddings(&self, texts: &[String]) -> ConnectorResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = EmbeddingRequest {
            model: self.config.embedding_deployment.clone(),
            input: texts.to_vec(),
            encoding_format: "float",
        };

        let mut response: EmbeddingResponse = self
            .post_json(
                &self.config.embedding_deployment.clone(),
                "embeddings",
                &request,
            )
            .await?;

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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_url_shape() {
        let connector = AzureOpenAiConnector::new(AzureOpenAiConfig::new(
            "https://my-resource.openai.azure.com/",
            "key",
            "gpt4o",
        ))
        .unwrap();
        assert_eq!(
            connector.operation_url("gpt4o", "chat/completions"),
            "https://my-resource.openai.azure.com/openai/deployments/gpt4o/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn test_missing_endpoint_rejected() {
        let result = AzureOpenAiConnector::new(AzureOpenAiConfig::new("", "key", "gpt4o"));
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_embeddings_require_deployment() {
        let connector = AzureOpenAiConnector::new(AzureOpenAiConfig::new(
            "https://my-resource.openai.azure.com",
            "key",
            "gpt4o",
        ))
        .unwrap();
        // No embedding deployment configured
        let result = connector
            .generate_embeddings(&["text".to_string()])
            .await;
        assert!(matches!(result, Err(ConnectorError::Configuration(_))));
        assert!(!EmbeddingGeneration::is_available(&connector));
    }
}
