//! Trait definitions for AI service connectors
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
use synaptik_types::{
    AudioContent, ChatHistory, ChatResult, Embedding, GeneratedImage, PromptExecutionSettings,
};

use crate::error::ConnectorResult;

/// Chat completion service
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Connector name (e.g. "openai", "ollama")
    fn name(&self) -> &str;

    /// Check if the connector is configured and usable
    fn is_available(&self) -> bool;

    /// Produce an assistant reply for the given conversation
    async fn complete(
        &self,
        history: &ChatHistory,
        settings: &PromptExecutionSettings,
    ) -> ConnectorResult<ChatResult>;
}

/// Text embedding generation service
#[async_trait]
pub trait EmbeddingGeneration: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Generate one embedding per input text, order preserved.
    ///
    /// An empty input slice returns an empty vector without touching the
    /// provider.
    async fn generate_embeddings(&self, texts: &[String]) -> ConnectorResult<Vec<Embedding>>;
}

/// Text-to-image service
#[async_trait]
pub trait TextToImage: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Generate an image from a description at the requested size.
    ///
    /// Connectors reject sizes their provider does not support before
    /// issuing the HTTP call.
    async fn generate_image(
        &self,
        description: &str,
        width: u32,
        height: u32,
    ) -> ConnectorResult<GeneratedImage>;
}

/// Text-to-audio (speech synthesis) service
#[async_trait]
pub trait TextToAudio: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Synthesize speech for the given text with the named voice
    async fn generate_audio(&self, text: &str, voice: &str) -> ConnectorResult<AudioContent>;
}
