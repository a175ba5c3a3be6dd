//! Service registry
//!
//! Holds registered connectors keyed by service id and resolves them for
//! callers, the way a dependency-injection container would in other
//! frameworks. The first registered service of each kind becomes the
//! default until overridden.
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


use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::{ChatCompletion, EmbeddingGeneration, TextToAudio, TextToImage};

/// Ordered collection of services of one kind, keyed by service id
struct ServiceSlot<T: ?Sized> {
    entries: Vec<(String, Arc<T>)>,
    default_id: Option<String>,
}

impl<T: ?Sized> ServiceSlot<T> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            default_id: None,
        }
    }

    fn add(&mut self, service_id: String, service: Arc<T>) {
        if self.default_id.is_none() {
            self.default_id = Some(service_id.clone());
        }
        if let Some(existing) = self.entries.iter_mut().find(|(id, _)| *id == service_id) {
            warn!(service_id = %service_id, "Replacing already-registered service");
            existing.1 = service;
        } else {
            self.entries.push((service_id, service));
        }
    }

    fn get(&self, service_id: &str) -> Option<Arc<T>> {
        self.entries
            .iter()
            .find(|(id, _)| id == service_id)
            .map(|(_, s)| s.clone())
    }

    fn default(&self) -> Option<Arc<T>> {
        self.default_id.as_deref().and_then(|id| self.get(id))
    }

    fn set_default(&mut self, service_id: &str) -> bool {
        if self.entries.iter().any(|(id, _)| id == service_id) {
            self.default_id = Some(service_id.to_string());
            true
        } else {
            false
        }
    }

    fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|(id, _)| id.clone()).collect()
    }
}

/// Registry of AI service connectors
pub struct ServiceRegistry {
    chat: ServiceSlot<dyn ChatCompletion>,
    embedding: ServiceSlot<dyn EmbeddingGeneration>,
    image: ServiceSlot<dyn TextToImage>,
    audio: ServiceSlot<dyn TextToAudio>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            chat: ServiceSlot::new(),
            embedding: ServiceSlot::new(),
            image: ServiceSlot::new(),
            audio: ServiceSlot::new(),
        }
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    pub fn add_chat_completion(
        &mut self,
        service_id: impl Into<String>,
        service: Arc<dyn ChatCompletion>,
    ) {
        let service_id = service_id.into();
        info!(service_id = %service_id, connector = service.name(), "Registering chat completion service");
        self.chat.add(service_id, service);
    }

    pub fn add_embedding_generation(
        &mut self,
        service_id: impl Into<String>,
        service: Arc<dyn EmbeddingGeneration>,
    ) {
        let service_id = service_id.into();
        info!(service_id = %service_id, connector = service.name(), "Registering embedding service");
        self.embedding.add(service_id, service);
    }

    pub fn add_text_to_image(
        &mut self,
        service_id: impl Into<String>,
        service: Arc<dyn TextToImage>,
    ) {
        let service_id = service_id.into();
        info!(service_id = %service_id, connector = service.name(), "Registering text-to-image service");
        self.image.add(service_id, service);
    }

    pub fn add_text_to_audio(
        &mut self,
        service_id: impl Into<String>,
        service: Arc<dyn TextToAudio>,
    ) {
        let service_id = service_id.into();
        info!(service_id = %service_id, connector = service.name(), "Registering text-to-audio service");
        self.audio.add(service_id, service);
    }

    // Builder-style registration for fluent setup

    pub fn with_chat_completion(
        mut self,
        service_id: impl Into<String>,
        service: Arc<dyn ChatCompletion>,
    ) -> Self {
        self.add_chat_completion(service_id, service);
        self
    }

    pub fn with_embedding_generation(
        mut self,
        service_id: impl Into<String>,
        service: Arc<dyn EmbeddingGeneration>,
    ) -> Self {
        self.add_embedding_generation(service_id, service);
        self
    }

    pub fn with_text_to_image(
        mut self,
        service_id: impl Into<String>,
        service: Arc<dyn TextToImage>,
    ) -> Self {
        self.add_text_to_image(service_id, service);
        self
    }

    pub fn with_text_to_audio(
        mut self,
        service_id: impl Into<String>,
        service: Arc<dyn TextToAudio>,
    ) -> Self {
        self.add_text_to_audio(service_id, service);
        self
    }

    // ------------------------------------------------------------------
    // Defaults
    // ------------------------------------------------------------------

    pub fn set_default_chat_completion(&mut self, service_id: &str) {
        if !self.chat.set_default(service_id) {
            warn!(service_id = %service_id, "Cannot set unknown chat service as default");
        }
    }

    pub fn set_default_embedding_generation(&mut self, service_id: &str) {
        if !self.embedding.set_default(service_id) {
            warn!(service_id = %service_id, "Cannot set unknown embedding service as default");
        }
    }

    pub fn set_default_text_to_image(&mut self, service_id: &str) {
        if !self.image.set_default(service_id) {
            warn!(service_id = %service_id, "Cannot set unknown image service as default");
        }
    }

    pub fn set_default_text_to_audio(&mut self, service_id: &str) {
        if !self.audio.set_default(service_id) {
            warn!(service_id = %service_id, "Cannot set unknown audio service as default");
        }
    }

    // ------------------------------------------------------------------
    // Resolution
    // ------------------------------------------------------------------

    pub fn chat_completion(&self, service_id: &str) -> ConnectorResult<Arc<dyn ChatCompletion>> {
        self.chat
            .get(service_id)
            .ok_or_else(|| ConnectorError::ServiceNotFound(service_id.to_string()))
    }

    pub fn default_chat_completion(&self) -> ConnectorResult<Arc<dyn ChatCompletion>> {
        self.chat.default().ok_or_else(|| {
            ConnectorError::ServiceUnavailable("No chat completion service registered".to_string())
        })
    }

    pub fn embedding_generation(
        &self,
        service_id: &str,
    ) -> ConnectorResult<Arc<dyn EmbeddingGeneration>> {
        self.embedding
            .get(service_id)
            .ok_or_else(|| ConnectorError::ServiceNotFound(service_id.to_string()))
    }

    pub fn default_embedding_generation(&self) -> ConnectorResult<Arc<dyn EmbeddingGeneration>> {
        self.embedding.default().ok_or_else(|| {
            ConnectorError::ServiceUnavailable("No embedding service registered".to_string())
        })
    }

    pub fn text_to_image(&self, service_id: &str) -> ConnectorResult<Arc<dyn TextToImage>> {
        self.image
            .get(service_id)
            .ok_or_else(|| ConnectorError::ServiceNotFound(service_id.to_string()))
    }

    pub fn default_text_to_image(&self) -> ConnectorResult<Arc<dyn TextToImage>> {
        self.image.default().ok_or_else(|| {
            ConnectorError::ServiceUnavailable("No text-to-image service registered".to_string())
        })
    }

    pub fn text_to_audio(&self, service_id: &str) -> ConnectorResult<Arc<dyn TextToAudio>> {
        self.audio
            .get(service_id)
            .ok_or_else(|| ConnectorError::ServiceNotFound(service_id.to_string()))
    }

    pub fn default_text_to_audio(&self) -> ConnectorResult<Arc<dyn TextToAudio>> {
        self.audio.default().ok_or_else(|| {
            ConnectorError::ServiceUnavailable("No text-to-audio service registered".to_string())
        })
    }

    /// Service ids of all registered chat completion services
    pub fn chat_completion_ids(&self) -> Vec<String> {
        self.chat.ids()
    }

    /// Service ids of all registered embedding services
    pub fn embedding_generation_ids(&self) -> Vec<String> {
        self.embedding.ids()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
