//! AI Service Connectors
//!
//! This crate adapts external AI service APIs to the Synaptik service
//! abstractions (chat completion, text embedding, text-to-image,
//! text-to-audio):
//! - OpenAI (chat, embeddings, images, speech)
//! - Azure OpenAI-compatible endpoints (chat, embeddings)
//! - Mistral (chat, embeddings)
//! - Ollama (chat, embeddings, local server)
//! - ONNX Runtime (local embedding generation, feature `onnx`)
//!
//! Connectors are registered into a [`ServiceRegistry`] and resolved by
//! service id.
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


pub mod error;
pub mod registry;
pub mod traits;

pub mod azure_openai;
pub mod mistral;
pub mod ollama;
pub mod openai;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use error::{ConnectorError, ConnectorResult};
pub use registry::ServiceRegistry;
pub use traits::{ChatCompletion, EmbeddingGeneration, TextToAudio, TextToImage};
