//! Memory record model shared by the vector-store connectors
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


use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::Embedding;

/// Descriptive fields stored alongside an embedding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecordMetadata {
    /// Source text the embedding was generated from
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub description: String,
    /// Name of the external system the record points at, if any
    #[serde(default)]
    pub external_source_name: String,
    /// Free-form payload the caller wants round-tripped
    #[serde(default)]
    pub additional_metadata: String,
    /// True when the record is only a pointer into an external source
    #[serde(default)]
    pub is_reference: bool,
}

/// A single entry in a vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub id: String,
    pub embedding: Embedding,
    pub metadata: MemoryRecordMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl MemoryRecord {
    /// Record holding its own text locally
    pub fn local_record(
        id: impl Into<String>,
        text: impl Into<String>,
        description: impl Into<String>,
        embedding: Embedding,
    ) -> Self {
        Self {
            id: id.into(),
            embedding,
            metadata: MemoryRecordMetadata {
                text: text.into(),
                description: description.into(),
                is_reference: false,
                ..Default::default()
            },
            timestamp: None,
        }
    }

    /// Record referencing content that lives in an external system
    pub fn reference_record(
        external_id: impl Into<String>,
        source_name: impl Into<String>,
        description: impl Into<String>,
        embedding: Embedding,
    ) -> Self {
        let external_id = external_id.into();
        Self {
            id: external_id.clone(),
            embedding,
            metadata: MemoryRecordMetadata {
                description: description.into(),
                external_source_name: source_name.into(),
                is_reference: true,
                ..Default::default()
            },
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Search hit: a record plus its similarity score
#[derive(Debug, Clone)]
pub struct ScoredMemoryRecord {
    pub record: MemoryRecord,
    pub score: f64,
}
