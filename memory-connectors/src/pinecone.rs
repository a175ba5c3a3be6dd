//! Pinecone connector
//!
//! Maps [`MemoryStore`] onto the Pinecone index REST API (upsert, query,
//! fetch, delete, describe_index_stats). Collections map onto Pinecone
//! namespaces within the configured index; oversized metadata is split
//! before upsert (see [`crate::pinecone_utils`]).
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


use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use synaptik_types::{Embedding, MemoryRecord, MemoryRecordMetadata, ScoredMemoryRecord};

use crate::error::{MemoryError, MemoryResult};
use crate::pinecone_utils::ensure_valid_metadata;
use crate::traits::MemoryStore;

/// Pinecone caps upsert batches at 100 vectors per call
const UPSERT_BATCH_SIZE: usize = 100;

/// Pinecone connector configuration
#[derive(Debug, Clone)]
pub struct PineconeConfig {
    /// Index host, e.g. `https://my-index-abc123.svc.us-east-1.pinecone.io`
    pub index_host: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

impl PineconeConfig {
    pub fn new(index_host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            index_host: index_host.into(),
            api_key: api_key.into(),
            timeout_seconds: 30,
        }
    }

    pub fn from_env() -> Option<Self> {
        let host = std::env::var("PINECONE_INDEX_HOST").ok()?;
        let api_key = std::env::var("PINECONE_API_KEY").ok()?;
        Some(Self::new(host, api_key))
    }
}

// ============================================================================
// Wire DTOs (Pinecone REST schema, camelCase)
// ============================================================================

/// A vector row as Pinecone stores it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PineconeVector {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpsertVectorsRequest {
    vectors: Vec<PineconeVector>,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertVectorsResponse {
    #[serde(default)]
    upserted_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryVectorsRequest {
    vector: Vec<f32>,
    top_k: usize,
    include_values: bool,
    include_metadata: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace: String,
}

#[derive(Debug, Deserialize)]
struct QueryVectorsResponse {
    #[serde(default)]
    matches: Vec<PineconeMatch>,
}

#[derive(Debug, Deserialize)]
struct PineconeMatch {
    id: String,
    score: f64,
    #[serde(default)]
    values: Option<Vec<f32>>,
    #[serde(default)]
    metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct FetchVectorsResponse {
    #[serde(default)]
    vectors: HashMap<String, PineconeVector>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteVectorsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    delete_all: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    namespace: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    #[serde(default)]
    pub dimension: u64,
    #[serde(default)]
    pub total_vector_count: u64,
    #[serde(default)]
    pub namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceStats {
    #[serde(default)]
    pub vector_count: u64,
}

/// Metadata layout for rows written by this connector
#[derive(Debug, Serialize, Deserialize)]
struct PineconeDocumentMetadata {
    document_id: String,
    #[serde(flatten)]
    metadata: MemoryRecordMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

// ============================================================================
// Store
// ============================================================================

/// Pinecone-backed memory store
pub struct PineconeMemoryStore {
    config: PineconeConfig,
    client: reqwest::Client,
}

impl PineconeMemoryStore {
    pub fn new(config: PineconeConfig) -> MemoryResult<Self> {
        if config.index_host.is_empty() {
            return Err(MemoryError::Validation(
                "Pinecone index host must not be empty".to_string(),
            ));
        }
        if config.api_key.is_empty() {
            return Err(MemoryError::Validation(
                "Pinecone API key must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.index_host.trim_end_matches('/'), path)
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> MemoryResult<T> {
        let response = request
            .header("Api-Key", &self.config.api_key)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MemoryError::from_status(status, error_text));
        }
        Ok(response.json().await?)
    }

    /// Index statistics, including per-namespace vector counts
    pub async fn describe_index_stats(&self) -> MemoryResult<IndexStats> {
        self.send(
            self.client
                .post(self.url("describe_index_stats"))
                .json(&serde_json::json!({})),
        )
        .await
    }

    fn record_to_vector(record: &MemoryRecord) -> MemoryResult<PineconeVector> {
        let metadata = PineconeDocumentMetadata {
            document_id: record.id.clone(),
            metadata: record.metadata.clone(),
            timestamp: record.timestamp,
        };
        Ok(PineconeVector {
            id: record.id.clone(),
            values: record.embedding.as_slice().to_vec(),
            metadata: serde_json::to_value(metadata)?,
        })
    }

    fn vector_to_record(vector: PineconeVector, with_embedding: bool) -> MemoryResult<MemoryRecord> {
        let parsed: PineconeDocumentMetadata = serde_json::from_value(vector.metadata)
            .map_err(|e| MemoryError::InvalidResponse(format!("Bad row metadata: {}", e)))?;
        Ok(MemoryRecord {
            id: parsed.document_id,
            embedding: Embedding::from(if with_embedding { vector.values } else { Vec::new() }),
            metadata: parsed.metadata,
            timestamp: parsed.timestamp,
        })
    }
}

#[async_trait]
impl MemoryStore for PineconeMemoryStore {
    /// Namespaces spring into existence on first write; creation is a no-op
    async fn create_collection(&self, _collection: &str) -> MemoryResult<()> {
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> MemoryResult<bool> {
        let stats = self.describe_index_stats().await?;
        Ok(stats.namespaces.contains_key(collection))
    }

    async fn list_collections(&self) -> MemoryResult<Vec<String>> {
        let stats = self.describe_index_stats().await?;
        Ok(stats.namespaces.into_keys().collect())
    }

    async fn delete_collection(&self, collection: &str) -> MemoryResult<()> {
        let request = DeleteVectorsRequest {
            ids: None,
            delete_all: true,
            namespace: collection.to_string(),
        };
        let _: serde_json::Value = self
            .send(self.client.post(self.url("vectors/delete")).json(&request))
            .await?;
        Ok(())
    }

    async fn upsert(&self, collection: &str, record: MemoryRecord) -> MemoryResult<String> {
        let mut keys = self.upsert_batch(collection, vec![record]).await?;
        Ok(keys.remove(0))
    }

    async fn upsert_batch(
        &self,
        collection: &str,
        records: Vec<MemoryRecord>,
    ) -> MemoryResult<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        for record in &records {
            if record.id.is_empty() {
                return Err(MemoryError::Validation(
                    "Record id must not be empty".to_string(),
                ));
            }
        }
        let keys: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

        let vectors: Vec<PineconeVector> = records
            .iter()
            .map(Self::record_to_vector)
            .collect::<MemoryResult<_>>()?;
        // Oversized metadata splits into extra rows before batching
        let vectors = ensure_valid_metadata(vectors)?;

        debug!(
            namespace = %collection,
            rows = vectors.len(),
            "Upserting Pinecone vectors"
        );

        for batch in vectors.chunks(UPSERT_BATCH_SIZE) {
            let request = UpsertVectorsRequest {
                vectors: batch.to_vec(),
                namespace: collection.to_string(),
            };
            let response: UpsertVectorsResponse = self
                .send(self.client.post(self.url("vectors/upsert")).json(&request))
                .await?;
            if response.upserted_count != batch.len() as u64 {
                return Err(MemoryError::InvalidResponse(format!(
                    "Upserted {} of {} vectors",
                    response.upserted_count,
                    batch.len()
                )));
            }
        }
        Ok(keys)
    }

    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> MemoryResult<Option<MemoryRecord>> {
        let mut records = self
            .get_batch(collection, &[key.to_string()], with_embedding)
            .await?;
        Ok(if records.is_empty() {
            None
        } else {
            Some(records.remove(0))
        })
    }

    async fn get_batch(
        &self,
        collection: &str,
        keys: &[String],
        with_embeddings: bool,
    ) -> MemoryResult<Vec<MemoryRecord>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut query: Vec<(&str, &str)> = keys.iter().map(|k| ("ids", k.as_str())).collect();
        if !collection.is_empty() {
            query.push(("namespace", collection));
        }
        let response: FetchVectorsResponse = self
            .send(self.client.get(self.url("vectors/fetch")).query(&query))
            .await?;

        // Preserve request order; missing keys are skipped
        let mut vectors = response.vectors;
        let mut records = Vec::new();
        for key in keys {
            if let Some(vector) = vectors.remove(key) {
                records.push(Self::vector_to_record(vector, with_embeddings)?);
            }
        }
        Ok(records)
    }

    async fn remove(&self, collection: &str, key: &str) -> MemoryResult<()> {
        self.remove_batch(collection, &[key.to_string()]).await
    }

    async fn remove_batch(&self, collection: &str, keys: &[String]) -> MemoryResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let request = DeleteVectorsRequest {
            ids: Some(keys.to_vec()),
            delete_all: false,
            namespace: collection.to_string(),
        };
        let _: serde_json::Value = self
            .send(self.client.post(self.url("vectors/delete")).json(&request))
            .await?;
        Ok(())
    }

    async fn nearest_matches(
        &self,
        collection: &str,
        embedding: &Embedding,
        limit: usize,
        min_relevance_score: f64,
        with_embeddings: bool,
    ) -> MemoryResult<Vec<ScoredMemoryRecord>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let request = QueryVectorsRequest {
            vector: embedding.as_slice().to_vec(),
            top_k: limit,
            include_values: with_embeddings,
            include_metadata: true,
            namespace: collection.to_string(),
        };
        let response: QueryVectorsResponse = self
            .send(self.client.post(self.url("query")).json(&request))
            .await?;

        // Pinecone has no score threshold parameter; filter client-side
        let mut results = Vec::new();
        for hit in response.matches {
            if hit.score < min_relevance_score {
                continue;
            }
            let metadata = hit.metadata.ok_or_else(|| {
                MemoryError::InvalidResponse(format!("Match '{}' carried no metadata", hit.id))
            })?;
            let vector = PineconeVector {
                id: hit.id,
                values: hit.values.unwrap_or_default(),
                metadata,
            };
            results.push(ScoredMemoryRecord {
                record: Self::vector_to_record(vector, with_embeddings)?,
                score: hit.score,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_request_camel_case() {
        let request = QueryVectorsRequest {
            vector: vec![0.1],
            top_k: 5,
            include_values: false,
            include_metadata: true,
            namespace: "docs".to_string(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["topK"], 5);
        assert_eq!(json["includeMetadata"], true);
        assert_eq!(json["namespace"], "docs");
    }

    #[test]
    fn test_default_namespace_omitted() {
        let request = DeleteVectorsRequest {
            ids: Some(vec!["a".to_string()]),
            delete_all: false,
            namespace: String::new(),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("namespace").is_none());
        assert!(json.get("deleteAll").is_none());
    }

    #[test]
    fn test_record_metadata_round_trip() {
        let record = MemoryRecord::local_record(
            "doc-1",
            "body text",
            "a doc",
            Embedding::from(vec![0.5, 0.6]),
        );
        let vector = PineconeMemoryStore::record_to_vector(&record).unwrap();
        assert_eq!(vector.id, "doc-1");
        assert_eq!(vector.metadata["document_id"], "doc-1");
        assert_eq!(vector.metadata["text"], "body text");

        let back = PineconeMemoryStore::vector_to_record(vector, true).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_vector_to_record_drops_embedding_when_not_requested() {
        let record =
            MemoryRecord::local_record("k", "t", "", Embedding::from(vec![1.0, 2.0, 3.0]));
        let vector = PineconeMemoryStore::record_to_vector(&record).unwrap();
        let back = PineconeMemoryStore::vector_to_record(vector, false).unwrap();
        assert_eq!(back.embedding.dim(), 0);
    }
}
