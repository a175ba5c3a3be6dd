//! Qdrant connector
//!
//! Maps [`MemoryStore`] onto the Qdrant REST API (collections and points
//! endpoints). Record keys are arbitrary strings, but Qdrant only accepts
//! UUID or integer point ids, so each key is hashed into a deterministic
//! UUID and the original key travels in the payload.
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
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use synaptik_types::{
    Embedding, MemoryRecord, MemoryRecordMetadata, ScoredMemoryRecord,
};

use crate::error::{MemoryError, MemoryResult};
use crate::traits::MemoryStore;

/// Qdrant connector configuration
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
}

impl QdrantConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
            timeout_seconds: 30,
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("QDRANT_URL").ok().map(|url| {
            let mut config = Self::new(url);
            config.api_key = std::env::var("QDRANT_API_KEY").ok();
            config
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

// ============================================================================
// Wire DTOs (Qdrant REST schema)
// ============================================================================

/// Standard Qdrant response envelope
#[derive(Debug, Deserialize)]
struct QdrantEnvelope<T> {
    result: T,
}

#[derive(Debug, Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Debug, Serialize)]
struct VectorParams {
    size: u64,
    distance: &'static str,
}

#[derive(Debug, Deserialize)]
struct CollectionExistsResult {
    exists: bool,
}

#[derive(Debug, Deserialize)]
struct CollectionsListResult {
    collections: Vec<CollectionDescription>,
}

#[derive(Debug, Deserialize)]
struct CollectionDescription {
    name: String,
}

#[derive(Debug, Serialize)]
struct UpsertPointsRequest {
    points: Vec<PointStruct>,
}

#[derive(Debug, Serialize)]
struct PointStruct {
    id: String,
    vector: Vec<f32>,
    payload: QdrantPayload,
}

#[derive(Debug, Serialize)]
struct RetrievePointsRequest {
    ids: Vec<String>,
    with_payload: bool,
    with_vector: bool,
}

#[derive(Debug, Deserialize)]
struct RetrievedPoint {
    payload: Option<QdrantPayload>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct DeletePointsRequest {
    points: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SearchPointsRequest {
    vector: Vec<f32>,
    limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    score_threshold: Option<f64>,
    with_payload: bool,
    with_vector: bool,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f64,
    payload: Option<QdrantPayload>,
    #[serde(default)]
    vector: Option<Vec<f32>>,
}

/// Payload stored with each point; carries the original record key
#[derive(Debug, Serialize, Deserialize)]
struct QdrantPayload {
    #[serde(rename = "_record_id")]
    record_id: String,
    #[serde(flatten)]
    metadata: MemoryRecordMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

// ============================================================================
// Store
// ============================================================================

/// Derive the deterministic Qdrant point id for a record key
pub fn point_id_for_key(key: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string()
}

/// Qdrant-backed memory store
pub struct QdrantMemoryStore {
    config: QdrantConfig,
    client: reqwest::Client,
    vector_size: u64,
}

impl QdrantMemoryStore {
    pub fn new(config: QdrantConfig, vector_size: u64) -> MemoryResult<Self> {
        if config.base_url.is_empty() {
            return Err(MemoryError::Validation(
                "Qdrant base URL must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            config,
            client,
            vector_size,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("api-key", key),
            None => request,
        }
    }

    async fn send<T: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> MemoryResult<T> {
        let response = self.apply_auth(request).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MemoryError::from_status(status, error_text));
        }
        let envelope: QdrantEnvelope<T> = response.json().await?;
        Ok(envelope.result)
    }

    fn record_to_point(record: &MemoryRecord) -> PointStruct {
        PointStruct {
            id: point_id_for_key(&record.id),
            vector: record.embedding.as_slice().to_vec(),
            payload: QdrantPayload {
                record_id: record.id.clone(),
                metadata: record.metadata.clone(),
                timestamp: record.timestamp,
            },
        }
    }

    fn payload_to_record(
        payload: QdrantPayload,
        vector: Option<Vec<f32>>,
    ) -> MemoryRecord {
        MemoryRecord {
            id: payload.record_id,
            embedding: Embedding::from(vector.unwrap_or_default()),
            metadata: payload.metadata,
            timestamp: payload.timestamp,
        }
    }
}

#[async_trait]
impl MemoryStore for QdrantMemoryStore {
    async fn create_collection(&self, collection: &str) -> MemoryResult<()> {
        debug!(collection = %collection, size = self.vector_size, "Creating Qdrant collection");
        let request = CreateCollectionRequest {
            vectors: VectorParams {
                size: self.vector_size,
                distance: "Cosine",
            },
        };
        let _: bool = self
            .send(
                self.client
                    .put(self.url(&format!("collections/{}", collection)))
                    .json(&request),
            )
            .await?;
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> MemoryResult<bool> {
        let result: CollectionExistsResult = self
            .send(
                self.client
                    .get(self.url(&format!("collections/{}/exists", collection))),
            )
            .await?;
        Ok(result.exists)
    }

    async fn list_collections(&self) -> MemoryResult<Vec<String>> {
        let result: CollectionsListResult =
            self.send(self.client.get(self.url("collections"))).await?;
        Ok(result.collections.into_iter().map(|c| c.name).collect())
    }

    async fn delete_collection(&self, collection: &str) -> MemoryResult<()> {
        let _: bool = self
            .send(
                self.client
                    .delete(self.url(&format!("collections/{}", collection))),
            )
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
            if record.embedding.dim() as u64 != self.vector_size {
                return Err(MemoryError::Validation(format!(
                    "Embedding dimension {} does not match collection size {}",
                    record.embedding.dim(),
                    self.vector_size
                )));
            }
        }

        let keys: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let request = UpsertPointsRequest {
            points: records.iter().map(Self::record_to_point).collect(),
        };

        debug!(collection = %collection, points = request.points.len(), "Upserting Qdrant points");

        let _: serde_json::Value = self
            .send(
                self.client
                    .put(self.url(&format!("collections/{}/points?wait=true", collection)))
                    .json(&request),
            )
            .await?;
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
        let request = RetrievePointsRequest {
            ids: keys.iter().map(|k| point_id_for_key(k)).collect(),
            with_payload: true,
            with_vector: with_embeddings,
        };
        let points: Vec<RetrievedPoint> = self
            .send(
                self.client
                    .post(self.url(&format!("collections/{}/points", collection)))
                    .json(&request),
            )
            .await?;
        Ok(points
            .into_iter()
            .filter_map(|p| p.payload.map(|payload| Self::payload_to_record(payload, p.vector)))
            .collect())
    }

    async fn remove(&self, collection: &str, key: &str) -> MemoryResult<()> {
        self.remove_batch(collection, &[key.to_string()]).await
    }

    async fn remove_batch(&self, collection: &str, keys: &[String]) -> MemoryResult<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let request = DeletePointsRequest {
            points: keys.iter().map(|k| point_id_for_key(k)).collect(),
        };
        let _: serde_json::Value = self
            .send(
                self.client
                    .post(self.url(&format!(
                        "collections/{}/points/delete?wait=true",
                        collection
                    )))
                    .json(&request),
            )
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
        let request = SearchPointsRequest {
            vector: embedding.as_slice().to_vec(),
            limit,
            score_threshold: (min_relevance_score > 0.0).then_some(min_relevance_score),
            with_payload: true,
            with_vector: with_embeddings,
        };
        let hits: Vec<ScoredPoint> = self
            .send(
                self.client
                    .post(self.url(&format!("collections/{}/points/search", collection)))
                    .json(&request),
            )
            .await?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                hit.payload.map(|payload| ScoredMemoryRecord {
                    record: Self::payload_to_record(payload, hit.vector),
                    score: hit.score,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_id_is_deterministic() {
        assert_eq!(point_id_for_key("some-key"), point_id_for_key("some-key"));
        assert_ne!(point_id_for_key("some-key"), point_id_for_key("other-key"));
        // Valid UUID shape
        assert!(Uuid::parse_str(&point_id_for_key("some-key")).is_ok());
    }

    #[test]
    fn test_payload_round_trip_keeps_record_id() {
        let record = MemoryRecord::local_record(
            "doc/1",
            "content",
            "desc",
            Embedding::from(vec![0.1, 0.2]),
        );
        let point = QdrantMemoryStore::record_to_point(&record);
        assert_eq!(point.id, point_id_for_key("doc/1"));

        let json = serde_json::to_value(&point.payload).unwrap();
        assert_eq!(json["_record_id"], "doc/1");
        assert_eq!(json["text"], "content");

        let payload: QdrantPayload = serde_json::from_value(json).unwrap();
        let back = QdrantMemoryStore::payload_to_record(payload, Some(vec![0.1, 0.2]));
        assert_eq!(back, record);
    }

    #[test]
    fn test_search_request_omits_zero_threshold() {
        let request = SearchPointsRequest {
            vector: vec![0.1],
            limit: 3,
            score_threshold: None,
            with_payload: true,
            with_vector: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("score_threshold").is_none());
        assert_eq!(json["limit"], 3);
    }
}
