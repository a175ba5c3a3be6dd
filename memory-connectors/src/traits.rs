//! Trait definition for vector store connectors
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
use synaptik_types::{Embedding, MemoryRecord, ScoredMemoryRecord};

use crate::error::MemoryResult;

/// A store of memory records addressable by collection and key, searchable
/// by embedding similarity.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn create_collection(&self, collection: &str) -> MemoryResult<()>;

    async fn collection_exists(&self, collection: &str) -> MemoryResult<bool>;

    async fn list_collections(&self) -> MemoryResult<Vec<String>>;

    async fn delete_collection(&self, collection: &str) -> MemoryResult<()>;

    /// Insert or replace a record, returning its key
    async fn upsert(&self, collection: &str, record: MemoryRecord) -> MemoryResult<String>;

    async fn upsert_batch(
        &self,
        collection: &str,
        records: Vec<MemoryRecord>,
    ) -> MemoryResult<Vec<String>>;

    /// Fetch a record by key; `with_embedding` controls whether the vector
    /// is returned or left empty
    async fn get(
        &self,
        collection: &str,
        key: &str,
        with_embedding: bool,
    ) -> MemoryResult<Option<MemoryRecord>>;

    /// Fetch several records; missing keys are silently skipped
    async fn get_batch(
        &self,
        collection: &str,
        keys: &[String],
        with_embeddings: bool,
    ) -> MemoryResult<Vec<MemoryRecord>>;

    async fn remove(&self, collection: &str, key: &str) -> MemoryResult<()>;

    async fn remove_batch(&self, collection: &str, keys: &[String]) -> MemoryResult<()>;

    /// Similarity search returning up to `limit` records scoring at least
    /// `min_relevance_score`, best first
    async fn nearest_matches(
        &self,
        collection: &str,
        embedding: &Embedding,
        limit: usize,
        min_relevance_score: f64,
        with_embeddings: bool,
    ) -> MemoryResult<Vec<ScoredMemoryRecord>>;

    async fn nearest_match(
        &self,
        collection: &str,
        embedding: &Embedding,
        min_relevance_score: f64,
        with_embedding: bool,
    ) -> MemoryResult<Option<ScoredMemoryRecord>> {
        let mut matches = self
            .nearest_matches(collection, embedding, 1, min_relevance_score, with_embedding)
            .await?;
        Ok(if matches.is_empty() {
            None
        } else {
            Some(matches.remove(0))
        })
    }
}
