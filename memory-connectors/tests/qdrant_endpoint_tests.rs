//! Qdrant connector tests against a mock HTTP endpoint
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


use memory_connectors::qdrant::{point_id_for_key, QdrantConfig, QdrantMemoryStore};
use memory_connectors::{MemoryError, MemoryStore};
use synaptik_types::{Embedding, MemoryRecord};

fn store_for(server: &mockito::ServerGuard, vector_size: u64) -> QdrantMemoryStore {
    QdrantMemoryStore::new(QdrantConfig::new(server.url()), vector_size)
        .expect("store should build")
}

#[tokio::test]
async fn test_upsert_sends_derived_point_ids() {
    let mut server = mockito::Server::new_async().await;
    let expected_id = point_id_for_key("doc-1");
    let mock = server
        .mock("PUT", "/collections/docs/points?wait=true")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "points": [{
                "id": expected_id,
                "vector": [0.1, 0.2],
                "payload": {"_record_id": "doc-1", "text": "hello"}
            }]
        })))
        .with_status(200)
        .with_body(r#"{"result": {"status": "completed"}}"#)
        .create_async()
        .await;

    let store = store_for(&server, 2);
    let record = MemoryRecord::local_record("doc-1", "hello", "", Embedding::from(vec![0.1, 0.2]));
    let key = store.upsert("docs", record).await.unwrap();

    assert_eq!(key, "doc-1");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_upsert_rejects_dimension_mismatch() {
    let server = mockito::Server::new_async().await;
    let store = store_for(&server, 3);
    let record = MemoryRecord::local_record("k", "t", "", Embedding::from(vec![1.0]));

    let result = store.upsert("docs", record).await;
    assert!(matches!(result, Err(MemoryError::Validation(_))));
}

#[tokio::test]
async fn test_get_recovers_original_key() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/collections/docs/points")
        .with_status(200)
        .with_body(
            r#"{"result": [{
                "payload": {"_record_id": "doc-7", "text": "body", "description": "d"},
                "vector": [0.5, 0.6]
            }]}"#,
        )
        .create_async()
        .await;

    let store = store_for(&server, 2);
    let record = store.get("docs", "doc-7", true).await.unwrap().unwrap();

    assert_eq!(record.id, "doc-7");
    assert_eq!(record.metadata.text, "body");
    assert_eq!(record.embedding.as_slice(), &[0.5, 0.6]);
}

#[tokio::test]
async fn test_get_missing_key_returns_none() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/collections/docs/points")
        .with_status(200)
        .with_body(r#"{"result": []}"#)
        .create_async()
        .await;

    let store = store_for(&server, 2);
    let record = store.get("docs", "absent", false).await.unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn test_search_returns_scored_records() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/collections/docs/points/search")
        .with_status(200)
        .with_body(
            r#"{"result": [
                {"score": 0.91, "payload": {"_record_id": "a", "text": "first"}},
                {"score": 0.82, "payload": {"_record_id": "b", "text": "second"}}
            ]}"#,
        )
        .create_async()
        .await;

    let store = store_for(&server, 2);
    let matches = store
        .nearest_matches("docs", &Embedding::from(vec![0.1, 0.2]), 5, 0.8, false)
        .await
        .unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].record.id, "a");
    assert!(matches[0].score > matches[1].score);
}

#[tokio::test]
async fn test_unauthorized_maps_to_auth_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/collections")
        .with_status(403)
        .with_body("forbidden")
        .create_async()
        .await;

    let store = store_for(&server, 2);
    let result = store.list_collections().await;
    assert!(matches!(result, Err(MemoryError::Auth(_))));
}

#[tokio::test]
async fn test_api_key_header_sent_when_configured() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/collections/docs/exists")
        .match_header("api-key", "secret")
        .with_status(200)
        .with_body(r#"{"result": {"exists": true}}"#)
        .create_async()
        .await;

    let config = QdrantConfig::new(server.url()).with_api_key("secret");
    let store = QdrantMemoryStore::new(config, 2).expect("store should build");
    assert!(store.collection_exists("docs").await.unwrap());
    mock.assert_async().await;
}
