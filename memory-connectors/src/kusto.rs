//! Azure Data Explorer (Kusto) connector
//!
//! Maps [`MemoryStore`] onto Kusto: collections are tables, records are
//! rows with the embedding stored as a dynamic array, and similarity
//! search runs server-side through `series_cosine_similarity`. Management
//! commands go to `/v1/rest/mgmt`, queries to `/v1/rest/query`.
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
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use synaptik_types::{Embedding, MemoryRecord, MemoryRecordMetadata, ScoredMemoryRecord};

use crate::error::{MemoryError, MemoryResult};
use crate::traits::MemoryStore;

/// Kusto connector configuration
#[derive(Debug, Clone)]
pub struct KustoConfig {
    /// Cluster URL, e.g. `https://mycluster.westus.kusto.windows.net`
    pub cluster_url: String,
    pub database: String,
    /// AAD bearer token with access to the database
    pub bearer_token: String,
    pub timeout_seconds: u64,
}

impl KustoConfig {
    pub fn new(
        cluster_url: impl Into<String>,
        database: impl Into<String>,
        bearer_token: impl Into<String>,
    ) -> Self {
        Self {
            cluster_url: cluster_url.into(),
            database: database.into(),
            bearer_token: bearer_token.into(),
            timeout_seconds: 60,
        }
    }

    pub fn from_env() -> Option<Self> {
        let cluster_url = std::env::var("KUSTO_CLUSTER_URL").ok()?;
        let database = std::env::var("KUSTO_DATABASE").ok()?;
        let bearer_token = std::env::var("KUSTO_BEARER_TOKEN").ok()?;
        Some(Self::new(cluster_url, database, bearer_token))
    }
}

// ============================================================================
// CSL generation
// ============================================================================

/// Table names pass through into CSL, so only a safe alphabet is allowed
pub fn validate_table_name(name: &str) -> MemoryResult<()> {
    if name.is_empty() {
        return Err(MemoryError::InvalidCollectionName(
            "Table name must not be empty".to_string(),
        ));
    }
    let ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if !ok {
        return Err(MemoryError::InvalidCollectionName(format!(
            "Table name '{}' contains characters outside [A-Za-z0-9_.-]",
            name
        )));
    }
    Ok(())
}

/// Quote a string for use as a CSL literal
fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('"');
    for c in value.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c => escaped.push(c),
        }
    }
    escaped.push('"');
    escaped
}

/// Quote a field for the CSV body of `.ingest inline`
fn escape_csv(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn format_timestamp(timestamp: &Option<DateTime<Utc>>) -> String {
    timestamp
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true))
        .unwrap_or_default()
}

fn create_table_command(table: &str) -> String {
    format!(
        ".create table ['{}'] (Key: string, Metadata: dynamic, Embedding: dynamic, Timestamp: datetime)",
        table
    )
}

fn show_tables_command() -> String {
    ".show tables | project TableName".to_string()
}

fn drop_table_command(table: &str) -> String {
    format!(".drop table ['{}'] ifexists", table)
}

fn ingest_inline_command(table: &str, records: &[MemoryRecord]) -> MemoryResult<String> {
    let mut command = format!(".ingest inline into table ['{}'] <|", table);
    for record in records {
        let metadata = serde_json::to_string(&record.metadata)?;
        let embedding = serde_json::to_string(record.embedding.as_slice())?;
        command.push('\n');
        command.push_str(&format!(
            "{},{},{},{}",
            escape_csv(&record.id),
            escape_csv(&metadata),
            escape_csv(&embedding),
            escape_csv(&format_timestamp(&record.timestamp)),
        ));
    }
    Ok(command)
}

fn delete_keys_command(table: &str, keys: &[String]) -> String {
    let list = keys
        .iter()
        .map(|k| escape_literal(k))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        ".delete table ['{}'] records <| ['{}'] | where Key in ({})",
        table, table, list
    )
}

/// Rows can appear multiple times after repeated ingestion; the latest
/// Timestamp wins
fn latest_rows(table: &str) -> String {
    format!(
        "['{}'] | summarize arg_max(Timestamp, Metadata, Embedding) by Key",
        table
    )
}

fn get_query(table: &str, keys: &[String]) -> String {
    let list = keys
        .iter()
        .map(|k| escape_literal(k))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} | where Key in ({}) | project Key, Metadata, Embedding, Timestamp",
        latest_rows(table),
        list
    )
}

fn nearest_query(table: &str, embedding: &[f32], limit: usize, min_score: f64) -> MemoryResult<String> {
    let vector = serde_json::to_string(embedding)?;
    Ok(format!(
        "{} | extend Score = series_cosine_similarity(dynamic({}), Embedding) \
         | where Score >= {} | top {} by Score desc \
         | project Key, Metadata, Embedding, Timestamp, Score",
        latest_rows(table),
        vector,
        min_score,
        limit
    ))
}

// ============================================================================
// Wire DTOs (Kusto v1 REST schema)
// ============================================================================

#[derive(Debug, Serialize)]
struct KustoRequest<'a> {
    db: &'a str,
    csl: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KustoResponse {
    #[serde(default)]
    tables: Vec<KustoTable>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct KustoTable {
    #[serde(default)]
    rows: Vec<Vec<serde_json::Value>>,
}

// ============================================================================
// Store
// ============================================================================

/// Kusto-backed memory store
pub struct KustoMemoryStore {
    config: KustoConfig,
    client: reqwest::Client,
}

impl KustoMemoryStore {
    pub fn new(config: KustoConfig) -> MemoryResult<Self> {
        if config.cluster_url.is_empty() {
            return Err(MemoryError::Validation(
                "Kusto cluster URL must not be empty".to_string(),
            ));
        }
        if config.database.is_empty() {
            return Err(MemoryError::Validation(
                "Kusto database must not be empty".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { config, client })
    }

    async fn execute(&self, path: &str, csl: &str) -> MemoryResult<KustoResponse> {
        let url = format!("{}/{}", self.config.cluster_url.trim_end_matches('/'), path);
        debug!(database = %self.config.database, %path, "Executing Kusto statement");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.bearer_token)
            .json(&KustoRequest {
                db: &self.config.database,
                csl,
            })
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(MemoryError::from_status(status, error_text));
        }
        Ok(response.json().await?)
    }

    /// Dot-commands go through the management endpoint
    async fn mgmt(&self, csl: &str) -> MemoryResult<KustoResponse> {
        self.execute("v1/rest/mgmt", csl).await
    }

    async fn query(&self, csl: &str) -> MemoryResult<KustoResponse> {
        self.execute("v1/rest/query", csl).await
    }

    fn first_table(response: KustoResponse) -> MemoryResult<KustoTable> {
        response
            .tables
            .into_iter()
            .next()
            .ok_or_else(|| MemoryError::InvalidResponse("Response carried no tables".to_string()))
    }

    /// Columns are positional: Key, Metadata, Embedding, Timestamp[, Score]
    fn row_to_record(row: &[serde_json::Value], with_embedding: bool) -> MemoryResult<MemoryRecord> {
        let bad = |what: &str| MemoryError::InvalidResponse(format!("Row is missing {}", what));

        let id = row
            .first()
            .and_then(|v| v.as_str())
            .ok_or_else(|| bad("a Key column"))?
            .to_string();
        let metadata: MemoryRecordMetadata = row
            .get(1)
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .ok_or_else(|| bad("a Metadata column"))?;
        let embedding = if with_embedding {
            let values: Vec<f32> = row
                .get(2)
                .cloned()
                .map(serde_json::from_value)
                .transpose()?
                .ok_or_else(|| bad("an Embedding column"))?;
            Embedding::from(values)
        } else {
            Embedding::from(Vec::new())
        };
        let timestamp = match row.get(3) {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(
                DateTime::parse_from_rfc3339(s)
                    .map_err(|e| MemoryError::InvalidResponse(format!("Bad timestamp: {}", e)))?
                    .with_timezone(&Utc),
            ),
            _ => None,
        };
        Ok(MemoryRecord {
            id,
            embedding,
            metadata,
            timestamp,
        })
    }
}

#[async_trait]
impl MemoryStore for KustoMemoryStore {
    async fn create_collection(&self, collection: &str) -> MemoryResult<()> {
        validate_table_name(collection)?;
        self.mgmt(&create_table_command(collection)).await?;
        Ok(())
    }

    async fn collection_exists(&self, collection: &str) -> MemoryResult<bool> {
        validate_table_name(collection)?;
        Ok(self
            .list_collections()
            .await?
            .iter()
            .any(|name| name == collection))
    }

    async fn list_collections(&self) -> MemoryResult<Vec<String>> {
        let table = Self::first_table(self.mgmt(&show_tables_command()).await?)?;
        Ok(table
            .rows
            .iter()
            .filter_map(|row| row.first().and_then(|v| v.as_str()).map(String::from))
            .collect())
    }

    async fn delete_collection(&self, collection: &str) -> MemoryResult<()> {
        validate_table_name(collection)?;
        self.mgmt(&drop_table_command(collection)).await?;
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
        validate_table_name(collection)?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        for record in &records {
            if record.id.is_empty() {
                return Err(MemoryError::Validation(
                    "Record id must not be empty".to_string(),
                ));
            }
            // Inline ingestion treats newlines as record separators even
            // inside quoted fields, so such ids cannot be stored safely
            if record.id.chars().any(|c| c == '\n' || c == '\r') {
                return Err(MemoryError::Validation(format!(
                    "Record id {:?} contains newline characters",
                    record.id
                )));
            }
        }
        let keys: Vec<String> = records.iter().map(|r| r.id.clone()).collect();

        // Replace-by-key: drop any prior rows, then ingest the new ones.
        // Timestamps also disambiguate rows already queued for ingestion.
        self.mgmt(&delete_keys_command(collection, &keys)).await?;
        let stamped: Vec<MemoryRecord> = records
            .into_iter()
            .map(|r| {
                let timestamp = r.timestamp.unwrap_or_else(Utc::now);
                r.with_timestamp(timestamp)
            })
            .collect();
        self.mgmt(&ingest_inline_command(collection, &stamped)?)
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
        validate_table_name(collection)?;
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let table = Self::first_table(self.query(&get_query(collection, keys)).await?)?;
        table
            .rows
            .iter()
            .map(|row| Self::row_to_record(row, with_embeddings))
            .collect()
    }

    async fn remove(&self, collection: &str, key: &str) -> MemoryResult<()> {
        self.remove_batch(collection, &[key.to_string()]).await
    }

    async fn remove_batch(&self, collection: &str, keys: &[String]) -> MemoryResult<()> {
        validate_table_name(collection)?;
        if keys.is_empty() {
            return Ok(());
        }
        self.mgmt(&delete_keys_command(collection, keys)).await?;
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
        validate_table_name(collection)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let csl = nearest_query(collection, embedding.as_slice(), limit, min_relevance_score)?;
        let table = Self::first_table(self.query(&csl).await?)?;
        table
            .rows
            .iter()
            .map(|row| {
                let score = row
                    .get(4)
                    .and_then(|v| v.as_f64())
                    .ok_or_else(|| {
                        MemoryError::InvalidResponse("Row is missing a Score column".to_string())
                    })?;
                Ok(ScoredMemoryRecord {
                    record: Self::row_to_record(row, with_embeddings)?,
                    score,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_table_name_validation() {
        assert!(validate_table_name("Memories_v2.prod-eu").is_ok());
        assert!(validate_table_name("").is_err());
        assert!(validate_table_name("drop table; --").is_err());
        assert!(validate_table_name("name with spaces").is_err());
    }

    #[test]
    fn test_create_table_schema() {
        let command = create_table_command("mem");
        assert_eq!(
            command,
            ".create table ['mem'] (Key: string, Metadata: dynamic, Embedding: dynamic, Timestamp: datetime)"
        );
    }

    #[test]
    fn test_escape_literal_quotes_specials() {
        assert_eq!(escape_literal("plain"), "\"plain\"");
        assert_eq!(escape_literal("a\"b\\c\nd"), "\"a\\\"b\\\\c\\nd\"");
    }

    #[test]
    fn test_ingest_command_escapes_csv() {
        let record = MemoryRecord::local_record(
            "k\"1",
            "some text",
            "",
            Embedding::from(vec![0.25, 0.5]),
        );
        let command = ingest_inline_command("mem", &[record]).unwrap();
        let mut lines = command.lines();
        assert_eq!(lines.next().unwrap(), ".ingest inline into table ['mem'] <|");
        let row = lines.next().unwrap();
        // Embedded quotes double per CSV rules
        assert!(row.starts_with("\"k\"\"1\","));
        assert!(row.contains("[0.25,0.5]"));
    }

    #[test]
    fn test_get_query_filters_by_key() {
        let csl = get_query("mem", &["a".to_string(), "b".to_string()]);
        assert!(csl.contains("arg_max(Timestamp, Metadata, Embedding) by Key"));
        assert!(csl.contains("where Key in (\"a\", \"b\")"));
        assert!(csl.contains("project Key, Metadata, Embedding, Timestamp"));
    }

    #[test]
    fn test_nearest_query_shape() {
        let csl = nearest_query("mem", &[0.1, 0.2], 3, 0.75).unwrap();
        assert!(csl.contains("series_cosine_similarity(dynamic([0.1,0.2]), Embedding)"));
        assert!(csl.contains("where Score >= 0.75"));
        assert!(csl.contains("top 3 by Score desc"));
    }

    #[test]
    fn test_row_to_record_positional() {
        let row = vec![
            json!("key-1"),
            json!({"text": "t", "description": "d"}),
            json!([0.1, 0.2]),
            json!("2026-01-02T03:04:05.000006Z"),
        ];
        let record = KustoMemoryStore::row_to_record(&row, true).unwrap();
        assert_eq!(record.id, "key-1");
        assert_eq!(record.metadata.text, "t");
        assert_eq!(record.embedding.as_slice(), &[0.1, 0.2]);
        assert!(record.timestamp.is_some());

        let without = KustoMemoryStore::row_to_record(&row, false).unwrap();
        assert_eq!(without.embedding.dim(), 0);
    }

    #[test]
    fn test_row_without_key_rejected() {
        let row = vec![json!(42)];
        assert!(matches!(
            KustoMemoryStore::row_to_record(&row, false),
            Err(MemoryError::InvalidResponse(_))
        ));
    }
}
