//! Pinecone metadata size handling
//!
//! Pinecone rejects vectors whose metadata exceeds 40960 bytes. Records
//! with oversized metadata are split by chunking the `text` field into
//! pieces that fit; the first chunk keeps the original id, later chunks
//! get `{id}-{n}` so the whole text survives across rows.
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


use crate::error::{MemoryError, MemoryResult};
use crate::pinecone::PineconeVector;

/// Pinecone's documented per-vector metadata limit, in serialized bytes
pub const MAX_METADATA_SIZE: usize = 40 * 1024;

const TEXT_FIELD: &str = "text";

/// Largest size a single character can occupy once JSON-escaped
const MAX_ESCAPED_CHAR: usize = 6;

/// Split any vector whose serialized metadata exceeds the Pinecone limit.
///
/// Vectors under the limit pass through untouched. A vector whose
/// non-text metadata alone exceeds the limit cannot be split and is
/// rejected.
pub fn ensure_valid_metadata(vectors: Vec<PineconeVector>) -> MemoryResult<Vec<PineconeVector>> {
    let mut out = Vec::with_capacity(vectors.len());
    for vector in vectors {
        if serialized_size(&vector.metadata)? <= MAX_METADATA_SIZE {
            out.push(vector);
            continue;
        }
        split_vector(vector, &mut out)?;
    }
    Ok(out)
}

fn serialized_size(metadata: &serde_json::Value) -> MemoryResult<usize> {
    Ok(serde_json::to_string(metadata)?.len())
}

fn split_vector(vector: PineconeVector, out: &mut Vec<PineconeVector>) -> MemoryResult<()> {
    let object = match &vector.metadata {
        serde_json::Value::Object(map) => map.clone(),
        _ => {
            return Err(MemoryError::InvalidMetadata(format!(
                "Metadata for '{}' is over the size limit and is not an object",
                vector.id
            )))
        }
    };

    let text = match object.get(TEXT_FIELD) {
        Some(serde_json::Value::String(text)) => text.clone(),
        _ => {
            return Err(MemoryError::InvalidMetadata(format!(
                "Metadata for '{}' is over the size limit and has no text field to split",
                vector.id
            )))
        }
    };

    // Budget left for the text value once everything else is accounted for
    let mut rest = object.clone();
    rest.insert(TEXT_FIELD.to_string(), serde_json::Value::String(String::new()));
    // The budget must fit at least one escaped character, or a chunk
    // could overshoot the limit
    let overhead = serialized_size(&serde_json::Value::Object(rest.clone()))?;
    if overhead + MAX_ESCAPED_CHAR > MAX_METADATA_SIZE {
        return Err(MemoryError::InvalidMetadata(format!(
            "Non-text metadata for '{}' leaves no room under the {} byte limit",
            vector.id, MAX_METADATA_SIZE
        )));
    }
    let budget = MAX_METADATA_SIZE - overhead;

    let chunks = split_text(&text, budget);
    for (index, chunk) in chunks.into_iter().enumerate() {
        let id = if index == 0 {
            vector.id.clone()
        } else {
            format!("{}-{}", vector.id, index)
        };
        let mut metadata = rest.clone();
        metadata.insert(TEXT_FIELD.to_string(), serde_json::Value::String(chunk));
        out.push(PineconeVector {
            id,
            values: vector.values.clone(),
            metadata: serde_json::Value::Object(metadata),
        });
    }
    Ok(())
}

/// Bytes the character occupies inside a JSON string literal
fn escaped_len(c: char) -> usize {
    match c {
        '"' | '\\' => 2,
        c if (c as u32) < 0x20 => 6,
        c => c.len_utf8(),
    }
}

/// Single pass over the text, cutting at character boundaries so each
/// chunk's JSON-escaped form fits the byte budget
fn split_text(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    for c in text.chars() {
        let len = escaped_len(c);
        if current_len + len > budget && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current.push(c);
        current_len += len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vector_with_text(id: &str, text: String) -> PineconeVector {
        PineconeVector {
            id: id.to_string(),
            values: vec![0.1, 0.2],
            metadata: json!({
                "document_id": id,
                "text": text,
                "description": "d",
            }),
        }
    }

    #[test]
    fn test_small_metadata_passes_through() {
        let input = vec![vector_with_text("a", "short".to_string())];
        let output = ensure_valid_metadata(input.clone()).unwrap();
        assert_eq!(output.len(), 1);
        assert_eq!(output[0].id, "a");
        assert_eq!(output[0].metadata, input[0].metadata);
    }

    #[test]
    fn test_oversized_text_is_split() {
        let text = "x".repeat(MAX_METADATA_SIZE * 2 + 100);
        let output = ensure_valid_metadata(vec![vector_with_text("doc", text.clone())]).unwrap();
        assert!(output.len() >= 3);

        // First chunk keeps the id, the rest are derived
        assert_eq!(output[0].id, "doc");
        assert_eq!(output[1].id, "doc-1");

        // No chunk exceeds the limit
        for vector in &output {
            assert!(serde_json::to_string(&vector.metadata).unwrap().len() <= MAX_METADATA_SIZE);
        }

        // All text survives, in order
        let rebuilt: String = output
            .iter()
            .map(|v| v.metadata["text"].as_str().unwrap())
            .collect();
        assert_eq!(rebuilt, text);

        // Non-text fields are duplicated onto every chunk
        for vector in &output {
            assert_eq!(vector.metadata["description"], "d");
            assert_eq!(vector.values, vec![0.1, 0.2]);
        }
    }

    #[test]
    fn test_escaping_respected_by_budget() {
        // Quotes double in size when escaped; the split must account for that
        let text = "\"".repeat(MAX_METADATA_SIZE);
        let output = ensure_valid_metadata(vec![vector_with_text("q", text)]).unwrap();
        for vector in &output {
            assert!(serde_json::to_string(&vector.metadata).unwrap().len() <= MAX_METADATA_SIZE);
        }
    }

    #[test]
    fn test_unsplittable_metadata_rejected() {
        let vector = PineconeVector {
            id: "big".to_string(),
            values: vec![0.0],
            metadata: json!({
                "text": "tiny",
                "blob": "y".repeat(MAX_METADATA_SIZE + 1),
            }),
        };
        let result = ensure_valid_metadata(vec![vector]);
        assert!(matches!(result, Err(MemoryError::InvalidMetadata(_))));
    }

    #[test]
    fn test_budget_smaller_than_one_char_rejected() {
        // Non-text fields that leave fewer bytes than one escaped
        // character needs; a quote escapes to two bytes and must not be
        // squeezed into a chunk that would overshoot the limit
        let base = json!({"text": "", "blob": ""});
        let overhead = serde_json::to_string(&base).unwrap().len();
        let vector = PineconeVector {
            id: "edge".to_string(),
            values: vec![0.0],
            metadata: json!({
                "text": "\"\"\"\"",
                "blob": "y".repeat(MAX_METADATA_SIZE - overhead - 2),
            }),
        };
        let result = ensure_valid_metadata(vec![vector]);
        assert!(matches!(result, Err(MemoryError::InvalidMetadata(_))));
    }

    #[test]
    fn test_multibyte_boundaries_preserved() {
        let text = "é".repeat(MAX_METADATA_SIZE);
        let output = ensure_valid_metadata(vec![vector_with_text("uni", text.clone())]).unwrap();
        let rebuilt: String = output
            .iter()
            .map(|v| v.metadata["text"].as_str().unwrap())
            .collect();
        assert_eq!(rebuilt, text);
    }
}
