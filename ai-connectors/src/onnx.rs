//! Local ONNX Runtime embedding generator
//!
//! Runs a sentence-embedding model (BGE, MiniLM, and similar BERT-style
//! exports) locally through `ort`, with tokenization via `tokenizers`.
//! The last hidden state is mean-pooled over the attention mask and
//! L2-normalized.
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


use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::{inputs, session::builder::GraphOptimizationLevel, session::Session, value::Tensor};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use synaptik_types::Embedding;

use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::EmbeddingGeneration;

/// Configuration for the local ONNX embedding generator
#[derive(Debug, Clone)]
pub struct OnnxEmbeddingConfig {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
    /// Token sequences are truncated to this length
    pub max_length: usize,
    pub intra_threads: usize,
    pub normalize: bool,
}

impl OnnxEmbeddingConfig {
    pub fn new(model_path: impl Into<PathBuf>, tokenizer_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            tokenizer_path: tokenizer_path.into(),
            max_length: 512,
            intra_threads: 4,
            normalize: true,
        }
    }
}

/// Local embedding generator backed by ONNX Runtime
pub struct OnnxEmbeddingGenerator {
    // ort sessions take &mut for inference
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    config: OnnxEmbeddingConfig,
}

impl OnnxEmbeddingGenerator {
    pub fn new(config: OnnxEmbeddingConfig) -> ConnectorResult<Self> {
        if !config.model_path.exists() {
            return Err(ConnectorError::Configuration(format!(
                "Model file not found: {}",
                config.model_path.display()
            )));
        }
        if !config.tokenizer_path.exists() {
            return Err(ConnectorError::Configuration(format!(
                "Tokenizer file not found: {}",
                config.tokenizer_path.display()
            )));
        }

        ort::init()
            .with_name("synaptik_embeddings")
            .commit()
            .map_err(|e| ConnectorError::Onnx(e.to_string()))?;

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.with_intra_threads(config.intra_threads))
            .and_then(|b| b.commit_from_file(&config.model_path))
            .map_err(|e| ConnectorError::Onnx(e.to_string()))?;

        info!(
            model = %config.model_path.display(),
            inputs = session.inputs.len(),
            "ONNX session created"
        );

        let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| ConnectorError::Onnx(e.to_string()))?;

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            config,
        })
    }

    fn embed_one(
        session: &mut Session,
        tokenizer: &Tokenizer,
        max_length: usize,
        normalize: bool,
        text: &str,
    ) -> ConnectorResult<Vec<f32>> {
        let encoding = tokenizer
            .encode(text, true)
            .map_err(|e| ConnectorError::Onnx(e.to_string()))?;

        let mut input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mut attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let mut token_type_ids: Vec<i64> =
            encoding.get_type_ids().iter().map(|&t| t as i64).collect();

        input_ids.truncate(max_length);
        attention_mask.truncate(max_length);
        token_type_ids.truncate(max_length);
        let seq_len = input_ids.len();

        debug!(tokens = seq_len, "Running ONNX embedding inference");

        let input_ids_tensor = Tensor::from_array(([1, seq_len], input_ids))
            .map_err(|e| ConnectorError::Onnx(e.to_string()))?;
        let attention_mask_tensor = Tensor::from_array(([1, seq_len], attention_mask.clone()))
            .map_err(|e| ConnectorError::Onnx(e.to_string()))?;
        let token_type_ids_tensor = Tensor::from_array(([1, seq_len], token_type_ids))
            .map_err(|e| ConnectorError::Onnx(e.to_string()))?;

        // BERT-style exports take 3 inputs, trimmed exports take 2
        let outputs = if session.inputs.len() == 2 {
            session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])
        } else {
            session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])
        }
        .map_err(|e| ConnectorError::Onnx(e.to_string()))?;

        // Find the hidden-state output [1, seq_len, hidden] and pool it
        for (_name, output) in outputs.iter() {
            if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
                if shape.len() == 3 && shape[0] == 1 && shape[1] == seq_len as i64 {
                    let hidden = shape[2] as usize;
                    let pooled = mean_pool(data, &attention_mask, seq_len, hidden);
                    return Ok(if normalize { l2_normalize(pooled) } else { pooled });
                }
            }
        }

        Err(ConnectorError::Onnx(
            "No hidden-state output found in model outputs".to_string(),
        ))
    }
}

/// Mean pooling over non-padding positions
fn mean_pool(data: &[f32], attention_mask: &[i64], seq_len: usize, hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut count = 0usize;
    for pos in 0..seq_len {
        if attention_mask.get(pos).copied().unwrap_or(0) == 0 {
            continue;
        }
        count += 1;
        let offset = pos * hidden;
        for (i, value) in data[offset..offset + hidden].iter().enumerate() {
            pooled[i] += value;
        }
    }
    if count > 0 {
        for value in pooled.iter_mut() {
            *value /= count as f32;
        }
    }
    pooled
}

fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for value in v.iter_mut() {
            *value /= norm;
        }
    }
    v
}

#[async_trait]
impl EmbeddingGeneration for OnnxEmbeddingGenerator {
    fn name(&self) -> &str {
        "onnx"
    }

    fn is_available(&self) -> bool {
        self.config.model_path.exists()
    }

    async fn generate_embeddings(&self, texts: &[String]) -> ConnectorResult<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let max_length = self.config.max_length;
        let normalize = self.config.normalize;
        let texts: Vec<String> = texts.to_vec();

        // Inference is CPU-bound; keep it off the async workers
        let embeddings = tokio::task::spawn_blocking(move || {
            let mut session = session
                .lock()
                .map_err(|e| ConnectorError::Onnx(format!("Session lock poisoned: {}", e)))?;
            let mut results = Vec::with_capacity(texts.len());
            for text in &texts {
                let vector =
                    Self::embed_one(&mut session, &tokenizer, max_length, normalize, text)?;
                results.push(Embedding::from(vector));
            }
            Ok::<_, ConnectorError>(results)
        })
        .await
        .map_err(|e| ConnectorError::ServiceUnavailable(format!("Inference task failed: {}", e)))??;

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        // 3 positions, hidden size 2, last position masked out
        let data = [1.0, 2.0, 3.0, 4.0, 100.0, 100.0];
        let mask = [1i64, 1, 0];
        let pooled = mean_pool(&data, &mask, 3, 2);
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn test_l2_normalize_unit_norm() {
        let normalized = l2_normalize(vec![3.0, 4.0]);
        assert!((normalized[0] - 0.6).abs() < 1e-6);
        assert!((normalized[1] - 0.8).abs() < 1e-6);
        let norm: f32 = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_zero_vector_unchanged() {
        let normalized = l2_normalize(vec![0.0, 0.0]);
        assert_eq!(normalized, vec![0.0, 0.0]);
    }

    #[test]
    fn test_missing_model_rejected() {
        let config = OnnxEmbeddingConfig::new("/nonexistent/model.onnx", "/nonexistent/tok.json");
        assert!(matches!(
            OnnxEmbeddingGenerator::new(config),
            Err(ConnectorError::Configuration(_))
        ));
    }
}
