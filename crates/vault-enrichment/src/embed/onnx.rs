//! Reference embedding provider: tokenizes with `tokenizers` and runs an
//! ONNX transformer graph with `ort`. Feature-gated behind `onnx` since the
//! runtime pulls in a native ONNX Runtime binary.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tokenizers::Tokenizer;
use vault_core::{EmbeddingProvider, Result, VaultError};

const DEFAULT_MAX_TOKENS: usize = 8192;

pub struct OnnxEmbeddingProvider {
    session: Session,
    tokenizer: Tokenizer,
    dimensions: usize,
    model_name: String,
    max_tokens: usize,
}

impl OnnxEmbeddingProvider {
    pub fn load(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        dimensions: usize,
        model_name: impl Into<String>,
    ) -> Result<Self> {
        ort::init()
            .with_name("vaultkeep-embed")
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .commit()
            .map_err(|e| VaultError::Embedding(format!("failed to init ONNX environment: {e}")))?;

        let session = Session::builder()
            .map_err(|e| VaultError::Embedding(format!("failed to create session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VaultError::Embedding(format!("failed to set optimization level: {e}")))?
            .commit_from_file(model_path.as_ref())
            .map_err(|e| VaultError::Embedding(format!("failed to load model: {e}")))?;

        let tokenizer = Tokenizer::from_file(tokenizer_path.as_ref())
            .map_err(|e| VaultError::Embedding(format!("failed to load tokenizer: {e}")))?;

        Ok(Self {
            session,
            tokenizer,
            dimensions,
            model_name: model_name.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    fn run_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| VaultError::Embedding(format!("tokenization failed: {e}")))?;

        let batch_size = encodings.len();
        let seq_len = encodings
            .iter()
            .map(|e| e.get_ids().len().min(self.max_tokens))
            .max()
            .unwrap_or(0);

        let mut input_ids = Array2::<i64>::zeros((batch_size, seq_len));
        let mut attention_mask = Array2::<i64>::zeros((batch_size, seq_len));

        for (row, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            // Truncate to the last `max_tokens` tokens per the reference
            // truncation policy (keep the tail, not the head).
            let start = ids.len().saturating_sub(self.max_tokens);
            for (col, &id) in ids[start..].iter().enumerate().take(seq_len) {
                input_ids[[row, col]] = id as i64;
                attention_mask[[row, col]] = 1;
            }
        }

        let input_ids_value = Value::from_array(input_ids.clone())
            .map_err(|e| VaultError::Embedding(format!("failed to bind input_ids: {e}")))?;
        let attention_mask_value = Value::from_array(attention_mask.clone())
            .map_err(|e| VaultError::Embedding(format!("failed to bind attention_mask: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![
                "input_ids" => input_ids_value,
                "attention_mask" => attention_mask_value,
            ])
            .map_err(|e| VaultError::Embedding(format!("inference failed: {e}")))?;

        // Prefer a dedicated `sentence_embedding` output; otherwise mean-pool
        // the last hidden state using the attention mask.
        let view = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VaultError::Embedding(format!("failed to extract output tensor: {e}")))?;

        let mut result = Vec::with_capacity(batch_size);
        if view.ndim() == 2 {
            // Already pooled: [batch, hidden].
            for row in view.rows() {
                let mut vec: Vec<f32> = row.to_vec();
                l2_normalize(&mut vec);
                result.push(vec);
            }
        } else {
            // [batch, seq_len, hidden]: mean-pool with the attention mask.
            for b in 0..batch_size {
                let mut pooled = vec![0f32; self.dimensions.min(view.shape()[2])];
                let mut count = 0f32;
                for s in 0..seq_len {
                    if attention_mask[[b, s]] == 0 {
                        continue;
                    }
                    count += 1.0;
                    for (h, value) in pooled.iter_mut().enumerate() {
                        *value += view[[b, s, h]];
                    }
                }
                if count > 0.0 {
                    for value in pooled.iter_mut() {
                        *value /= count;
                    }
                }
                l2_normalize(&mut pooled);
                result.push(pooled);
            }
        }

        Ok(result)
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OnnxEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let batch = self.run_batch(&[text.to_string()])?;
        batch
            .into_iter()
            .next()
            .ok_or_else(|| VaultError::Embedding("empty embedding batch".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.run_batch(texts)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Conventional on-disk layout expected by `OnnxEmbeddingProvider::load`:
/// `<model_dir>/model.onnx` and `<model_dir>/tokenizer.json`.
pub fn default_model_paths(model_dir: impl AsRef<Path>) -> (PathBuf, PathBuf) {
    let dir = model_dir.as_ref();
    (dir.join("model.onnx"), dir.join("tokenizer.json"))
}
