// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ONNX sentence-embedding inference.
//!
//! Runs a local sentence-transformer (e.g. all-MiniLM-L6-v2) on CPU:
//! tokenize, forward pass, attention-masked mean pooling, L2 normalization.
//! Output is deterministic for identical input text within one process run.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use kindred_core::KindredError;

fn embed_err(message: impl Into<String>) -> KindredError {
    KindredError::Embedding {
        message: message.into(),
    }
}

/// Local text embedder over an ONNX sentence-embedding model.
///
/// The session is not Sync; it is guarded by a Mutex and only ever driven
/// from the bounded compute pool.
pub struct TextEmbedder {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    dimensions: usize,
}

// Safety: the session is only accessed through the Mutex; the tokenizer is
// thread-safe for encoding.
unsafe impl Send for TextEmbedder {}
unsafe impl Sync for TextEmbedder {}

impl TextEmbedder {
    /// Loads `model.onnx` and `tokenizer.json` from `dir`.
    ///
    /// Probes the model once to learn its hidden size; the dimensionality
    /// is then fixed for the process lifetime.
    pub fn load(dir: &Path) -> Result<Self, KindredError> {
        let tokenizer_path = dir.join("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            KindredError::Config(format!(
                "failed to load embedder tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let model_path = dir.join("model.onnx");
        let session = Session::builder()
            .map_err(|e| KindredError::Config(format!("onnx session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| KindredError::Config(format!("onnx optimization level: {e}")))?
            .with_intra_threads(1)
            .map_err(|e| KindredError::Config(format!("onnx thread count: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                KindredError::Config(format!(
                    "failed to load embedding model from {}: {e}",
                    model_path.display()
                ))
            })?;

        let mut embedder = Self {
            session: Mutex::new(session),
            tokenizer,
            dimensions: 0,
        };
        let probe = embedder.embed_text("dimension probe")?;
        embedder.dimensions = probe.len();
        Ok(embedder)
    }

    /// Embedding dimensionality, constant after load.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed one text, returning an L2-normalized vector.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, KindredError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| embed_err(format!("tokenization failed: {e}")))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> =
            encoding.get_attention_mask().iter().map(|&m| m as i64).collect();
        let token_type_ids: Vec<i64> =
            encoding.get_type_ids().iter().map(|&t| t as i64).collect();
        let seq_len = input_ids.len();

        let to_array = |data: Vec<i64>| {
            Array2::from_shape_vec((1, seq_len), data)
                .map_err(|e| embed_err(format!("input tensor shape: {e}")))
        };
        let input_ids_array = to_array(input_ids)?;
        let attention_mask_array = to_array(attention_mask.clone())?;
        let token_type_ids_array = to_array(token_type_ids)?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| embed_err(format!("embedder session lock poisoned: {e}")))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => TensorRef::from_array_view(&input_ids_array)
                    .map_err(|e| embed_err(format!("input_ids tensor: {e}")))?,
                "attention_mask" => TensorRef::from_array_view(&attention_mask_array)
                    .map_err(|e| embed_err(format!("attention_mask tensor: {e}")))?,
                "token_type_ids" => TensorRef::from_array_view(&token_type_ids_array)
                    .map_err(|e| embed_err(format!("token_type_ids tensor: {e}")))?
            ])
            .map_err(|e| embed_err(format!("embedding inference failed: {e}")))?;

        // Token embeddings: shape [1, seq_len, hidden]
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| embed_err(format!("output tensor extraction: {e}")))?;
        let hidden_size = shape[shape.len() - 1] as usize;

        let pooled = mean_pool(data, &attention_mask, seq_len, hidden_size);
        Ok(l2_normalize(&pooled))
    }
}

/// Attention-masked mean pooling over token embeddings.
fn mean_pool(
    token_embeddings: &[f32],
    attention_mask: &[i64],
    seq_len: usize,
    hidden_size: usize,
) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for (i, &mask) in attention_mask.iter().enumerate().take(seq_len) {
        if mask > 0 {
            for (j, s) in sum.iter_mut().enumerate() {
                *s += token_embeddings[i * hidden_size + j];
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for val in &mut sum {
            *val /= count;
        }
    }
    sum
}

/// L2-normalize a vector; the zero vector is returned unchanged.
fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        vec.iter().map(|v| v / norm).collect()
    } else {
        vec.to_vec()
    }
}
