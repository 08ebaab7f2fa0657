// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ONNX causal-LM text generation.
//!
//! A plain autoregressive decode loop: tokenize the prompt, run forward
//! passes, sample the next token from the final logits row, stop on EOS
//! or the token budget. Greedy at temperature 0 (deterministic); softmax
//! sampling otherwise, driven by thread-local RNG state -- nonzero
//! temperature output is not reproducible across runs.

use std::path::Path;
use std::sync::Mutex;

use ndarray::Array2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;
use rand::Rng;

use kindred_core::KindredError;

/// EOS token spellings tried against the tokenizer vocabulary, in order.
const EOS_CANDIDATES: &[&str] = &["</s>", "<|endoftext|>", "<|end|>", "<eos>"];

fn gen_err(message: impl Into<String>) -> KindredError {
    KindredError::Generation {
        message: message.into(),
    }
}

/// Local text generator over an ONNX causal language model.
pub struct TextGenerator {
    session: Mutex<Session>,
    tokenizer: tokenizers::Tokenizer,
    context_window: usize,
    eos_token_id: Option<u32>,
}

// Safety: the session is only accessed through the Mutex; the tokenizer is
// thread-safe for encoding and decoding.
unsafe impl Send for TextGenerator {}
unsafe impl Sync for TextGenerator {}

impl TextGenerator {
    /// Loads `model.onnx` and `tokenizer.json` from `dir`.
    pub fn load(dir: &Path, context_window: usize) -> Result<Self, KindredError> {
        let tokenizer_path = dir.join("tokenizer.json");
        let tokenizer = tokenizers::Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            KindredError::Config(format!(
                "failed to load generator tokenizer from {}: {e}",
                tokenizer_path.display()
            ))
        })?;

        let eos_token_id = EOS_CANDIDATES
            .iter()
            .find_map(|token| tokenizer.token_to_id(token));

        let model_path = dir.join("model.onnx");
        let session = Session::builder()
            .map_err(|e| KindredError::Config(format!("onnx session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| KindredError::Config(format!("onnx optimization level: {e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                KindredError::Config(format!(
                    "failed to load generation model from {}: {e}",
                    model_path.display()
                ))
            })?;

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            context_window,
            eos_token_id,
        })
    }

    /// Generate a continuation of `prompt`.
    ///
    /// Fails when the tokenized prompt exceeds the context window; the
    /// overflow is reported rather than silently truncated.
    pub fn generate_text(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, KindredError> {
        let encoding = self
            .tokenizer
            .encode(prompt, true)
            .map_err(|e| gen_err(format!("tokenization failed: {e}")))?;

        let prompt_len = encoding.get_ids().len();
        if prompt_len > self.context_window {
            return Err(gen_err(format!(
                "prompt is {prompt_len} tokens, exceeding the {}-token context window",
                self.context_window
            )));
        }

        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let mut generated: Vec<u32> = Vec::new();

        let mut session = self
            .session
            .lock()
            .map_err(|e| gen_err(format!("generator session lock poisoned: {e}")))?;

        for _ in 0..max_tokens {
            if ids.len() >= self.context_window {
                break;
            }

            let seq_len = ids.len();
            let input_ids = Array2::from_shape_vec((1, seq_len), ids.clone())
                .map_err(|e| gen_err(format!("input tensor shape: {e}")))?;
            let attention_mask = Array2::from_elem((1, seq_len), 1i64);

            let outputs = session
                .run(ort::inputs![
                    "input_ids" => TensorRef::from_array_view(&input_ids)
                        .map_err(|e| gen_err(format!("input_ids tensor: {e}")))?,
                    "attention_mask" => TensorRef::from_array_view(&attention_mask)
                        .map_err(|e| gen_err(format!("attention_mask tensor: {e}")))?
                ])
                .map_err(|e| gen_err(format!("generation inference failed: {e}")))?;

            // Logits: shape [1, seq_len, vocab]
            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| gen_err(format!("logits extraction: {e}")))?;
            let vocab = shape[shape.len() - 1] as usize;
            let last_row = &data[(seq_len - 1) * vocab..seq_len * vocab];

            let next = sample_index(last_row, temperature, &mut rand::thread_rng()) as u32;
            if Some(next) == self.eos_token_id {
                break;
            }
            generated.push(next);
            ids.push(next as i64);
        }

        self.tokenizer
            .decode(&generated, true)
            .map_err(|e| gen_err(format!("decoding failed: {e}")))
    }
}

/// Pick the next token index from a logits row.
///
/// Temperature 0 (or below epsilon) is greedy argmax; otherwise softmax
/// sampling at the given temperature.
fn sample_index<R: Rng>(logits: &[f32], temperature: f32, rng: &mut R) -> usize {
    if temperature <= f32::EPSILON {
        return argmax(logits);
    }

    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let weights: Vec<f32> = logits
        .iter()
        .map(|&l| ((l - max) / temperature).exp())
        .collect();
    let total: f32 = weights.iter().sum();
    if !total.is_finite() || total <= 0.0 {
        return argmax(logits);
    }

    let mut draw = rng.gen_range(0.0..total);
    for (i, &w) in weights.iter().enumerate() {
        if draw < w {
            return i;
        }
        draw -= w;
    }
    weights.len() - 1
}

fn argmax(logits: &[f32]) -> usize {
    logits
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
