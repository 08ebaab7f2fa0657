// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local inference engine for Kindred.
//!
//! Wraps two ONNX models behind the [`GenerationAdapter`] trait: a causal
//! LM for reply generation and a sentence transformer for embeddings.
//! Both are loaded once at startup and shared for the process lifetime;
//! all inference runs on a bounded compute pool so that conversation I/O
//! never waits behind model work.

mod embedder;
mod generator;
mod pool;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use kindred_config::EngineConfig;
use kindred_core::{GenerationAdapter, KindredError};

pub use embedder::TextEmbedder;
pub use generator::TextGenerator;
pub use pool::ComputePool;

/// ONNX-backed engine: one generator, one embedder, one compute pool.
#[derive(Clone)]
pub struct LocalEngine {
    generator: Arc<TextGenerator>,
    embedder: Arc<TextEmbedder>,
    pool: ComputePool,
    dimensions: usize,
}

impl LocalEngine {
    /// Loads both models per the engine configuration.
    ///
    /// Model loading is synchronous and happens once; call this before
    /// serving traffic.
    pub fn load(config: &EngineConfig) -> Result<Self, KindredError> {
        info!(
            generator_dir = %config.generator_dir,
            embedder_dir = %config.embedder_dir,
            workers = config.workers,
            "loading local inference engine"
        );

        let generator = TextGenerator::load(Path::new(&config.generator_dir), config.context_window)?;
        let embedder = TextEmbedder::load(Path::new(&config.embedder_dir))?;
        let dimensions = embedder.dimensions();
        info!(dimensions, "inference engine ready");

        Ok(Self {
            generator: Arc::new(generator),
            embedder: Arc::new(embedder),
            pool: ComputePool::new(config.workers),
            dimensions,
        })
    }
}

#[async_trait]
impl GenerationAdapter for LocalEngine {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, KindredError> {
        let generator = self.generator.clone();
        let prompt = prompt.to_string();
        self.pool
            .run(move || generator.generate_text(&prompt, max_tokens, temperature))
            .await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, KindredError> {
        let embedder = self.embedder.clone();
        let text = text.to_string();
        self.pool.run(move || embedder.embed_text(&text)).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
