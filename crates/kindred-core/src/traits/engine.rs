// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation engine trait: text generation and embedding extraction.

use async_trait::async_trait;

use crate::error::KindredError;

/// The two compute-heavy capabilities the conversation core consumes.
///
/// Implementations dispatch onto a bounded compute pool so that one
/// conversation's generation never starves another's storage I/O.
#[async_trait]
pub trait GenerationAdapter: Send + Sync {
    /// Generates a reply for the prompt.
    ///
    /// Deterministic at `temperature == 0.0`; stochastic otherwise, seeded
    /// from global sampling state and not reproducible across runs. Fails
    /// with `Generation` when the model errors or the prompt exceeds the
    /// context window -- the overflow is reported, never truncated away.
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, KindredError>;

    /// Computes the embedding vector for a text.
    ///
    /// Deterministic within one process run: identical text yields an
    /// identical vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, KindredError>;

    /// Embedding dimensionality, constant for the process lifetime.
    fn dimensions(&self) -> usize;
}
