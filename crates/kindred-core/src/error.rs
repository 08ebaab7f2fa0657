// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kindred conversation core.

use thiserror::Error;

/// The primary error type used across all Kindred traits and core operations.
///
/// The write path of a user's own message never swallows these; read-side
/// failures (`Index`, `Embedding`) are recovered locally by the turn
/// orchestrator where degradation is acceptable. `DimensionMismatch` is a
/// configuration defect and always propagates.
#[derive(Debug, Error)]
pub enum KindredError {
    /// An entity referenced by the caller does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The message ledger backend cannot be reached or a query failed.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The vector memory index backend failed.
    #[error("index error: {message}")]
    Index { message: String },

    /// A vector's length disagrees with the index's established dimensionality.
    ///
    /// Fatal at process level, not a per-request condition.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The generation model errored or the prompt exceeds its context window.
    #[error("generation failed: {message}")]
    Generation { message: String },

    /// Computing an embedding failed. Recoverable: degrades memory only.
    #[error("embedding failed: {message}")]
    Embedding { message: String },

    /// Configuration errors (invalid values, missing model files).
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KindredError {
    /// True for failures the orchestrator may recover from by degrading
    /// memory/context instead of failing the turn.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            KindredError::Index { .. } | KindredError::Embedding { .. }
        )
    }
}
