// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector memory index trait.

use async_trait::async_trait;

use crate::error::KindredError;
use crate::types::{ConversationId, IndexHit, MessageId, TurnPayload};

/// Per-conversation nearest-neighbor index over message embeddings.
///
/// Secondary and derived: never the source of truth. Keyed per
/// conversation, so a search cannot leak context across conversations.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Adds a point to the conversation's index.
    ///
    /// Idempotent on `message_id`: re-insertion overwrites the vector and
    /// payload but keeps the point's original insertion position for
    /// tie-breaking. Fails with `DimensionMismatch` when the vector's
    /// length disagrees with the index's established dimensionality.
    async fn insert(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        vector: &[f32],
        payload: &TurnPayload,
    ) -> Result<(), KindredError>;

    /// Returns up to `top_k` nearest points by similarity, ordered by
    /// descending score, ties broken by earlier insertion.
    ///
    /// A conversation with no indexed points yields an empty vec, never
    /// an error.
    async fn search(
        &self,
        conversation_id: &ConversationId,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexHit>, KindredError>;
}
