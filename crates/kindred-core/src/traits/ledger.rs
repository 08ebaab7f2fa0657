// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only message ledger trait.

use async_trait::async_trait;

use crate::error::KindredError;
use crate::types::{ConversationId, Message, SenderKind};

/// Append-only, ordered record of every message in a conversation.
///
/// The ledger is the source of truth for ordering and content. It exposes
/// no update or delete operations; the vector index holds only a derived
/// copy and can always be rebuilt by replaying embedded ledger rows.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Appends a message, assigning the next order position atomically.
    ///
    /// The embedding is stored with the row when already computed, so a
    /// replay can rebuild the vector index from the ledger alone.
    ///
    /// Fails with `NotFound` if the conversation does not exist and
    /// `Storage` if the backing store cannot be reached.
    async fn append(
        &self,
        conversation_id: &ConversationId,
        sender: SenderKind,
        text: &str,
        embedding: Option<&[f32]>,
    ) -> Result<Message, KindredError>;

    /// Returns all messages of a conversation in creation order.
    ///
    /// A conversation with no messages yields an empty vec, never an error.
    async fn list(&self, conversation_id: &ConversationId) -> Result<Vec<Message>, KindredError>;
}
