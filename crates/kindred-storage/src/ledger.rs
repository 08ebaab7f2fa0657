// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `Ledger` trait implementation over the shared SQLite database.

use async_trait::async_trait;
use kindred_core::{ConversationId, KindredError, Ledger, Message, SenderKind};

use crate::database::Database;
use crate::queries::messages;

/// SQLite-backed append-only message ledger.
///
/// Appends run in a single transaction on the serialized connection, so
/// seq assignment is race-free even without the orchestrator's
/// per-conversation lock.
#[derive(Clone)]
pub struct SqliteLedger {
    db: Database,
}

impl SqliteLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Ledger for SqliteLedger {
    async fn append(
        &self,
        conversation_id: &ConversationId,
        sender: SenderKind,
        text: &str,
        embedding: Option<&[f32]>,
    ) -> Result<Message, KindredError> {
        messages::append_message(&self.db, conversation_id, sender, text, embedding)
            .await?
            .ok_or_else(|| KindredError::NotFound {
                entity: "conversation",
                id: conversation_id.0.clone(),
            })
    }

    async fn list(&self, conversation_id: &ConversationId) -> Result<Vec<Message>, KindredError> {
        messages::list_messages(&self.db, conversation_id).await
    }
}
