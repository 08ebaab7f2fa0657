// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context retriever: query embedding -> index search -> retrieved turns.

use std::sync::Arc;

use kindred_core::{ConversationId, GenerationAdapter, KindredError, VectorIndex};

use crate::types::RetrievedTurn;

/// Retrieves the prior turns most relevant to an incoming message.
///
/// 1. Embeds the query text via the generation engine
/// 2. Searches the conversation's vector index
/// 3. Resolves display text from the index payload (no ledger round-trip)
pub struct ContextRetriever {
    index: Arc<dyn VectorIndex>,
    engine: Arc<dyn GenerationAdapter>,
}

impl ContextRetriever {
    pub fn new(index: Arc<dyn VectorIndex>, engine: Arc<dyn GenerationAdapter>) -> Self {
        Self { index, engine }
    }

    /// Retrieve up to `top_k` turns, most similar first.
    ///
    /// Fewer than `top_k` hits -- including zero, for a conversation with
    /// no indexed turns yet -- is a normal outcome, not an error. The
    /// prompt composer renders an empty result as "no prior context".
    pub async fn retrieve(
        &self,
        conversation_id: &ConversationId,
        query_text: &str,
        top_k: usize,
    ) -> Result<Vec<RetrievedTurn>, KindredError> {
        let query = self.engine.embed(query_text).await?;
        let hits = self.index.search(conversation_id, &query, top_k).await?;

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedTurn {
                message_id: hit.message_id,
                sender: hit.payload.sender,
                text: hit.payload.text,
                score: hit.score,
            })
            .collect())
    }
}
