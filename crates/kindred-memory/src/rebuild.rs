// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Replay-based index rebuild.
//!
//! The vector index is derived state; the ledger stores each embedded
//! message's vector alongside its row. Replaying those rows reconstructs
//! the index from scratch or backfills points skipped after embedding
//! failures. Kept off the hot turn path.

use kindred_core::{ConversationId, KindredError, Ledger, TurnPayload, VectorIndex};
use tracing::{debug, info};

/// Replay a conversation's embedded ledger rows into the vector index.
///
/// Idempotent: insertion overwrites on message_id, so running it over an
/// already-populated index never duplicates points. Messages without a
/// stored embedding (user turns by default, or replies whose embedding
/// failed) are skipped.
///
/// Returns the number of points inserted.
pub async fn rebuild_index(
    ledger: &dyn Ledger,
    index: &dyn VectorIndex,
    conversation_id: &ConversationId,
) -> Result<usize, KindredError> {
    let messages = ledger.list(conversation_id).await?;
    let total = messages.len();
    let mut inserted = 0;

    for message in messages {
        let Some(embedding) = message.embedding else {
            continue;
        };
        index
            .insert(
                conversation_id,
                &message.id,
                &embedding,
                &TurnPayload {
                    sender: message.sender,
                    text: message.text,
                },
            )
            .await?;
        inserted += 1;
        debug!(
            conversation_id = %conversation_id,
            message_id = %message.id,
            "replayed point into index"
        );
    }

    info!(
        conversation_id = %conversation_id,
        inserted,
        total,
        "index rebuild complete"
    );
    Ok(inserted)
}
