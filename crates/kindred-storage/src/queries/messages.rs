// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message ledger queries.
//!
//! The messages table is append-only by contract: no UPDATE or DELETE
//! statements exist anywhere in this module, which is what makes ordering
//! and replay-based index rebuilding safe.

use kindred_core::types::{blob_to_vec, vec_to_blob};
use kindred_core::{ConversationId, KindredError, Message, MessageId, SenderKind};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};

/// Append a message, assigning the next seq within one transaction.
///
/// Returns `None` when the conversation does not exist; the caller maps
/// this to `NotFound`.
pub async fn append_message(
    db: &Database,
    conversation_id: &ConversationId,
    sender: SenderKind,
    text: &str,
    embedding: Option<&[f32]>,
) -> Result<Option<Message>, KindredError> {
    let conversation_id = conversation_id.clone();
    let id = MessageId(uuid::Uuid::new_v4().to_string());
    let created_at = chrono::Utc::now().to_rfc3339();
    let text = text.to_string();
    let embedding_vec = embedding.map(|e| e.to_vec());

    let msg_id = id.clone();
    let conv_id = conversation_id.clone();
    let text_for_row = text.clone();
    let created = created_at.clone();
    let blob = embedding_vec.as_deref().map(vec_to_blob);

    let seq = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let exists = tx
                .query_row(
                    "SELECT 1 FROM conversations WHERE id = ?1",
                    params![conv_id.0],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if !exists {
                return Ok(None);
            }

            let seq: i64 = tx.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM messages WHERE conversation_id = ?1",
                params![conv_id.0],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender, content, seq, embedding, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    msg_id.0,
                    conv_id.0,
                    sender.as_str(),
                    text_for_row,
                    seq,
                    blob,
                    created,
                ],
            )?;
            tx.commit()?;
            Ok(Some(seq))
        })
        .await
        .map_err(map_tr_err)?;

    Ok(seq.map(|seq| Message {
        id,
        conversation_id,
        sender,
        text,
        seq,
        embedding: embedding_vec,
        created_at,
    }))
}

/// Get all messages of a conversation in seq order.
pub async fn list_messages(
    db: &Database,
    conversation_id: &ConversationId,
) -> Result<Vec<Message>, KindredError> {
    let conversation_id = conversation_id.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender, content, seq, embedding, created_at
                 FROM messages WHERE conversation_id = ?1 ORDER BY seq ASC",
            )?;
            let messages = stmt
                .query_map(params![conversation_id.0], |row| {
                    let blob: Option<Vec<u8>> = row.get(4)?;
                    Ok(Message {
                        id: MessageId(row.get(0)?),
                        conversation_id: conversation_id.clone(),
                        sender: SenderKind::from_str_value(&row.get::<_, String>(1)?),
                        text: row.get(2)?,
                        seq: row.get(3)?,
                        embedding: blob.map(|b| blob_to_vec(&b)),
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}
