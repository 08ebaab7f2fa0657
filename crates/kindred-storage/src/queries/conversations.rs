// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation queries.

use kindred_core::{ConversationId, KindredError, PersonaId, UserId};
use rusqlite::{params, OptionalExtension};

use crate::database::{map_tr_err, Database};
use crate::models::ConversationRecord;

/// Get one conversation by id, or `None` if it does not exist.
pub async fn get_conversation(
    db: &Database,
    id: &ConversationId,
) -> Result<Option<ConversationRecord>, KindredError> {
    let id = id.clone();
    db.connection()
        .call(move |conn| {
            let record = conn
                .query_row(
                    "SELECT id, persona_id, user_id, created_at
                     FROM conversations WHERE id = ?1",
                    params![id.0],
                    |row| {
                        Ok(ConversationRecord {
                            id: ConversationId(row.get(0)?),
                            persona_id: PersonaId(row.get(1)?),
                            user_id: UserId(row.get(2)?),
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
        .await
        .map_err(map_tr_err)
}

/// Get the persona description for a conversation.
///
/// This is the lookup the turn path uses to condition the prompt.
pub async fn get_persona_description(
    db: &Database,
    id: &ConversationId,
) -> Result<Option<(String, String)>, KindredError> {
    let id = id.clone();
    db.connection()
        .call(move |conn| {
            let pair = conn
                .query_row(
                    "SELECT p.name, p.description
                     FROM conversations c JOIN personas p ON p.id = c.persona_id
                     WHERE c.id = ?1",
                    params![id.0],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            Ok(pair)
        })
        .await
        .map_err(map_tr_err)
}
