// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persona queries.

use kindred_core::{ConversationId, KindredError, Persona, PersonaId, UserId};
use rusqlite::params;

use crate::database::{map_tr_err, Database};

/// Insert a persona and its initial conversation in one transaction.
///
/// Persona creation establishes exactly one conversation; a half-created
/// persona without a conversation would be unreachable by the turn API.
pub async fn insert_persona_with_conversation(
    db: &Database,
    user_id: &UserId,
    name: &str,
    description: &str,
) -> Result<(Persona, ConversationId), KindredError> {
    let persona_id = PersonaId(uuid::Uuid::new_v4().to_string());
    let conversation_id = ConversationId(uuid::Uuid::new_v4().to_string());
    let created_at = chrono::Utc::now().to_rfc3339();

    let persona = Persona {
        id: persona_id.clone(),
        user_id: user_id.clone(),
        name: name.to_string(),
        description: description.to_string(),
        created_at: created_at.clone(),
    };

    let p = persona.clone();
    let conv_id = conversation_id.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO personas (id, user_id, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![p.id.0, p.user_id.0, p.name, p.description, p.created_at],
            )?;
            tx.execute(
                "INSERT INTO conversations (id, persona_id, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![conv_id.0, p.id.0, p.user_id.0, p.created_at],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

    Ok((persona, conversation_id))
}

/// Get all personas owned by a user, in creation order.
pub async fn get_personas_for_user(
    db: &Database,
    user_id: &UserId,
) -> Result<Vec<Persona>, KindredError> {
    let user_id = user_id.clone();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, name, description, created_at
                 FROM personas WHERE user_id = ?1 ORDER BY rowid ASC",
            )?;
            let personas = stmt
                .query_map(params![user_id.0], |row| {
                    Ok(Persona {
                        id: PersonaId(row.get(0)?),
                        user_id: UserId(row.get(1)?),
                        name: row.get(2)?,
                        description: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(personas)
        })
        .await
        .map_err(map_tr_err)
}
