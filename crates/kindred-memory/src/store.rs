// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed per-conversation vector index.
//!
//! Vectors are stored as f32 little-endian BLOBs. Search is a scored scan
//! over the conversation's points: conversations are user-scale (hundreds
//! of turns, not millions), so a scan beats maintaining an ANN structure.

use async_trait::async_trait;
use kindred_core::types::{blob_to_vec, cosine_similarity, vec_to_blob};
use kindred_core::{
    ConversationId, IndexHit, KindredError, MessageId, SenderKind, TurnPayload, VectorIndex,
};
use kindred_storage::Database;
use rusqlite::{params, OptionalExtension};

/// Convert tokio_rusqlite errors into `KindredError::Index`.
///
/// Failures here are index-backend failures, which the orchestrator may
/// recover from -- unlike ledger failures, which map to `Storage`.
fn index_err(e: tokio_rusqlite::Error) -> KindredError {
    KindredError::Index {
        message: e.to_string(),
    }
}

/// SQLite-backed implementation of the vector memory index.
///
/// Shares the ledger's database handle but owns only the derived `vectors`
/// table; the whole table can be dropped and rebuilt by ledger replay.
#[derive(Clone)]
pub struct SqliteVectorIndex {
    db: Database,
}

impl SqliteVectorIndex {
    /// Wraps an opened database. The schema is applied by `Database::open`.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Byte length of the first-inserted vector for a conversation, if any.
    ///
    /// The first insert establishes the conversation's dimensionality; all
    /// later vectors must agree.
    async fn established_blob_len(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Option<usize>, KindredError> {
        let conversation_id = conversation_id.clone();
        self.db
            .connection()
            .call(move |conn| {
                let len = conn
                    .query_row(
                        "SELECT LENGTH(embedding) FROM vectors
                         WHERE conversation_id = ?1 ORDER BY rowid ASC LIMIT 1",
                        params![conversation_id.0],
                        |row| row.get::<_, i64>(0),
                    )
                    .optional()?;
                Ok(len.map(|l| l as usize))
            })
            .await
            .map_err(index_err)
    }

    fn check_dimensions(
        established_blob_len: Option<usize>,
        vector_len: usize,
    ) -> Result<(), KindredError> {
        if let Some(blob_len) = established_blob_len {
            let expected = blob_len / 4;
            if expected != vector_len {
                return Err(KindredError::DimensionMismatch {
                    expected,
                    got: vector_len,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for SqliteVectorIndex {
    async fn insert(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        vector: &[f32],
        payload: &TurnPayload,
    ) -> Result<(), KindredError> {
        Self::check_dimensions(
            self.established_blob_len(conversation_id).await?,
            vector.len(),
        )?;

        let conversation_id = conversation_id.clone();
        let message_id = message_id.clone();
        let blob = vec_to_blob(vector);
        let sender = payload.sender.as_str();
        let content = payload.text.clone();

        self.db
            .connection()
            .call(move |conn| {
                // ON CONFLICT DO UPDATE keeps the original rowid, so a
                // re-inserted point keeps its first-insertion position for
                // tie-breaking.
                conn.execute(
                    "INSERT INTO vectors (message_id, conversation_id, embedding, sender, content)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(message_id) DO UPDATE SET
                         embedding = excluded.embedding,
                         sender = excluded.sender,
                         content = excluded.content",
                    params![message_id.0, conversation_id.0, blob, sender, content],
                )?;
                Ok(())
            })
            .await
            .map_err(index_err)
    }

    async fn search(
        &self,
        conversation_id: &ConversationId,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexHit>, KindredError> {
        Self::check_dimensions(
            self.established_blob_len(conversation_id).await?,
            query.len(),
        )?;

        let conversation_id = conversation_id.clone();
        let points: Vec<(String, Vec<u8>, String, String)> = self
            .db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT message_id, embedding, sender, content
                     FROM vectors WHERE conversation_id = ?1 ORDER BY rowid ASC",
                )?;
                let rows = stmt
                    .query_map(params![conversation_id.0], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(index_err)?;

        // Rows arrive in insertion order; a stable sort on descending score
        // therefore breaks ties by earlier insertion.
        let mut hits: Vec<IndexHit> = points
            .into_iter()
            .map(|(message_id, blob, sender, text)| {
                let vector = blob_to_vec(&blob);
                IndexHit {
                    message_id: MessageId(message_id),
                    payload: TurnPayload {
                        sender: SenderKind::from_str_value(&sender),
                        text,
                    },
                    score: cosine_similarity(query, &vector),
                }
            })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);

        Ok(hits)
    }
}
