// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Kindred workspace.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Unique identifier for a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

/// Unique identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Unique identifier for a persona.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonaId(pub String);

/// Unique identifier for a user, supplied by the identity collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SenderKind {
    User,
    Bot,
}

impl SenderKind {
    /// String form used in SQLite and transcripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderKind::User => "USER",
            SenderKind::Bot => "BOT",
        }
    }

    /// Parse from the stored SQLite string. Unknown values read as `User`
    /// so a corrupted row never aborts a history listing.
    pub fn from_str_value(s: &str) -> Self {
        match s {
            "BOT" => SenderKind::Bot,
            _ => SenderKind::User,
        }
    }
}

/// One message in a conversation's append-only ledger.
///
/// `seq` is the immutable per-conversation order key, assigned at append
/// time and never reassigned. The embedding is present only once computed;
/// user messages carry one only when symmetric embedding is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender: SenderKind,
    pub text: String,
    /// Monotonic position within the conversation, starting at 1.
    pub seq: i64,
    /// Embedding vector, f32, fixed dimensionality per process.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    /// ISO 8601 creation timestamp.
    pub created_at: String,
}

/// A named character profile the model is conditioned to role-play.
///
/// Immutable after creation; owned by a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

/// A single hit returned by a vector index search.
#[derive(Debug, Clone)]
pub struct IndexHit {
    pub message_id: MessageId,
    /// Derived payload stored alongside the vector: enough to render the
    /// turn in a transcript without a ledger round-trip.
    pub payload: TurnPayload,
    /// Similarity score, higher is closer.
    pub score: f32,
}

/// The derived, non-authoritative copy of a turn kept in the vector index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnPayload {
    pub sender: SenderKind,
    pub text: String,
}

/// Convert an f32 vector to little-endian bytes for SQLite BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert a SQLite BLOB back to an f32 vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes(chunk.try_into().unwrap()))
        .collect()
}

/// Cosine similarity between two equal-length vectors.
///
/// For L2-normalized vectors (as produced by the engine) this is the
/// dot product.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
