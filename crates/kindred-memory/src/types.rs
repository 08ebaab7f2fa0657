// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval domain types.

use kindred_core::{MessageId, SenderKind};

/// A prior conversation turn retrieved by semantic similarity.
///
/// Text comes from the index payload, not the ledger -- a small staleness
/// risk traded for skipping a round-trip on the hot path.
#[derive(Debug, Clone)]
pub struct RetrievedTurn {
    pub message_id: MessageId,
    pub sender: SenderKind,
    pub text: String,
    /// Similarity score, higher is closer.
    pub score: f32,
}
