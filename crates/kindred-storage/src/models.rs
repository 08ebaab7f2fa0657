// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for tables that have no direct counterpart in kindred-core.

use kindred_core::{ConversationId, PersonaId, UserId};

/// One row of the `conversations` table.
#[derive(Debug, Clone)]
pub struct ConversationRecord {
    pub id: ConversationId,
    pub persona_id: PersonaId,
    pub user_id: UserId,
    pub created_at: String,
}
