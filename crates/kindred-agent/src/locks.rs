// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-conversation turn serialization.
//!
//! Turns within one conversation must run strictly one at a time so that
//! ledger order, retrieval input, and index writes stay consistent. Turns
//! in different conversations never wait on each other.

use std::sync::Arc;

use dashmap::DashMap;
use kindred_core::ConversationId;
use tokio::sync::Mutex;

/// Lazily-created per-conversation mutexes.
///
/// Entries are created on first use and kept for the process lifetime; a
/// lock is a single Arc'd Mutex, so the map stays small even for long-lived
/// processes with many conversations.
#[derive(Default)]
pub struct ConversationLocks {
    locks: DashMap<ConversationId, Arc<Mutex<()>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for a conversation, creating it if needed.
    pub fn lock_for(&self, conversation_id: &ConversationId) -> Arc<Mutex<()>> {
        self.locks
            .entry(conversation_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
