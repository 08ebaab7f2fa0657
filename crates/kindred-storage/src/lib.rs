// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Kindred.
//!
//! Owns the authoritative record of personas, conversations, and the
//! append-only message ledger. The vector index (kindred-memory) shares
//! the same database handle but holds only derived data.

pub mod database;
pub mod ledger;
pub mod models;
pub mod queries;

pub use database::Database;
pub use ledger::SqliteLedger;
pub use models::ConversationRecord;
