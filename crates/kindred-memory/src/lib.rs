// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector memory for Kindred conversations.
//!
//! Provides the SQLite-backed per-conversation vector index, the context
//! retriever that turns an incoming message into the most relevant prior
//! turns, and the replay-based rebuild that reconstructs the index from
//! the ledger.

pub mod rebuild;
pub mod retriever;
pub mod store;
pub mod types;

pub use rebuild::rebuild_index;
pub use retriever::ContextRetriever;
pub use store::SqliteVectorIndex;
pub use types::RetrievedTurn;
