// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and schema.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use kindred_core::KindredError;
use tokio_rusqlite::Connection;

/// Convert tokio_rusqlite errors into `KindredError::Storage`.
pub fn map_tr_err(e: tokio_rusqlite::Error) -> KindredError {
    KindredError::Storage {
        source: Box::new(e),
    }
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS personas (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY NOT NULL,
    persona_id TEXT NOT NULL REFERENCES personas(id),
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY NOT NULL,
    conversation_id TEXT NOT NULL REFERENCES conversations(id),
    sender TEXT NOT NULL,
    content TEXT NOT NULL,
    seq INTEGER NOT NULL,
    embedding BLOB,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE(conversation_id, seq)
);

CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, seq);
CREATE INDEX IF NOT EXISTS idx_personas_user ON personas(user_id);

CREATE TABLE IF NOT EXISTS vectors (
    message_id TEXT PRIMARY KEY NOT NULL,
    conversation_id TEXT NOT NULL,
    embedding BLOB NOT NULL,
    sender TEXT NOT NULL,
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_vectors_conversation ON vectors(conversation_id);
";

/// Shared handle to the SQLite database.
///
/// Cheap to clone; all clones funnel into the same background connection.
#[derive(Clone, Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database at `path`, applies PRAGMAs and the
    /// schema.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, KindredError> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| KindredError::Storage { source: Box::new(e) })?;
        Self::init(conn, wal_mode).await
    }

    /// Opens an in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self, KindredError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| KindredError::Storage { source: Box::new(e) })?;
        Self::init(conn, false).await
    }

    async fn init(conn: Connection, wal_mode: bool) -> Result<Self, KindredError> {
        conn.call(move |conn| {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        Ok(Self { conn })
    }

    /// The underlying serialized connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Closes the background connection, flushing pending work.
    pub async fn close(self) -> Result<(), KindredError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}
