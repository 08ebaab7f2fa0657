// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn orchestration for Kindred.
//!
//! [`KindredAgent`] is the single entry point callers use: it owns the
//! ledger, the vector index, the retriever, and the per-conversation locks,
//! and wires them to a [`GenerationAdapter`]. One call to
//! [`KindredAgent::handle_turn`] runs the full exchange; turns within a
//! conversation are strictly serialized, turns across conversations run
//! concurrently.

mod locks;
mod turn;

use std::sync::Arc;

use tracing::info;

use kindred_config::KindredConfig;
use kindred_core::{
    ConversationId, GenerationAdapter, KindredError, Ledger, Message, Persona, UserId, VectorIndex,
};
use kindred_memory::{rebuild_index, ContextRetriever, SqliteVectorIndex};
use kindred_storage::{queries, Database, SqliteLedger};

use locks::ConversationLocks;
use turn::TurnPipeline;

pub use turn::{TurnOutcome, TurnSettings, TurnState};

/// The conversation core: personas, history, and the turn pipeline.
pub struct KindredAgent {
    db: Database,
    ledger: Arc<dyn Ledger>,
    index: Arc<dyn VectorIndex>,
    pipeline: TurnPipeline,
    locks: ConversationLocks,
}

impl KindredAgent {
    /// Wires the agent from an open database, a loaded engine, and config,
    /// using the SQLite-backed ledger and index.
    pub fn new(db: Database, engine: Arc<dyn GenerationAdapter>, config: &KindredConfig) -> Self {
        let ledger: Arc<dyn Ledger> = Arc::new(SqliteLedger::new(db.clone()));
        let index: Arc<dyn VectorIndex> = Arc::new(SqliteVectorIndex::new(db.clone()));
        Self::with_adapters(db, ledger, index, engine, config)
    }

    /// Wires the agent over explicit ledger and index adapters.
    ///
    /// The database handle still backs persona and conversation queries;
    /// the adapters carry the message ledger and vector index, which is
    /// what allows exercising backend-failure behavior in tests.
    pub fn with_adapters(
        db: Database,
        ledger: Arc<dyn Ledger>,
        index: Arc<dyn VectorIndex>,
        engine: Arc<dyn GenerationAdapter>,
        config: &KindredConfig,
    ) -> Self {
        let retriever = ContextRetriever::new(index.clone(), engine.clone());

        let settings = TurnSettings {
            top_k: config.memory.top_k,
            embed_user_turns: config.memory.embed_user_turns,
            max_prompt_chars: config.prompt.max_prompt_chars,
            max_tokens: config.engine.max_tokens,
            temperature: config.engine.temperature,
        };
        info!(
            top_k = settings.top_k,
            embed_user_turns = settings.embed_user_turns,
            dimensions = engine.dimensions(),
            "agent wired"
        );

        let pipeline = TurnPipeline {
            ledger: ledger.clone(),
            index: index.clone(),
            engine,
            retriever,
            settings,
        };

        Self {
            db,
            ledger,
            index,
            pipeline,
            locks: ConversationLocks::new(),
        }
    }

    /// Creates a persona and its initial conversation for a user.
    pub async fn create_persona(
        &self,
        user_id: &UserId,
        name: &str,
        description: &str,
    ) -> Result<(Persona, ConversationId), KindredError> {
        queries::personas::insert_persona_with_conversation(&self.db, user_id, name, description)
            .await
    }

    /// Lists a user's personas in creation order.
    pub async fn list_personas(&self, user_id: &UserId) -> Result<Vec<Persona>, KindredError> {
        queries::personas::get_personas_for_user(&self.db, user_id).await
    }

    /// Full conversation history, in order. Empty for a conversation with
    /// no messages; `NotFound` for a conversation that does not exist.
    pub async fn get_history(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Message>, KindredError> {
        if queries::conversations::get_conversation(&self.db, conversation_id)
            .await?
            .is_none()
        {
            return Err(KindredError::NotFound {
                entity: "conversation",
                id: conversation_id.0.clone(),
            });
        }
        self.ledger.list(conversation_id).await
    }

    /// Runs one full turn: persist the user message, retrieve context,
    /// generate, persist and index the reply.
    ///
    /// Turns for the same conversation are serialized; a second call for a
    /// conversation whose turn is in flight waits for the first to finish.
    pub async fn handle_turn(
        &self,
        conversation_id: &ConversationId,
        user_text: &str,
    ) -> Result<TurnOutcome, KindredError> {
        let (_persona_name, persona_description) =
            queries::conversations::get_persona_description(&self.db, conversation_id)
                .await?
                .ok_or_else(|| KindredError::NotFound {
                    entity: "conversation",
                    id: conversation_id.0.clone(),
                })?;

        let lock = self.locks.lock_for(conversation_id);
        let _guard = lock.lock().await;
        self.pipeline
            .run(conversation_id, &persona_description, user_text)
            .await
    }

    /// Rebuilds a conversation's vector index from the ledger.
    ///
    /// Returns the number of points inserted. Ledger rows persisted without
    /// an embedding are skipped.
    pub async fn reindex(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<usize, KindredError> {
        let lock = self.locks.lock_for(conversation_id);
        let _guard = lock.lock().await;
        rebuild_index(self.ledger.as_ref(), self.index.as_ref(), conversation_id).await
    }
}
