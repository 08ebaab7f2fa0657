// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The turn pipeline: one user message in, one bot reply out.
//!
//! Each turn moves through states: Received -> PersistedUser -> ContextBuilt
//! -> Generated -> Embedded -> PersistedBot -> Done. The ledger appends and
//! generation are load-bearing: if they fail the turn fails. Retrieval and
//! reply embedding are derived-data work: their failure degrades the turn
//! (empty context, unembedded reply) but never loses the exchange.

use std::sync::Arc;

use tracing::{debug, warn};

use kindred_core::{
    ConversationId, GenerationAdapter, KindredError, Ledger, Message, SenderKind, TurnPayload,
    VectorIndex,
};
use kindred_memory::ContextRetriever;

/// States a turn moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// User message received, not yet durable.
    Received,
    /// User message appended to the ledger.
    PersistedUser,
    /// Retrieval finished (possibly degraded to empty) and prompt composed.
    ContextBuilt,
    /// Model produced the reply text.
    Generated,
    /// Reply embedding computed (or skipped after a degradable failure).
    Embedded,
    /// Reply appended to the ledger; the exchange is durable.
    PersistedBot,
    /// Turn complete, index updated where possible.
    Done,
    /// Turn aborted by a fatal error.
    Failed,
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::Received => write!(f, "received"),
            TurnState::PersistedUser => write!(f, "persisted_user"),
            TurnState::ContextBuilt => write!(f, "context_built"),
            TurnState::Generated => write!(f, "generated"),
            TurnState::Embedded => write!(f, "embedded"),
            TurnState::PersistedBot => write!(f, "persisted_bot"),
            TurnState::Done => write!(f, "done"),
            TurnState::Failed => write!(f, "failed"),
        }
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// The user message as appended to the ledger.
    pub user_message: Message,
    /// The bot reply as appended to the ledger.
    pub reply: Message,
    /// True when retrieval or reply embedding failed and the turn completed
    /// without them.
    pub degraded: bool,
}

/// Tuning knobs the pipeline needs per turn; the facade fills these from
/// configuration once at startup.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub top_k: usize,
    pub embed_user_turns: bool,
    pub max_prompt_chars: usize,
    pub max_tokens: u32,
    pub temperature: f32,
}

pub(crate) struct TurnPipeline {
    pub ledger: Arc<dyn Ledger>,
    pub index: Arc<dyn VectorIndex>,
    pub engine: Arc<dyn GenerationAdapter>,
    pub retriever: ContextRetriever,
    pub settings: TurnSettings,
}

impl TurnPipeline {
    /// Runs one turn end to end. The caller holds the conversation lock.
    pub async fn run(
        &self,
        conversation_id: &ConversationId,
        persona_description: &str,
        user_text: &str,
    ) -> Result<TurnOutcome, KindredError> {
        let mut state = TurnState::Received;
        let mut degraded = false;
        debug!(conversation = %conversation_id, %state, "turn started");

        // The user's embedding, when symmetric indexing is on, is computed
        // before the append so the ledger row carries it for replay. Any
        // failure here only degrades memory: the user message has not been
        // persisted yet, and its durability must never hinge on this step.
        let user_embedding = if self.settings.embed_user_turns {
            match self.engine.embed(user_text).await {
                Ok(vector) => Some(vector),
                Err(e) => {
                    warn!(conversation = %conversation_id, error = %e,
                          "user turn embedding failed; persisting without it");
                    degraded = true;
                    None
                }
            }
        } else {
            None
        };

        let user_message = self
            .ledger
            .append(
                conversation_id,
                SenderKind::User,
                user_text,
                user_embedding.as_deref(),
            )
            .await
            .map_err(|e| self.fail(conversation_id, state, e))?;
        state = TurnState::PersistedUser;

        // Retrieval failure degrades to an empty context; the dimension
        // check is the exception, it signals operator error and must
        // surface.
        let retrieved = match self
            .retriever
            .retrieve(conversation_id, user_text, self.settings.top_k)
            .await
        {
            Ok(turns) => turns,
            Err(e @ KindredError::DimensionMismatch { .. }) => {
                return Err(self.fail(conversation_id, state, e));
            }
            Err(e) if e.is_degradable() => {
                warn!(conversation = %conversation_id, error = %e,
                      "retrieval failed; continuing with empty context");
                metrics::counter!("kindred_retrieval_degraded_total").increment(1);
                degraded = true;
                Vec::new()
            }
            Err(e) => return Err(self.fail(conversation_id, state, e)),
        };

        // Indexed only after retrieval: context is prior turns, so the
        // message being handled must never surface as its own context.
        if let Some(vector) = &user_embedding {
            self.insert_degradable(conversation_id, &user_message, vector, state, &mut degraded)
                .await?;
        }

        let prompt = kindred_context::compose(
            persona_description,
            &retrieved,
            user_text,
            self.settings.max_prompt_chars,
        );
        state = TurnState::ContextBuilt;
        debug!(conversation = %conversation_id, %state,
               retrieved = retrieved.len(), prompt_chars = prompt.chars().count(),
               "prompt composed");

        let reply_text = self
            .engine
            .generate(&prompt, self.settings.max_tokens, self.settings.temperature)
            .await
            .map_err(|e| self.fail(conversation_id, state, e))?;
        state = TurnState::Generated;

        // A failed reply embedding leaves the ledger row unembedded; a later
        // reindex pass skips it, and it simply never enters the index.
        let reply_embedding = match self.engine.embed(&reply_text).await {
            Ok(vector) => Some(vector),
            Err(e) if e.is_degradable() => {
                warn!(conversation = %conversation_id, error = %e,
                      "reply embedding failed; persisting reply without index entry");
                degraded = true;
                None
            }
            Err(e) => return Err(self.fail(conversation_id, state, e)),
        };
        state = TurnState::Embedded;

        let reply = self
            .ledger
            .append(
                conversation_id,
                SenderKind::Bot,
                &reply_text,
                reply_embedding.as_deref(),
            )
            .await
            .map_err(|e| self.fail(conversation_id, state, e))?;
        state = TurnState::PersistedBot;

        if let Some(vector) = &reply_embedding {
            self.insert_degradable(conversation_id, &reply, vector, state, &mut degraded)
                .await?;
        }

        state = TurnState::Done;
        debug!(conversation = %conversation_id, %state, degraded, "turn finished");
        metrics::counter!("kindred_turns_total").increment(1);
        if degraded {
            metrics::counter!("kindred_turns_degraded_total").increment(1);
        }

        Ok(TurnOutcome {
            user_message,
            reply,
            degraded,
        })
    }

    /// Index insert after a durable append. Degradable except for the
    /// dimension check.
    async fn insert_degradable(
        &self,
        conversation_id: &ConversationId,
        message: &Message,
        vector: &[f32],
        state: TurnState,
        degraded: &mut bool,
    ) -> Result<(), KindredError> {
        let payload = TurnPayload {
            sender: message.sender,
            text: message.text.clone(),
        };
        match self
            .index
            .insert(conversation_id, &message.id, vector, &payload)
            .await
        {
            Ok(()) => Ok(()),
            Err(e @ KindredError::DimensionMismatch { .. }) => {
                Err(self.fail(conversation_id, state, e))
            }
            Err(e) if e.is_degradable() => {
                warn!(conversation = %conversation_id, message = %message.id, error = %e,
                      "index insert failed; ledger row keeps the embedding for reindex");
                metrics::counter!("kindred_index_insert_skipped_total").increment(1);
                *degraded = true;
                Ok(())
            }
            Err(e) => Err(self.fail(conversation_id, state, e)),
        }
    }

    fn fail(
        &self,
        conversation_id: &ConversationId,
        state: TurnState,
        error: KindredError,
    ) -> KindredError {
        warn!(conversation = %conversation_id, %state, error = %error, "turn failed");
        metrics::counter!("kindred_turns_failed_total").increment(1);
        error
    }
}
