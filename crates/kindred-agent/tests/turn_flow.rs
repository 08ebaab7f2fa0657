// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end turn pipeline tests against real SQLite storage, with a mock
//! engine providing deterministic embeddings and failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use kindred_agent::KindredAgent;
use kindred_config::KindredConfig;
use kindred_core::{
    ConversationId, GenerationAdapter, IndexHit, KindredError, MessageId, SenderKind, TurnPayload,
    UserId, VectorIndex,
};
use kindred_memory::SqliteVectorIndex;
use kindred_storage::{Database, SqliteLedger};

const DIM: usize = 4;

/// Deterministic unit vector derived from the text bytes.
fn text_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for (i, b) in text.bytes().enumerate() {
        v[i % DIM] += b as f32;
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    } else {
        v[0] = 1.0;
    }
    v
}

/// Scripted engine: embeddings are a pure function of the text, replies are
/// numbered, and either capability can be made to fail.
#[derive(Default)]
struct MockEngine {
    fail_embed: AtomicBool,
    /// Fails this many upcoming embed calls with a fatal (non-degradable)
    /// error before recovering.
    fail_next_embeds_fatal: AtomicUsize,
    fail_generate: AtomicBool,
    generate_delay_ms: AtomicUsize,
    reply_counter: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockEngine {
    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationAdapter for MockEngine {
    async fn generate(
        &self,
        prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, KindredError> {
        if self.fail_generate.load(Ordering::SeqCst) {
            return Err(KindredError::Generation {
                message: "injected generation failure".into(),
            });
        }
        let delay = self.generate_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }
        self.prompts.lock().unwrap().push(prompt.to_string());
        let n = self.reply_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("reply number {n}"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, KindredError> {
        if self.fail_embed.load(Ordering::SeqCst) {
            return Err(KindredError::Embedding {
                message: "injected embedding failure".into(),
            });
        }
        if self
            .fail_next_embeds_fatal
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(KindredError::Internal("injected embed fault".into()));
        }
        Ok(text_vector(text))
    }

    fn dimensions(&self) -> usize {
        DIM
    }
}

/// SQLite index wrapper with switchable backend failures.
struct FlakyIndex {
    inner: SqliteVectorIndex,
    fail_insert: AtomicBool,
    fail_search: AtomicBool,
}

impl FlakyIndex {
    fn new(db: Database) -> Self {
        Self {
            inner: SqliteVectorIndex::new(db),
            fail_insert: AtomicBool::new(false),
            fail_search: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl VectorIndex for FlakyIndex {
    async fn insert(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
        vector: &[f32],
        payload: &TurnPayload,
    ) -> Result<(), KindredError> {
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(KindredError::Index {
                message: "injected insert failure".into(),
            });
        }
        self.inner.insert(conversation_id, message_id, vector, payload).await
    }

    async fn search(
        &self,
        conversation_id: &ConversationId,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<IndexHit>, KindredError> {
        if self.fail_search.load(Ordering::SeqCst) {
            return Err(KindredError::Index {
                message: "injected search failure".into(),
            });
        }
        self.inner.search(conversation_id, query, top_k).await
    }
}

async fn setup_with_flaky_index() -> (KindredAgent, Arc<MockEngine>, Arc<FlakyIndex>, ConversationId)
{
    let db = Database::open_in_memory().await.unwrap();
    let engine = Arc::new(MockEngine::default());
    let index = Arc::new(FlakyIndex::new(db.clone()));
    let agent = KindredAgent::with_adapters(
        db.clone(),
        Arc::new(SqliteLedger::new(db)),
        index.clone(),
        engine.clone(),
        &KindredConfig::default(),
    );
    let (_, conversation_id) = agent
        .create_persona(&UserId("u-1".into()), "Ada", "Ada Lovelace, precise and curious")
        .await
        .unwrap();
    (agent, engine, index, conversation_id)
}

async fn setup() -> (KindredAgent, Arc<MockEngine>, ConversationId) {
    let db = Database::open_in_memory().await.unwrap();
    let engine = Arc::new(MockEngine::default());
    let agent = KindredAgent::new(db, engine.clone(), &KindredConfig::default());
    let (_, conversation_id) = agent
        .create_persona(&UserId("u-1".into()), "Ada", "Ada Lovelace, precise and curious")
        .await
        .unwrap();
    (agent, engine, conversation_id)
}

#[tokio::test]
async fn first_turn_persists_user_then_reply() {
    let (agent, _engine, conv) = setup().await;

    let outcome = agent.handle_turn(&conv, "Hello Ada").await.unwrap();
    assert!(!outcome.degraded);
    assert_eq!(outcome.user_message.seq, 1);
    assert_eq!(outcome.reply.seq, 2);
    assert_eq!(outcome.reply.sender, SenderKind::Bot);

    let history = agent.get_history(&conv).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].sender, SenderKind::User);
    assert_eq!(history[0].text, "Hello Ada");
    assert_eq!(history[1].text, outcome.reply.text);
    // The reply's embedding is stored on the ledger row for replay.
    assert!(history[1].embedding.is_some());
    // User turns are not embedded by default.
    assert!(history[0].embedding.is_none());
}

#[tokio::test]
async fn second_turn_sees_first_reply_as_context() {
    let (agent, engine, conv) = setup().await;

    let first = agent.handle_turn(&conv, "Tell me about engines").await.unwrap();
    agent.handle_turn(&conv, "And punch cards?").await.unwrap();

    let prompts = engine.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(
        !prompts[0].contains("The interactions so far"),
        "first turn has no prior context"
    );
    assert!(prompts[1].contains("The interactions so far"));
    assert!(
        prompts[1].contains(&first.reply.text),
        "second prompt must carry the first reply"
    );
    assert!(prompts[1].contains("act like Ada Lovelace, precise and curious"));
}

#[tokio::test]
async fn embedding_failure_degrades_but_exchange_is_durable() {
    let (agent, engine, conv) = setup().await;
    engine.fail_embed.store(true, Ordering::SeqCst);

    let outcome = agent.handle_turn(&conv, "Hello").await.unwrap();
    assert!(outcome.degraded);

    let history = agent.get_history(&conv).await.unwrap();
    assert_eq!(history.len(), 2, "both messages persisted despite embed failures");
    assert!(history[1].embedding.is_none(), "reply stored without an embedding");
}

#[tokio::test]
async fn generation_failure_aborts_turn_after_user_persist() {
    let (agent, engine, conv) = setup().await;
    engine.fail_generate.store(true, Ordering::SeqCst);

    let err = agent.handle_turn(&conv, "Hello").await.unwrap_err();
    assert!(matches!(err, KindredError::Generation { .. }));

    // The user message is already durable; only the reply is missing.
    let history = agent.get_history(&conv).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].sender, SenderKind::User);
}

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let (agent, _engine, _conv) = setup().await;
    let ghost = ConversationId("ghost".into());

    let err = agent.handle_turn(&ghost, "hello").await.unwrap_err();
    assert!(matches!(err, KindredError::NotFound { entity: "conversation", .. }));

    let err = agent.get_history(&ghost).await.unwrap_err();
    assert!(matches!(err, KindredError::NotFound { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_turns_in_one_conversation_serialize() {
    let (agent, engine, conv) = setup().await;
    engine.generate_delay_ms.store(30, Ordering::SeqCst);
    let agent = Arc::new(agent);

    let mut handles = Vec::new();
    for i in 0..3 {
        let agent = agent.clone();
        let conv = conv.clone();
        handles.push(tokio::spawn(async move {
            agent.handle_turn(&conv, &format!("message {i}")).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // Serialized turns interleave strictly: each user message is directly
    // followed by its reply, seq gapless from 1.
    let history = agent.get_history(&conv).await.unwrap();
    assert_eq!(history.len(), 6);
    for (i, msg) in history.iter().enumerate() {
        assert_eq!(msg.seq, i as i64 + 1);
        let expected = if i % 2 == 0 { SenderKind::User } else { SenderKind::Bot };
        assert_eq!(msg.sender, expected, "position {i} out of order");
    }
}

#[tokio::test]
async fn reindex_backfills_rows_skipped_by_embed_failures() {
    let (agent, engine, conv) = setup().await;

    // Turn 1 succeeds fully; turn 2's reply goes unembedded.
    agent.handle_turn(&conv, "first").await.unwrap();
    engine.fail_embed.store(true, Ordering::SeqCst);
    agent.handle_turn(&conv, "second").await.unwrap();
    engine.fail_embed.store(false, Ordering::SeqCst);

    // Only the first reply carries an embedding on its ledger row.
    let inserted = agent.reindex(&conv).await.unwrap();
    assert_eq!(inserted, 1);

    // Rebuild is idempotent.
    let inserted_again = agent.reindex(&conv).await.unwrap();
    assert_eq!(inserted_again, 1);
}

#[tokio::test]
async fn embed_user_turns_stores_user_embeddings() {
    let db = Database::open_in_memory().await.unwrap();
    let engine = Arc::new(MockEngine::default());
    let mut config = KindredConfig::default();
    config.memory.embed_user_turns = true;
    let agent = KindredAgent::new(db, engine, &config);
    let (_, conv) = agent
        .create_persona(&UserId("u-1".into()), "Ada", "desc")
        .await
        .unwrap();

    agent.handle_turn(&conv, "remember this").await.unwrap();

    let history = agent.get_history(&conv).await.unwrap();
    assert!(history[0].embedding.is_some(), "user turn embedded when enabled");
    assert!(history[1].embedding.is_some());

    // Both rows replay into the index.
    let inserted = agent.reindex(&conv).await.unwrap();
    assert_eq!(inserted, 2);
}

#[tokio::test]
async fn user_turn_is_never_its_own_context() {
    let db = Database::open_in_memory().await.unwrap();
    let engine = Arc::new(MockEngine::default());
    let mut config = KindredConfig::default();
    config.memory.embed_user_turns = true;
    let agent = KindredAgent::new(db, engine.clone(), &config);
    let (_, conv) = agent
        .create_persona(&UserId("u-1".into()), "Ada", "desc")
        .await
        .unwrap();

    agent.handle_turn(&conv, "remember this").await.unwrap();
    agent.handle_turn(&conv, "what did I say?").await.unwrap();

    let prompts = engine.prompts();
    // First turn of an empty conversation: no transcript section at all,
    // even though the user message gets embedded and indexed.
    assert!(
        !prompts[0].contains("The interactions so far"),
        "a message must not be retrieved as its own context"
    );
    // The indexed user turn is prior context for the *next* turn.
    assert!(prompts[1].contains("User: remember this"));
    assert!(
        !prompts[1].contains("User: what did I say?\n"),
        "the current message appears only as the final turn"
    );
}

#[tokio::test]
async fn fatal_user_embed_failure_never_loses_the_message() {
    let db = Database::open_in_memory().await.unwrap();
    let engine = Arc::new(MockEngine::default());
    let mut config = KindredConfig::default();
    config.memory.embed_user_turns = true;
    let agent = KindredAgent::new(db, engine.clone(), &config);
    let (_, conv) = agent
        .create_persona(&UserId("u-1".into()), "Ada", "desc")
        .await
        .unwrap();

    // Only the user-turn embed (the first embed call of the turn) blows up,
    // and with a fault that is not normally degradable.
    engine.fail_next_embeds_fatal.store(1, Ordering::SeqCst);

    let outcome = agent.handle_turn(&conv, "Hello").await.unwrap();
    assert!(outcome.degraded);

    let history = agent.get_history(&conv).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].embedding.is_none(), "user row persisted without a vector");
    assert!(history[1].embedding.is_some());
}

#[tokio::test]
async fn reply_survives_index_insert_failure() {
    let (agent, _engine, index, conv) = setup_with_flaky_index().await;
    index.fail_insert.store(true, Ordering::SeqCst);

    let outcome = agent.handle_turn(&conv, "Hello").await.unwrap();
    assert!(outcome.degraded);

    // Write-side durability is independent of index health.
    let history = agent.get_history(&conv).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].text, outcome.reply.text);
    assert!(history[1].embedding.is_some(), "ledger row keeps the vector");

    // Once the index recovers, replay backfills the skipped point.
    index.fail_insert.store(false, Ordering::SeqCst);
    let inserted = agent.reindex(&conv).await.unwrap();
    assert_eq!(inserted, 1);
}

#[tokio::test]
async fn unreachable_index_degrades_retrieval_not_the_turn() {
    let (agent, engine, index, conv) = setup_with_flaky_index().await;

    agent.handle_turn(&conv, "first").await.unwrap();
    index.fail_search.store(true, Ordering::SeqCst);

    let outcome = agent.handle_turn(&conv, "second").await.unwrap();
    assert!(outcome.degraded);

    let prompts = engine.prompts();
    assert!(
        !prompts[1].contains("The interactions so far"),
        "retrieval failure must fall back to an empty context"
    );
    let history = agent.get_history(&conv).await.unwrap();
    assert_eq!(history.len(), 4, "the degraded turn still completed");
}

#[tokio::test]
async fn conversations_do_not_share_retrieved_context() {
    let (agent, engine, conv_a) = setup().await;
    let (_, conv_b) = agent
        .create_persona(&UserId("u-1".into()), "Grace", "Grace Hopper, pragmatic")
        .await
        .unwrap();

    agent.handle_turn(&conv_a, "alpha topic").await.unwrap();
    let first_reply = agent.get_history(&conv_a).await.unwrap()[1].text.clone();

    agent.handle_turn(&conv_b, "alpha topic").await.unwrap();

    let prompts = engine.prompts();
    assert!(
        !prompts[1].contains(&first_reply),
        "conversation B must not see conversation A's turns"
    );
    assert!(prompts[1].contains("Grace Hopper"));
}

#[tokio::test]
async fn persona_listing_reflects_creations() {
    let (agent, _engine, _conv) = setup().await;
    agent
        .create_persona(&UserId("u-1".into()), "Grace", "second persona")
        .await
        .unwrap();

    let personas = agent.list_personas(&UserId("u-1".into())).await.unwrap();
    assert_eq!(personas.len(), 2);
    assert_eq!(personas[0].name, "Ada");
    assert_eq!(personas[1].name, "Grace");

    let none = agent.list_personas(&UserId("nobody".into())).await.unwrap();
    assert!(none.is_empty());
}
