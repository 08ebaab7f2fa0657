// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kindred - persona-conditioned conversations with local models.
//!
//! Binary entry point. Commands that only touch storage (persona
//! management, history, reindex) run without loading the models; `send`
//! loads the full engine.

use std::sync::Arc;

use clap::{Parser, Subcommand};

use kindred_agent::KindredAgent;
use kindred_config::KindredConfig;
use kindred_core::{ConversationId, KindredError, Ledger, SenderKind, UserId};
use kindred_engine::LocalEngine;
use kindred_memory::{rebuild_index, SqliteVectorIndex};
use kindred_storage::{queries, Database, SqliteLedger};

/// Kindred - persona-conditioned conversations with local models.
#[derive(Parser, Debug)]
#[command(name = "kindred", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a persona and its initial conversation.
    PersonaAdd {
        /// Owning user id.
        #[arg(long)]
        user: String,
        /// Display name, e.g. "Ada".
        name: String,
        /// Description the model is conditioned to role-play.
        description: String,
    },
    /// List a user's personas.
    Personas {
        /// Owning user id.
        #[arg(long)]
        user: String,
    },
    /// Send one message to a conversation and print the reply.
    Send {
        /// Conversation id.
        conversation: String,
        /// Message text.
        text: String,
    },
    /// Print a conversation's transcript in order.
    History {
        /// Conversation id.
        conversation: String,
    },
    /// Rebuild a conversation's vector index from the ledger.
    Reindex {
        /// Conversation id.
        conversation: String,
    },
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kindred={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match kindred_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            kindred_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.agent.log_level);

    if let Err(e) = run(cli.command, &config).await {
        eprintln!("kindred: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &KindredConfig) -> Result<(), KindredError> {
    let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;

    match command {
        Commands::PersonaAdd { user, name, description } => {
            let (persona, conversation_id) = queries::personas::insert_persona_with_conversation(
                &db,
                &UserId(user),
                &name,
                &description,
            )
            .await?;
            println!("persona {} created ({})", persona.name, persona.id.0);
            println!("conversation {conversation_id}");
        }
        Commands::Personas { user } => {
            let personas = queries::personas::get_personas_for_user(&db, &UserId(user)).await?;
            for persona in personas {
                println!("{}  {}  {}", persona.id.0, persona.name, persona.description);
            }
        }
        Commands::Send { conversation, text } => {
            let engine = LocalEngine::load(&config.engine)?;
            let agent = KindredAgent::new(db.clone(), Arc::new(engine), config);
            let outcome = agent.handle_turn(&ConversationId(conversation), &text).await?;
            if outcome.degraded {
                tracing::warn!("turn completed degraded; see logs above");
            }
            println!("{}", outcome.reply.text);
        }
        Commands::History { conversation } => {
            let conversation_id = ConversationId(conversation);
            if queries::conversations::get_conversation(&db, &conversation_id)
                .await?
                .is_none()
            {
                return Err(KindredError::NotFound {
                    entity: "conversation",
                    id: conversation_id.0,
                });
            }
            let ledger = SqliteLedger::new(db.clone());
            for message in ledger.list(&conversation_id).await? {
                let speaker = match message.sender {
                    SenderKind::User => "user",
                    SenderKind::Bot => "bot ",
                };
                println!("{:>4}  {speaker}  {}", message.seq, message.text);
            }
        }
        Commands::Reindex { conversation } => {
            let conversation_id = ConversationId(conversation);
            let ledger = SqliteLedger::new(db.clone());
            let index = SqliteVectorIndex::new(db.clone());
            let inserted = rebuild_index(&ledger, &index, &conversation_id).await?;
            println!("reindexed {conversation_id}: {inserted} points");
        }
    }

    db.close().await
}
