// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Kindred.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup with actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Kindred configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KindredConfig {
    /// Agent identity and logging settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Local generation/embedding engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Vector memory settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Prompt composition settings.
    #[serde(default)]
    pub prompt: PromptConfig,
}

/// Agent identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent process.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "kindred".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("kindred").join("kindred.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("kindred.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Local generation/embedding engine configuration.
///
/// Model weights are loaded once at startup and shared read-only for the
/// process lifetime.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Directory holding the causal LM `model.onnx` + `tokenizer.json`.
    #[serde(default = "default_generator_dir")]
    pub generator_dir: String,

    /// Directory holding the sentence-embedding `model.onnx` + `tokenizer.json`.
    #[serde(default = "default_embedder_dir")]
    pub embedder_dir: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature. 0.0 is deterministic greedy decoding.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum prompt length in tokens the generator accepts.
    #[serde(default = "default_context_window")]
    pub context_window: usize,

    /// Size of the bounded compute pool for generation/embedding work.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generator_dir: default_generator_dir(),
            embedder_dir: default_embedder_dir(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            context_window: default_context_window(),
            workers: default_workers(),
        }
    }
}

fn default_generator_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("kindred").join("models").join("generator"))
        .unwrap_or_else(|| std::path::PathBuf::from("models/generator"))
        .to_string_lossy()
        .into_owned()
}

fn default_embedder_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("kindred").join("models").join("embedder"))
        .unwrap_or_else(|| std::path::PathBuf::from("models/embedder"))
        .to_string_lossy()
        .into_owned()
}

fn default_max_tokens() -> u32 {
    200
}

fn default_temperature() -> f32 {
    0.6
}

fn default_context_window() -> usize {
    2048
}

fn default_workers() -> usize {
    2
}

/// Vector memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Number of prior turns retrieved per incoming message.
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Also embed and index user turns, not just bot replies.
    #[serde(default)]
    pub embed_user_turns: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            embed_user_turns: false,
        }
    }
}

fn default_top_k() -> usize {
    5
}

/// Prompt composition configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PromptConfig {
    /// Maximum composed prompt size in characters. Retrieved turns are
    /// dropped least-similar-first to meet the budget; persona framing and
    /// the new user message are never truncated.
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

fn default_max_prompt_chars() -> usize {
    6000
}
