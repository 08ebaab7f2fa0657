// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports the XDG hierarchy: `./kindred.toml` > `~/.config/kindred/kindred.toml`
//! > `/etc/kindred/kindred.toml` with environment variable overrides via the
//! `KINDRED_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::KindredConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kindred/kindred.toml` (system-wide)
/// 3. `~/.config/kindred/kindred.toml` (user XDG config)
/// 4. `./kindred.toml` (local directory)
/// 5. `KINDRED_*` environment variables
pub fn load_config() -> Result<KindredConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KindredConfig::default()))
        .merge(Toml::file("/etc/kindred/kindred.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kindred/kindred.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kindred.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<KindredConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KindredConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KindredConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KindredConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` so underscore-containing
/// key names stay unambiguous: `KINDRED_PROMPT_MAX_PROMPT_CHARS` must map to
/// `prompt.max_prompt_chars`, not `prompt.max.prompt.chars`.
fn env_provider() -> Env {
    Env::prefixed("KINDRED_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: KINDRED_STORAGE_DATABASE_PATH -> "storage_database_path"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("agent_", "agent.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("engine_", "engine.", 1)
            .replacen("memory_", "memory.", 1)
            .replacen("prompt_", "prompt.", 1);
        mapped.into()
    })
}
