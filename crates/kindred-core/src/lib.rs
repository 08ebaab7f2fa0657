// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kindred conversation system.
//!
//! This crate provides the foundational trait definitions, error type, and
//! domain types used throughout the Kindred workspace. Storage, memory,
//! and engine crates implement the traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::KindredError;
pub use types::{
    ConversationId, IndexHit, Message, MessageId, Persona, PersonaId, SenderKind, TurnPayload,
    UserId,
};

pub use traits::{GenerationAdapter, Ledger, VectorIndex};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_cover_taxonomy() {
        let _not_found = KindredError::NotFound {
            entity: "conversation",
            id: "c-1".into(),
        };
        let _storage = KindredError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _index = KindredError::Index { message: "test".into() };
        let _dim = KindredError::DimensionMismatch { expected: 384, got: 2 };
        let _generation = KindredError::Generation { message: "test".into() };
        let _embedding = KindredError::Embedding { message: "test".into() };
        let _config = KindredError::Config("test".into());
        let _internal = KindredError::Internal("test".into());
    }

    #[test]
    fn traits_are_object_safe() {
        // The orchestrator holds these as Arc<dyn Trait>; this compiles only
        // if all three stay object-safe.
        fn _ledger(_: &dyn Ledger) {}
        fn _index(_: &dyn VectorIndex) {}
        fn _engine(_: &dyn GenerationAdapter) {}
    }

    #[test]
    fn id_newtypes_are_hashable() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ConversationId("c-1".into()));
        set.insert(ConversationId("c-1".into()));
        assert_eq!(set.len(), 1);
    }
}
