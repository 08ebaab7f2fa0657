// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter traits at the seams of the conversation core.
//!
//! The turn orchestrator only ever sees these traits, which is what makes
//! it testable against in-memory fakes and lets the backing stores be
//! swapped without touching the control loop.

pub mod engine;
pub mod index;
pub mod ledger;

pub use engine::GenerationAdapter;
pub use index::VectorIndex;
pub use ledger::Ledger;
