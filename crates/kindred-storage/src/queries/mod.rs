// SPDX-FileCopyrightText: 2026 Kindred Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQL query modules, one per table family.

pub mod conversations;
pub mod messages;
pub mod personas;
