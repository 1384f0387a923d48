// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Order pipeline for Comanda.
//!
//! The [`OrderPipeline`] is the central coordinator for a user turn:
//! - Assembles the conversation through [`comanda_context`]
//! - Calls the language backend with the extraction function
//! - Interprets the reply into an [`comanda_core::ExtractedOrder`]
//! - Persists the turn pair
//! - Resolves the order against the catalog with [`CatalogMatcher`]

pub mod matcher;
pub mod pipeline;

pub use matcher::{CatalogMatcher, ItemMatch, MatchOutcome, first_match};
pub use pipeline::{OrderPipeline, PipelineSettings, TurnOutcome};
