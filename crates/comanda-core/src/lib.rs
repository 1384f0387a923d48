// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Comanda.
//!
//! This crate holds the order data model (chat turns, line items, extracted
//! orders, catalog products), the error type shared by every crate, and the
//! adapter traits the pipeline talks to: the language backend, the
//! conversation store and the catalog store. It performs no I/O.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ComandaError, ErrorKind};
pub use types::{
    AdapterType, BackendReply, CatalogProduct, ChatTurn, ConversationSummary, ExtractedOrder,
    FunctionCall, FunctionSchema, HealthStatus, LineItem, MatchPredicates, NewProduct,
    ProviderRequest, ProviderResponse, Role, TokenUsage, Volume,
};

pub use traits::{CatalogStore, ConversationStore, PluginAdapter, ProviderAdapter};
