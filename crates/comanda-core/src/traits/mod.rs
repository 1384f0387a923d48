// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the order pipeline's collaborators.
//!
//! Backend adapters extend the [`PluginAdapter`] base trait. Stores are plain
//! `Send + Sync` traits so tests can substitute in-memory versions. All use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod catalog;
pub mod conversation;
pub mod provider;

pub use adapter::PluginAdapter;
pub use catalog::CatalogStore;
pub use conversation::ConversationStore;
pub use provider::ProviderAdapter;
