// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for Comanda.
//!
//! Stores the append-only conversation log and the product catalog. All
//! access is serialized through tokio-rusqlite's single background thread;
//! the schema is managed by refinery embedded migrations.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;
