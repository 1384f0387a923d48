// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Comanda.
//!
//! Exposes the order pipeline, conversation history and catalog
//! management as a JSON REST API on axum.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, ServerConfig, router, start_server};
