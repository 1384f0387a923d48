// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Comanda integration tests.
//!
//! Provides a scripted backend and a harness over temp SQLite for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - Mock language backend with scripted replies
//! - [`TestHarness`] - Pipeline wired to the mock backend and temp storage

pub mod harness;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockProvider, extraction_call};
