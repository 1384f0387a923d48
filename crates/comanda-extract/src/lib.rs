// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extraction for Comanda: relative date resolution, the function
//! declaration offered to the backend, and tolerant interpretation of what
//! comes back.

pub mod interpreter;
pub mod schema;
pub mod temporal;

pub use interpreter::{Interpretation, interpret, interpret_payload};
pub use schema::{EXTRACTION_FUNCTION, extraction_function};
pub use temporal::{Resolution, TemporalContext, resolve};
