// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and goes through the single
//! background connection.

pub mod messages;
pub mod products;
