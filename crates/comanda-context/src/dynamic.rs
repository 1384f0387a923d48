// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dynamic zone: stored history with an optional sliding window.

use comanda_core::{ChatTurn, Role};

/// Selects which stored turns go into the next request.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicZone {
    max_history_turns: Option<usize>,
}

impl DynamicZone {
    pub fn new(max_history_turns: Option<usize>) -> Self {
        Self { max_history_turns }
    }

    /// Drop stored system turns, then keep the most recent window, in order.
    ///
    /// A cut window never opens on an assistant reply whose user turn fell
    /// outside it, so an odd limit may yield one turn fewer.
    pub fn window(&self, history: Vec<ChatTurn>) -> Vec<ChatTurn> {
        let turns: Vec<ChatTurn> = history
            .into_iter()
            .filter(|t| t.role != Role::System)
            .collect();
        match self.max_history_turns {
            Some(max) if turns.len() > max => turns[turns.len() - max..]
                .iter()
                .skip_while(|t| t.role == Role::Assistant)
                .cloned()
                .collect(),
            _ => turns,
        }
    }
}
