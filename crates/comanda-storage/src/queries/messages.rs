// SPDX-FileCopyrightText: 2026 Comanda Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation turn log.

use std::str::FromStr;

use comanda_core::{ChatTurn, ComandaError, ConversationSummary, Role};
use rusqlite::params;

use crate::database::{Database, map_tr_err, now_timestamp};

/// Append a turn, creating the conversation row on first use.
pub async fn append_message(
    db: &Database,
    conversation_id: &str,
    turn: &ChatTurn,
) -> Result<(), ComandaError> {
    append_messages(db, conversation_id, std::slice::from_ref(turn)).await
}

/// Append several turns in one transaction: either all are stored or none.
pub async fn append_messages(
    db: &Database,
    conversation_id: &str,
    turns: &[ChatTurn],
) -> Result<(), ComandaError> {
    let conversation_id = conversation_id.to_string();
    let rows: Vec<(String, String)> = turns
        .iter()
        .map(|t| (t.role.to_string(), t.content.clone()))
        .collect();
    let now = now_timestamp();

    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO conversations (id, created_at, updated_at) VALUES (?1, ?2, ?2)
                 ON CONFLICT(id) DO UPDATE SET updated_at = excluded.updated_at",
                params![conversation_id, now],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO messages (conversation_id, role, content, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                )?;
                for (role, content) in &rows {
                    stmt.execute(params![conversation_id, role, content, now])?;
                }
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// All turns of a conversation in append order.
pub async fn get_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<ChatTurn>, ComandaError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ChatTurn>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT role, content FROM messages
                 WHERE conversation_id = ?1 ORDER BY id ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                let role: String = row.get(0)?;
                let role = Role::from_str(&role).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        0,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?;
                Ok(ChatTurn {
                    role,
                    content: row.get(1)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Known conversations, most recently active first.
pub async fn list_conversations(db: &Database) -> Result<Vec<ConversationSummary>, ComandaError> {
    db.connection()
        .call(|conn| -> Result<Vec<ConversationSummary>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT c.id, COUNT(m.id), c.updated_at
                 FROM conversations c LEFT JOIN messages m ON m.conversation_id = c.id
                 GROUP BY c.id ORDER BY c.updated_at DESC, c.id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok(ConversationSummary {
                    id: row.get(0)?,
                    turn_count: row.get(1)?,
                    last_activity: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
