use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result as SqlResult, Row, params};
use std::path::Path;

use super::database::Database;
use super::{ChatStore, StoreResult, ensure_parent_dir};
use crate::common::{ChatMessage, MessageKind, Participant};

pub const DEFAULT_DATABASE_PATH: &str = "data/chat.db";

const MESSAGE_COLUMNS: &str = "id, sender, recipient, body, kind, timestamp";

/// SQLite-backed store for participants and messages
pub struct ChatDatabase {
    db: Database,
}

impl ChatDatabase {
    /// Initialize chat database at custom path, creating parent directories
    pub fn with_path<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        ensure_parent_dir(path.as_ref())?;
        let db = Database::new(path)?;
        let chat_db = Self { db };
        chat_db.init_schema()?;
        Ok(chat_db)
    }

    pub fn in_memory() -> StoreResult<Self> {
        let db = Database::in_memory()?;
        let chat_db = Self { db };
        chat_db.init_schema()?;
        Ok(chat_db)
    }

    fn init_schema(&self) -> StoreResult<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS participants (
                    name TEXT PRIMARY KEY,
                    last_heartbeat INTEGER NOT NULL
                )",
                [],
            )?;

            // seq keeps insertion order independent of the textual timestamp
            conn.execute(
                "CREATE TABLE IF NOT EXISTS messages (
                    seq INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    sender TEXT NOT NULL,
                    recipient TEXT NOT NULL,
                    body TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    timestamp TEXT NOT NULL
                )",
                [],
            )?;

            conn.execute(
                "CREATE INDEX IF NOT EXISTS idx_participants_last_heartbeat
                 ON participants(last_heartbeat)",
                [],
            )?;

            Ok(())
        })
    }
}

fn participant_from_row(row: &Row<'_>) -> SqlResult<Participant> {
    Ok(Participant {
        name: row.get(0)?,
        last_heartbeat: row.get(1)?,
    })
}

fn message_from_row(row: &Row<'_>) -> SqlResult<ChatMessage> {
    let kind: String = row.get(4)?;
    let kind = kind
        .parse::<MessageKind>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(err)))?;

    Ok(ChatMessage {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        body: row.get(3)?,
        kind,
        timestamp: row.get(5)?,
    })
}

fn query_messages(conn: &Connection, sql: &str) -> SqlResult<Vec<ChatMessage>> {
    let mut stmt = conn.prepare(sql)?;
    let messages = stmt
        .query_map([], message_from_row)?
        .collect::<SqlResult<Vec<_>>>()?;
    Ok(messages)
}

impl ChatStore for ChatDatabase {
    // ========== Participants ==========

    fn find_participant(&self, name: &str) -> StoreResult<Option<Participant>> {
        self.db.with_connection(|conn| {
            conn.query_row(
                "SELECT name, last_heartbeat FROM participants WHERE name = ?1",
                params![name],
                participant_from_row,
            )
            .optional()
        })
    }

    fn list_participants(&self) -> StoreResult<Vec<Participant>> {
        self.db.with_connection(|conn| {
            let mut stmt =
                conn.prepare("SELECT name, last_heartbeat FROM participants ORDER BY rowid ASC")?;
            let participants = stmt
                .query_map([], participant_from_row)?
                .collect::<SqlResult<Vec<_>>>()?;
            Ok(participants)
        })
    }

    fn insert_participant(&self, participant: &Participant) -> StoreResult<bool> {
        self.db.with_connection(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO participants (name, last_heartbeat) VALUES (?1, ?2)",
                params![participant.name, participant.last_heartbeat],
            )?;
            Ok(inserted == 1)
        })
    }

    fn update_heartbeat(&self, name: &str, last_heartbeat: i64) -> StoreResult<bool> {
        self.db.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE participants SET last_heartbeat = ?1 WHERE name = ?2",
                params![last_heartbeat, name],
            )?;
            Ok(updated == 1)
        })
    }

    fn remove_participant_if_unchanged(
        &self,
        name: &str,
        observed_heartbeat: i64,
    ) -> StoreResult<bool> {
        self.db.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM participants WHERE name = ?1 AND last_heartbeat = ?2",
                params![name, observed_heartbeat],
            )?;
            Ok(removed == 1)
        })
    }

    // ========== Messages ==========

    fn insert_message(&self, message: &ChatMessage) -> StoreResult<()> {
        self.db.with_connection(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender, recipient, body, kind, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    message.id,
                    message.sender,
                    message.recipient,
                    message.body,
                    message.kind.as_str(),
                    message.timestamp
                ],
            )?;
            Ok(())
        })
    }

    fn list_messages(&self) -> StoreResult<Vec<ChatMessage>> {
        self.db.with_connection(|conn| {
            query_messages(
                conn,
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages ORDER BY seq ASC"),
            )
        })
    }

    fn find_message(&self, id: &str) -> StoreResult<Option<ChatMessage>> {
        self.db.with_connection(|conn| {
            conn.query_row(
                &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
                params![id],
                message_from_row,
            )
            .optional()
        })
    }

    fn update_message(&self, message: &ChatMessage) -> StoreResult<bool> {
        self.db.with_connection(|conn| {
            let updated = conn.execute(
                "UPDATE messages SET recipient = ?1, body = ?2, kind = ?3 WHERE id = ?4",
                params![
                    message.recipient,
                    message.body,
                    message.kind.as_str(),
                    message.id
                ],
            )?;
            Ok(updated == 1)
        })
    }

    fn delete_message(&self, id: &str) -> StoreResult<bool> {
        self.db.with_connection(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", params![id])?;
            Ok(deleted == 1)
        })
    }
}
