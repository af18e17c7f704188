pub mod chat_db;
pub mod database;

pub use chat_db::ChatDatabase;

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::common::{ChatMessage, Participant};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store connection lock poisoned")]
    LockPoisoned,

    #[error("failed to prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Document-style persistence used by the presence tracker and the message
/// board. Each call is a single-row operation; nothing spans documents.
pub trait ChatStore: Send + Sync {
    fn find_participant(&self, name: &str) -> StoreResult<Option<Participant>>;

    fn list_participants(&self) -> StoreResult<Vec<Participant>>;

    /// Returns `false` when a participant with the same name already exists.
    fn insert_participant(&self, participant: &Participant) -> StoreResult<bool>;

    /// Returns `false` when no participant matched `name`.
    fn update_heartbeat(&self, name: &str, last_heartbeat: i64) -> StoreResult<bool>;

    /// Delete `name` only if its heartbeat still equals `observed_heartbeat`.
    fn remove_participant_if_unchanged(
        &self,
        name: &str,
        observed_heartbeat: i64,
    ) -> StoreResult<bool>;

    fn insert_message(&self, message: &ChatMessage) -> StoreResult<()>;

    /// All messages, oldest first.
    fn list_messages(&self) -> StoreResult<Vec<ChatMessage>>;

    fn find_message(&self, id: &str) -> StoreResult<Option<ChatMessage>>;

    /// Overwrite recipient, body and kind of the message with the same id.
    fn update_message(&self, message: &ChatMessage) -> StoreResult<bool>;

    fn delete_message(&self, id: &str) -> StoreResult<bool>;
}

/// Ensure the directory holding `path` exists
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
