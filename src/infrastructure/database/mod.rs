//! SQLite-backed store

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::application::errors::StorageError;
use crate::domain::entities::InboundEvent;
use crate::domain::traits::Store;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(path: impl AsRef<Path>) -> SqliteResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> SqliteResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqliteResult<Self> {
        let db = Self { conn: Mutex::new(conn) };
        db.init_tables()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn init_tables(&self) -> SqliteResult<()> {
        let conn = self.conn();
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                chat_id TEXT NOT NULL,
                message_id TEXT NOT NULL,
                payload TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, id)",
            [],
        )?;

        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn save_message(&self, message: &InboundEvent, keep: usize) -> Result<(), StorageError> {
        let payload = serde_json::to_string(message)?;
        let conn = self.conn();
        conn.execute(
            "INSERT INTO messages (chat_id, message_id, payload) VALUES (?1, ?2, ?3)",
            rusqlite::params![message.chat_id, message.id, payload],
        )?;
        // Keep only the newest `keep` rows for this chat
        conn.execute(
            "DELETE FROM messages WHERE chat_id = ?1 AND id NOT IN (
                SELECT id FROM messages WHERE chat_id = ?1 ORDER BY id DESC LIMIT ?2
            )",
            rusqlite::params![message.chat_id, keep as i64],
        )?;
        Ok(())
    }

    async fn get_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<InboundEvent>, StorageError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT payload FROM messages WHERE chat_id = ?1 ORDER BY id DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![chat_id, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;

        let mut messages = Vec::new();
        for payload in rows {
            messages.push(serde_json::from_str(&payload?)?);
        }
        Ok(messages)
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value = self
            .conn()
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, datetime('now'))",
            [key, value],
        )?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.conn().execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        // every write is already committed
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn kv_roundtrip_and_delete() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.get("k").await.unwrap().is_none());
        store.set("k", "v1").await.unwrap();
        store.set("k", "v2").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
        store.delete("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn history_keeps_newest_rows_per_chat() {
        let store = SqliteStore::in_memory().unwrap();
        for i in 0..4 {
            let event = InboundEvent::from_text("a", "me", format!("{i}"));
            store.save_message(&event, 2).await.unwrap();
        }
        store
            .save_message(&InboundEvent::from_text("b", "me", "other"), 2)
            .await
            .unwrap();

        let history = store.get_messages("a", 10).await.unwrap();
        let texts: Vec<_> = history.iter().filter_map(|e| e.text()).collect();
        assert_eq!(texts, vec!["3", "2"]);
        assert_eq!(store.get_messages("b", 10).await.unwrap().len(), 1);
    }
}
