//! File-based storage implementation

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::StorageError;
use crate::domain::entities::InboundEvent;
use crate::domain::traits::Store;

const KV_FILE: &str = "kv.json";
const HISTORY_FILE: &str = "history.json";

/// JSON file-based store. Everything lives in memory and is written to
/// `base_path` on [`Store::flush`].
pub struct JsonStore {
    base_path: PathBuf,
    messages: Arc<RwLock<HashMap<String, VecDeque<InboundEvent>>>>,
    kv: Arc<RwLock<HashMap<String, String>>>,
}

impl JsonStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            messages: Arc::new(RwLock::new(HashMap::new())),
            kv: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create the directory and load whatever a previous run flushed
    pub async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        if let Some(kv) = self.read_file::<HashMap<String, String>>(KV_FILE).await? {
            *self.kv.write().await = kv;
        }
        if let Some(history) = self
            .read_file::<HashMap<String, VecDeque<InboundEvent>>>(HISTORY_FILE)
            .await?
        {
            *self.messages.write().await = history;
        }
        Ok(())
    }

    async fn read_file<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<Option<T>, StorageError> {
        let path = self.base_path.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_file<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let path = self.base_path.join(name);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(value)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonStore {
    async fn save_message(&self, message: &InboundEvent, keep: usize) -> Result<(), StorageError> {
        let mut messages = self.messages.write().await;
        let chat = messages.entry(message.chat_id.clone()).or_default();
        chat.push_back(message.clone());
        while chat.len() > keep {
            chat.pop_front();
        }
        Ok(())
    }

    async fn get_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<InboundEvent>, StorageError> {
        let messages = self.messages.read().await;
        match messages.get(chat_id) {
            Some(msgs) => Ok(msgs.iter().rev().take(limit).cloned().collect()),
            None => Ok(Vec::new()),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let kv = self.kv.read().await;
        Ok(kv.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        kv.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut kv = self.kv.write().await;
        kv.remove(key);
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        {
            let kv = self.kv.read().await;
            self.write_file(KV_FILE, &*kv).await?;
        }
        let messages = self.messages.read().await;
        self.write_file(HISTORY_FILE, &*messages).await?;
        tracing::debug!("Flushed store to {}", self.base_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_is_bounded_and_newest_first() {
        let store = JsonStore::new("unused");
        for i in 0..5 {
            let event = InboundEvent::from_text("chat", "me", format!("msg {i}"));
            store.save_message(&event, 3).await.unwrap();
        }
        let history = store.get_messages("chat", 10).await.unwrap();
        let texts: Vec<_> = history.iter().filter_map(|e| e.text()).collect();
        assert_eq!(texts, vec!["msg 4", "msg 3", "msg 2"]);
        assert!(store.get_messages("other", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn flush_then_init_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store.init().await.unwrap();
        store.set("greeting", "hello").await.unwrap();
        store
            .save_message(&InboundEvent::from_text("chat", "me", "!ping"), 10)
            .await
            .unwrap();
        store.flush().await.unwrap();

        let reopened = JsonStore::new(dir.path());
        reopened.init().await.unwrap();
        assert_eq!(reopened.get("greeting").await.unwrap().as_deref(), Some("hello"));
        assert_eq!(reopened.get_messages("chat", 1).await.unwrap().len(), 1);

        reopened.delete("greeting").await.unwrap();
        assert!(reopened.get("greeting").await.unwrap().is_none());
    }
}
