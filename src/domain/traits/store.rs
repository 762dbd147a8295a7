use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::InboundEvent;

/// Store trait - abstraction for data persistence
#[async_trait]
pub trait Store: Send + Sync {
    // Message history
    async fn save_message(&self, message: &InboundEvent, keep: usize) -> Result<(), StorageError>;
    /// Most recent first
    async fn get_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<InboundEvent>, StorageError>;

    // Key-value operations
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Write any buffered state to durable storage
    async fn flush(&self) -> Result<(), StorageError>;
}
