//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Send cancelled before it started")]
    Cancelled,

    #[error("Send queue is closed")]
    QueueClosed,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Shorthand for handlers that fail with a plain message.
    pub fn handler(msg: impl Into<String>) -> Self {
        BotError::Handler(msg.into())
    }
}

/// Command registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Malformed command definition
    #[error("Invalid command definition: {0}")]
    Validation(String),

    /// Name or alias already claimed by another command
    #[error("'{token}' is already claimed by command '{owner}'")]
    Conflict { token: String, owner: String },
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(String),
}
