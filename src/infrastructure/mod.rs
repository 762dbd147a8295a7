//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: JSON file persistence
//! - Database: SQLite persistence
//! - Commands: Command manifests and hot reload
//! - Adapters: Transport integrations (console)

pub mod config;
pub mod storage;
pub mod database;
pub mod commands;
pub mod adapters;
