//! Domain layer - Core types with no knowledge of transports or storage
//! 
//! This layer contains:
//! - Entities: Events, outbound payloads, commands, execution context
//! - Traits: Abstractions for infrastructure (Transport, Store)

pub mod entities;
pub mod traits;
