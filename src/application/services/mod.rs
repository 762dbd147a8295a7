//! Application services - registry, gating, outbound queue and the handler facade

pub mod bot_facade;
pub mod command_registry;
pub mod cooldown;
pub mod metadata;
pub mod permission;
pub mod send_queue;

pub use bot_facade::BotFacade;
pub use command_registry::CommandRegistry;
pub use cooldown::{CooldownDecision, CooldownTracker};
pub use metadata::MetadataCache;
pub use permission::{DenyReason, PermissionDecision};
pub use send_queue::{QueuedSend, SendQueue};
