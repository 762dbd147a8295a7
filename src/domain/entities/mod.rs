//! Domain entities - Core business objects

pub mod user;
pub mod message;
pub mod command;
pub mod context;

pub use user::{bare_number, GroupMetadata, Participant};
pub use message::{InboundEvent, MediaSource, MessageContent, OutgoingContent, SendOptions};
pub use command::{Command, CommandHandler, FnHandler, Invocation, DEFAULT_CATEGORY, OWNER_CATEGORY};
pub use context::ExecutionContext;
