//! wa-dispatch - command dispatch core for a WhatsApp bot
//!
//! Inbound chat events are parsed for a command prefix, resolved against
//! the [`CommandRegistry`](application::services::CommandRegistry), gated
//! by cooldowns and permissions, and handed to a handler. Every outbound
//! message goes through a paced FIFO send queue.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod commands;
