//! Message handling - Event-driven message processing

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{DispatchOutcome, MessageDispatcher};
pub use parser::{MessageParser, ParsedCommand};
