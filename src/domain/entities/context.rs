use std::sync::Arc;

use super::Command;

/// Resolved facts about one command invocation. Built by the dispatcher,
/// read-only to handlers.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub is_group: bool,
    pub is_private: bool,
    pub is_owner: bool,
    pub is_admin: bool,
    pub sender: String,
    pub chat_id: String,
    pub command: Arc<Command>,
    /// Token the user typed (the name or one of the aliases)
    pub invoked_as: String,
    pub prefix: String,
}

impl ExecutionContext {
    /// Usage line with the live prefix applied
    pub fn usage(&self) -> String {
        match &self.command.usage {
            Some(usage) => format!("{}{}", self.prefix, usage),
            None => format!("{}{}", self.prefix, self.command.name),
        }
    }
}
