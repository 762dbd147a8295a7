//! Built-in commands
//!
//! The handlers here are registered at startup and are also the catalog
//! that command manifests pick their `execute` handler from.

pub mod general;
pub mod group;
pub mod owner;

use std::sync::Arc;

use crate::application::errors::RegistryError;
use crate::application::services::CommandRegistry;
use crate::domain::entities::{Command, CommandHandler, OWNER_CATEGORY};
use crate::infrastructure::commands::HandlerCatalog;

pub use general::{EchoHandler, HelpHandler, HistoryHandler, InfoHandler, PingHandler, ReactHandler};
pub use group::{GroupInfoHandler, TagAllHandler};
pub use owner::ConfigHandler;

/// Every built-in handler by the name manifests refer to it with
pub fn catalog() -> HandlerCatalog {
    let mut catalog = HandlerCatalog::new();
    let handlers: [(&str, Arc<dyn CommandHandler>); 9] = [
        ("ping", Arc::new(PingHandler)),
        ("help", Arc::new(HelpHandler)),
        ("info", Arc::new(InfoHandler)),
        ("react", Arc::new(ReactHandler)),
        ("echo", Arc::new(EchoHandler)),
        ("history", Arc::new(HistoryHandler)),
        ("groupinfo", Arc::new(GroupInfoHandler)),
        ("tagall", Arc::new(TagAllHandler)),
        ("config", Arc::new(ConfigHandler)),
    ];
    for (name, handler) in handlers {
        catalog.insert(name, handler);
    }
    catalog
}

/// The commands registered at startup
pub fn builtins() -> Vec<Command> {
    vec![
        Command::new("ping")
            .with_description("Check that the bot is alive")
            .with_handler_arc(Arc::new(PingHandler)),
        Command::new("help")
            .with_aliases(["menu"])
            .with_description("List commands or show details of one")
            .with_usage("help [command]")
            .with_handler_arc(Arc::new(HelpHandler)),
        Command::new("info")
            .with_description("Bot uptime and status")
            .with_handler_arc(Arc::new(InfoHandler)),
        Command::new("react")
            .with_description("React to your message")
            .with_usage("react [emoji]")
            .with_handler_arc(Arc::new(ReactHandler)),
        Command::new("history")
            .with_description("Show recent messages of this chat")
            .with_usage("history [count]")
            .with_cooldown(10)
            .with_handler_arc(Arc::new(HistoryHandler)),
        Command::new("groupinfo")
            .with_aliases(["gcinfo"])
            .with_description("Show group details")
            .with_category("group")
            .group_only()
            .with_handler_arc(Arc::new(GroupInfoHandler)),
        Command::new("tagall")
            .with_aliases(["everyone"])
            .with_description("Mention every member")
            .with_usage("tagall [message]")
            .with_category("group")
            .with_cooldown(30)
            .group_only()
            .admin_only()
            .with_handler_arc(Arc::new(TagAllHandler)),
        Command::new("config")
            .with_aliases(["cfg"])
            .with_description("Show or change bot settings")
            .with_usage("config [prefix <p> | private-mode on|off | owner add|remove <number>]")
            .with_category(OWNER_CATEGORY)
            .with_handler_arc(Arc::new(ConfigHandler)),
    ]
}

/// Register the built-ins. Returns how many were added.
pub fn register_builtins(registry: &CommandRegistry) -> Result<usize, RegistryError> {
    let commands = builtins();
    let count = commands.len();
    for command in commands {
        registry.register(command)?;
    }
    tracing::info!("Registered {} built-in commands", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_register_without_conflicts() {
        let registry = CommandRegistry::new();
        let count = register_builtins(&registry).unwrap();
        assert_eq!(registry.len(), count);
        assert_eq!(registry.resolve("menu").unwrap().name, "help");
        assert!(registry.resolve("config").unwrap().is_owner_only());
    }

    #[test]
    fn catalog_covers_every_builtin() {
        let catalog = catalog();
        for command in builtins() {
            assert!(catalog.get(&command.name).is_some(), "{} missing", command.name);
        }
    }
}
