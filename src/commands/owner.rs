//! Owner commands

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::application::services::BotFacade;
use crate::domain::entities::{bare_number, CommandHandler, ExecutionContext, InboundEvent};
use crate::infrastructure::config::Config;

/// Reads and changes the live configuration.
///
/// ```text
/// config                      show current settings
/// config prefix <p>           change the command prefix
/// config private-mode on|off  toggle private mode
/// config owner add <number>   add an owner
/// config owner remove <number>
/// ```
pub struct ConfigHandler;

impl ConfigHandler {
    fn summary(config: &Config) -> String {
        let owners = if config.bot.owners.is_empty() {
            "(none)".to_string()
        } else {
            config.bot.owners.join(", ")
        };
        format!(
            "⚙️ *Configuration*\nPrefix: {}\nPrivate mode: {}\nOwners: {}",
            config.bot.prefix,
            if config.bot.private_mode { "on" } else { "off" },
            owners
        )
    }

    fn parse_switch(value: &str) -> Result<bool, BotError> {
        match value.to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            other => Err(BotError::InvalidArgs(format!("expected on/off, got '{}'", other))),
        }
    }

    fn apply(bot: &BotFacade, args: &[String]) -> Result<String, BotError> {
        let key = args.first().map(|a| a.to_lowercase());
        match (key.as_deref(), &args[args.len().min(1)..]) {
            (None, _) | (Some("show"), _) => Ok(bot.config().read(Self::summary)),
            (Some("prefix"), [prefix]) => {
                let prefix = prefix.clone();
                bot.config().update(|c| c.bot.prefix = prefix.clone())?;
                Ok(format!("✅ Prefix set to {}", prefix))
            }
            (Some("private-mode"), [value]) => {
                let enabled = Self::parse_switch(value)?;
                bot.config().update(|c| c.bot.private_mode = enabled)?;
                Ok(format!("✅ Private mode {}", if enabled { "enabled" } else { "disabled" }))
            }
            (Some("owner"), [action, number]) => {
                let number = bare_number(number);
                if number.is_empty() {
                    return Err(BotError::InvalidArgs("owner must be a phone number".into()));
                }
                match action.to_lowercase().as_str() {
                    "add" => {
                        let added = bot.config().update(|c| {
                            if c.bot.owners.iter().any(|o| bare_number(o) == number) {
                                false
                            } else {
                                c.bot.owners.push(number.clone());
                                true
                            }
                        })?;
                        Ok(if added {
                            format!("✅ Added owner {}", number)
                        } else {
                            format!("{} is already an owner", number)
                        })
                    }
                    "remove" => {
                        let removed = bot.config().update(|c| {
                            let before = c.bot.owners.len();
                            c.bot.owners.retain(|o| bare_number(o) != number);
                            before != c.bot.owners.len()
                        })?;
                        Ok(if removed {
                            format!("✅ Removed owner {}", number)
                        } else {
                            format!("{} is not an owner", number)
                        })
                    }
                    other => Err(BotError::InvalidArgs(format!("unknown owner action '{}'", other))),
                }
            }
            (Some(other), _) => Err(BotError::InvalidArgs(format!("unknown setting '{}'", other))),
        }
    }
}

#[async_trait]
impl CommandHandler for ConfigHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        args: &[String],
        _ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        let text = match Self::apply(bot, args) {
            Ok(text) => text,
            // a rejected value is the user's mistake, not a failure
            Err(BotError::Config(e)) => format!("⚠️ {}", e),
            Err(e) => return Err(e),
        };
        tracing::info!(sender = %event.sender, "config command: {}", args.join(" "));
        bot.reply_text(event, text).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switches_accept_common_spellings() {
        assert!(ConfigHandler::parse_switch("ON").unwrap());
        assert!(!ConfigHandler::parse_switch("off").unwrap());
        assert!(ConfigHandler::parse_switch("maybe").is_err());
    }

    #[test]
    fn summary_lists_owners() {
        let mut config = Config::default();
        config.bot.owners = vec!["62811".into(), "62822".into()];
        let text = ConfigHandler::summary(&config);
        assert!(text.contains("Prefix: !"));
        assert!(text.contains("62811, 62822"));
        assert!(text.contains("Private mode: off"));
    }
}
