//! General commands available to everyone

use async_trait::async_trait;
use chrono::Utc;

use crate::application::errors::BotError;
use crate::application::services::BotFacade;
use crate::domain::entities::{CommandHandler, ExecutionContext, InboundEvent, OWNER_CATEGORY};

/// Replies with the time between the message being sent and handled
pub struct PingHandler;

#[async_trait]
impl CommandHandler for PingHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        _args: &[String],
        _ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        let latency = (Utc::now() - event.timestamp).num_milliseconds().max(0);
        bot.reply_text(event, format!("🏓 Pong! Latency: {}ms", latency)).await?;
        Ok(())
    }
}

/// Command list by category, or details of one command
pub struct HelpHandler;

impl HelpHandler {
    fn menu(bot: &BotFacade, ctx: &ExecutionContext) -> String {
        let name = bot.config().read(|c| c.bot.name.clone());
        let mut help = format!("📋 *{} commands*\n", name);

        for category in bot.registry().categories() {
            if category == OWNER_CATEGORY && !ctx.is_owner {
                continue;
            }
            help.push_str(&format!("\n*{}*\n", capitalize(&category)));
            for cmd in bot.registry().list_by_category(&category) {
                help.push_str(&format!(
                    "  {}{} - {}\n",
                    ctx.prefix,
                    cmd.name,
                    cmd.description.as_deref().unwrap_or("")
                ));
            }
        }

        help.push_str(&format!("\nType {}help <command> for details.", ctx.prefix));
        help
    }

    fn detail(bot: &BotFacade, ctx: &ExecutionContext, token: &str) -> String {
        let token = token.trim_start_matches(ctx.prefix.as_str());
        let Some(cmd) = bot.registry().resolve(token) else {
            return format!("Command {}{} not found", ctx.prefix, token);
        };

        let mut help = format!(
            "*{}{}* - {}",
            ctx.prefix,
            cmd.name,
            cmd.description.as_deref().unwrap_or("No description")
        );
        if !cmd.aliases.is_empty() {
            help.push_str(&format!("\nAliases: {}", cmd.aliases.join(", ")));
        }
        if let Some(usage) = &cmd.usage {
            help.push_str(&format!("\nUsage: {}{}", ctx.prefix, usage));
        }
        if let Some(secs) = cmd.cooldown.filter(|s| *s > 0) {
            help.push_str(&format!("\nCooldown: {}s", secs));
        }
        help.push_str(&format!("\nCategory: {}", cmd.category));
        help
    }
}

#[async_trait]
impl CommandHandler for HelpHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        args: &[String],
        ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        let text = match args.first() {
            Some(token) => Self::detail(bot, ctx, token),
            None => Self::menu(bot, ctx),
        };
        bot.reply_text(event, text).await?;
        Ok(())
    }
}

/// Uptime, registry size and queue depth
pub struct InfoHandler;

#[async_trait]
impl CommandHandler for InfoHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        _args: &[String],
        _ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        let info = bot.transport_info();
        let name = bot.config().read(|c| c.bot.name.clone());
        let text = format!(
            "🤖 *{}* v{}\nPlatform: {}\nUptime: {}\nCommands: {}\nQueued sends: {}",
            name,
            env!("CARGO_PKG_VERSION"),
            info.platform,
            format_duration(bot.uptime()),
            bot.registry().len(),
            bot.queue().pending()
        );
        bot.reply_text(event, text).await?;
        Ok(())
    }
}

/// Reacts to the invoking message, 👍 unless an emoji is given
pub struct ReactHandler;

#[async_trait]
impl CommandHandler for ReactHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        args: &[String],
        _ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        let emoji = args.first().map(String::as_str).unwrap_or("👍");
        bot.react(event, emoji).await?;
        Ok(())
    }
}

/// Repeats its arguments
pub struct EchoHandler;

#[async_trait]
impl CommandHandler for EchoHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        args: &[String],
        _ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        if args.is_empty() {
            return Err(BotError::InvalidArgs("Nothing to echo".into()));
        }
        bot.reply_text(event, args.join(" ")).await?;
        Ok(())
    }
}

/// Last messages stored for this chat
pub struct HistoryHandler;

const DEFAULT_HISTORY_COUNT: usize = 10;

#[async_trait]
impl CommandHandler for HistoryHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        args: &[String],
        _ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        let Some(store) = bot.store() else {
            bot.reply_text(event, "History is not enabled.").await?;
            return Ok(());
        };

        let limit = bot.config().read(|c| c.dispatch.history_limit);
        let count = match args.first() {
            Some(n) => n
                .parse::<usize>()
                .map_err(|_| BotError::InvalidArgs(format!("'{}' is not a number", n)))?,
            None => DEFAULT_HISTORY_COUNT,
        }
        .clamp(1, limit.max(1));

        // skip the invoking message itself
        let mut messages = store.get_messages(&event.chat_id, count + 1).await?;
        messages.retain(|m| m.id != event.id);
        messages.truncate(count);

        if messages.is_empty() {
            bot.reply_text(event, "No messages recorded yet.").await?;
            return Ok(());
        }

        let mut text = format!("🕘 Last {} messages:\n", messages.len());
        for message in messages.iter().rev() {
            let who = match &message.push_name {
                Some(name) => name.clone(),
                None => crate::domain::entities::bare_number(&message.sender),
            };
            text.push_str(&format!(
                "\n[{}] {}: {}",
                message.timestamp.format("%H:%M"),
                who,
                message.text().unwrap_or("")
            ));
        }
        bot.reply_text(event, text).await?;
        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    let (days, hours, minutes, seconds) = (secs / 86_400, secs % 86_400 / 3600, secs % 3600 / 60, secs % 60);
    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn durations_drop_leading_zero_units() {
        assert_eq!(format_duration(Duration::from_secs(42)), "42s");
        assert_eq!(format_duration(Duration::from_secs(3_725)), "1h 2m 5s");
        assert_eq!(format_duration(Duration::from_secs(90_061)), "1d 1h 1m 1s");
    }

    #[test]
    fn capitalizes_category_names() {
        assert_eq!(capitalize("general"), "General");
        assert_eq!(capitalize(""), "");
    }
}
