//! Group commands

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::application::services::BotFacade;
use crate::domain::entities::{
    bare_number, CommandHandler, ExecutionContext, GroupMetadata, InboundEvent, OutgoingContent, SendOptions,
};

async fn require_metadata(bot: &BotFacade, event: &InboundEvent) -> Result<GroupMetadata, BotError> {
    bot.group_metadata(&event.chat_id)
        .await
        .ok_or_else(|| BotError::NotFound(format!("group metadata for {}", event.chat_id)))
}

/// Subject, size and admins of the current group
pub struct GroupInfoHandler;

#[async_trait]
impl CommandHandler for GroupInfoHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        _args: &[String],
        _ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        let meta = require_metadata(bot, event).await?;

        let mut text = format!("👥 *{}*\nMembers: {}", meta.subject, meta.participants.len());
        if let Some(desc) = meta.description.as_deref().filter(|d| !d.is_empty()) {
            text.push_str(&format!("\n\n{}", desc));
        }

        let admins: Vec<_> = meta.admins().map(|p| p.jid.clone()).collect();
        text.push_str(&format!("\n\nAdmins ({}):", admins.len()));
        for jid in &admins {
            text.push_str(&format!("\n  @{}", bare_number(jid)));
        }

        let options = SendOptions::quoting(event.id.clone()).with_mentions(admins);
        bot.send_message(&event.chat_id, OutgoingContent::Text(text), options).await?;
        Ok(())
    }
}

/// Mentions every participant of the group
pub struct TagAllHandler;

#[async_trait]
impl CommandHandler for TagAllHandler {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        args: &[String],
        _ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        let meta = require_metadata(bot, event).await?;

        let mut text = if args.is_empty() {
            "📢 Attention everyone!".to_string()
        } else {
            format!("📢 {}", args.join(" "))
        };
        text.push('\n');
        for participant in &meta.participants {
            text.push_str(&format!("\n@{}", bare_number(&participant.jid)));
        }

        let mentions = meta.participants.iter().map(|p| p.jid.clone()).collect();
        let options = SendOptions::quoting(event.id.clone()).with_mentions(mentions);
        bot.send_message(&event.chat_id, OutgoingContent::Text(text), options).await?;
        Ok(())
    }
}
