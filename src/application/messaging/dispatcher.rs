//! Message dispatcher - Routes inbound events to command handlers
//!
//! One event walks through: content extraction, prefix check, command
//! resolution, cooldown, permission, and finally the handler. Every stop
//! along the way is reported as a [`DispatchOutcome`]; none of them is an
//! error for the caller.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::application::errors::BotError;
use crate::application::services::permission::{self, DenyReason, PermissionDecision};
use crate::application::services::{BotFacade, CommandRegistry, CooldownDecision, CooldownTracker};
use crate::domain::entities::{Command, ExecutionContext, InboundEvent};
use crate::infrastructure::config::SharedConfig;
use super::parser::MessageParser;

/// Shown when a handler fails; details go to the log only.
pub const GENERIC_ERROR_NOTICE: &str = "❌ An error occurred while executing the command.";

pub const TIMEOUT_NOTICE: &str = "⌛ The command took too long and was cancelled.";

/// Where an event's trip through the dispatcher ended
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// No text in the message
    NoContent,
    /// Text without the command prefix
    NotPrefixed,
    /// Prefixed, but the token names no command
    Unresolved { token: String },
    /// Private mode and the sender is neither owner nor admin
    Ignored { command: String },
    CooldownDenied { command: String, remaining: Duration },
    PermissionDenied { command: String, reason: DenyReason },
    Completed { command: String },
    Failed { command: String, error: String },
    TimedOut { command: String },
}

/// Message dispatcher - routes events through gating to handlers
pub struct MessageDispatcher {
    registry: Arc<CommandRegistry>,
    cooldowns: Arc<CooldownTracker>,
    bot: BotFacade,
    config: SharedConfig,
}

impl MessageDispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        cooldowns: Arc<CooldownTracker>,
        bot: BotFacade,
        config: SharedConfig,
    ) -> Self {
        Self {
            registry,
            cooldowns,
            bot,
            config,
        }
    }

    pub fn bot(&self) -> &BotFacade {
        &self.bot
    }

    /// Consume the transport's event stream until it closes. Each event is
    /// handled on its own task, so a slow command never holds up the next
    /// event and a panic stays inside its task.
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<InboundEvent>) {
        tracing::info!("Starting message loop...");
        while let Some(event) = events.recv().await {
            let dispatcher = self.clone();
            tokio::spawn(async move {
                let chat = event.chat_id.clone();
                let outcome = dispatcher.handle_event(event).await;
                tracing::debug!(chat = %chat, ?outcome, "event processed");
            });
        }
        tracing::info!("Inbound event stream closed");
    }

    /// Process a raw text message
    pub async fn process_text(
        &self,
        chat_id: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> DispatchOutcome {
        self.handle_event(InboundEvent::from_text(chat_id, sender, text))
            .await
    }

    /// Run one event through the pipeline
    pub async fn handle_event(&self, event: InboundEvent) -> DispatchOutcome {
        let Some(text) = event.text().map(str::to_owned) else {
            return DispatchOutcome::NoContent;
        };

        self.observe(&event).await;

        let (prefix, private_mode, handler_timeout) = self.config.read(|c| {
            (c.bot.prefix.clone(), c.bot.private_mode, c.handler_timeout())
        });

        let Some(parsed) = MessageParser::new(prefix.as_str()).parse(&text) else {
            return DispatchOutcome::NotPrefixed;
        };

        let Some(command) = self.registry.resolve(&parsed.token) else {
            tracing::debug!(token = %parsed.token, chat = %event.chat_id, "unknown command");
            return DispatchOutcome::Unresolved { token: parsed.token };
        };
        let name = command.name.clone();

        let ctx = self.build_context(&event, command.clone(), parsed.token, prefix).await;

        if private_mode && !(ctx.is_owner || ctx.is_admin) {
            tracing::debug!(command = %name, sender = %event.sender, "ignored in private mode");
            return DispatchOutcome::Ignored { command: name };
        }

        let cooldown_override = self.config.read(|c| c.cooldown_override(&name));
        if let Some(window) = command.cooldown_window(cooldown_override) {
            if let CooldownDecision::Denied { remaining } =
                self.cooldowns.check(&name, &event.chat_id, window)
            {
                tracing::debug!(command = %name, chat = %event.chat_id, ?remaining, "cooldown active");
                let notice = format!(
                    "⏳ Please wait {:.1} seconds before using {}{} again.",
                    remaining.as_secs_f64(),
                    ctx.prefix,
                    name
                );
                self.notify(&event, notice).await;
                return DispatchOutcome::CooldownDenied { command: name, remaining };
            }
        }

        if let PermissionDecision::Denied(reason) = permission::evaluate(&command, &ctx) {
            tracing::debug!(command = %name, sender = %event.sender, %reason, "permission denied");
            self.notify(&event, reason.notice()).await;
            return DispatchOutcome::PermissionDenied { command: name, reason };
        }

        self.execute(event, parsed.args, ctx, handler_timeout).await
    }

    async fn execute(
        &self,
        event: InboundEvent,
        args: Vec<String>,
        ctx: ExecutionContext,
        timeout: Duration,
    ) -> DispatchOutcome {
        let command = ctx.command.clone();
        let name = command.name.clone();
        let Some(handler) = command.handler.clone() else {
            tracing::error!(command = %name, "registered command has no handler");
            return DispatchOutcome::Failed { command: name, error: "no handler".into() };
        };

        tracing::info!(
            command = %name,
            sender = %event.sender,
            chat = %event.chat_id,
            args = args.len(),
            "executing command"
        );

        let usage = ctx.usage();
        let bot = self.bot.clone();
        let task_event = event.clone();
        let mut task = tokio::spawn(async move {
            handler.execute(&bot, &task_event, &args, &ctx).await
        });

        match tokio::time::timeout(timeout, &mut task).await {
            Ok(Ok(Ok(()))) => DispatchOutcome::Completed { command: name },
            Ok(Ok(Err(BotError::InvalidArgs(reason)))) => {
                tracing::debug!(command = %name, sender = %event.sender, "invalid arguments: {}", reason);
                self.notify(&event, format!("⚠️ {}\nUsage: {}", reason, usage)).await;
                DispatchOutcome::Failed { command: name, error: reason }
            }
            Ok(Ok(Err(e))) => {
                tracing::error!(
                    command = %name,
                    sender = %event.sender,
                    chat = %event.chat_id,
                    "command failed: {}",
                    e
                );
                self.notify(&event, GENERIC_ERROR_NOTICE).await;
                DispatchOutcome::Failed { command: name, error: e.to_string() }
            }
            Ok(Err(join_error)) => {
                tracing::error!(
                    command = %name,
                    sender = %event.sender,
                    chat = %event.chat_id,
                    "command panicked: {}",
                    join_error
                );
                self.notify(&event, GENERIC_ERROR_NOTICE).await;
                DispatchOutcome::Failed { command: name, error: join_error.to_string() }
            }
            Err(_) => {
                task.abort();
                tracing::warn!(
                    command = %name,
                    sender = %event.sender,
                    chat = %event.chat_id,
                    ?timeout,
                    "command timed out"
                );
                self.notify(&event, TIMEOUT_NOTICE).await;
                DispatchOutcome::TimedOut { command: name }
            }
        }
    }

    async fn build_context(
        &self,
        event: &InboundEvent,
        command: Arc<Command>,
        invoked_as: String,
        prefix: String,
    ) -> ExecutionContext {
        let is_group = event.is_group();
        let is_owner = event.from_me || self.config.read(|c| c.is_owner(&event.sender));
        let is_admin = if is_group {
            self.bot
                .group_metadata(&event.chat_id)
                .await
                .is_some_and(|meta| meta.is_admin(&event.sender))
        } else {
            false
        };

        ExecutionContext {
            is_group,
            is_private: !is_group,
            is_owner,
            is_admin,
            sender: event.sender.clone(),
            chat_id: event.chat_id.clone(),
            command,
            invoked_as,
            prefix,
        }
    }

    /// Bookkeeping for every message with content: history and push names.
    async fn observe(&self, event: &InboundEvent) {
        if let Some(name) = &event.push_name {
            self.bot.metadata().remember_name(&event.sender, name).await;
        }

        let limit = self.config.read(|c| c.dispatch.history_limit);
        if limit == 0 {
            return;
        }
        if let Some(store) = self.bot.store() {
            if let Err(e) = store.save_message(event, limit).await {
                tracing::warn!(chat = %event.chat_id, "failed to record history: {}", e);
            }
        }
    }

    /// Reply with a notice; a failed send is logged and otherwise ignored.
    async fn notify(&self, event: &InboundEvent, text: impl Into<String>) {
        if let Err(e) = self.bot.reply_text(event, text).await {
            tracing::warn!(chat = %event.chat_id, "failed to deliver notice: {}", e);
        }
    }
}
