use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::application::errors::BotError;
use crate::application::services::BotFacade;
use super::{ExecutionContext, InboundEvent};

/// Category every command falls into unless told otherwise.
pub const DEFAULT_CATEGORY: &str = "general";

/// Category whose commands are owner-restricted by default.
pub const OWNER_CATEGORY: &str = "owner";

/// Executable part of a command.
///
/// Every handler gets the same four arguments; handlers that don't need the
/// context simply ignore it.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        args: &[String],
        ctx: &ExecutionContext,
    ) -> Result<(), BotError>;
}

/// Owned arguments handed to closure-based handlers
pub struct Invocation {
    pub bot: BotFacade,
    pub event: InboundEvent,
    pub args: Vec<String>,
    pub ctx: ExecutionContext,
}

/// Adapts an async closure into a [`CommandHandler`]
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Invocation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BotError>> + Send + 'static,
{
    async fn execute(
        &self,
        bot: &BotFacade,
        event: &InboundEvent,
        args: &[String],
        ctx: &ExecutionContext,
    ) -> Result<(), BotError> {
        (self.0)(Invocation {
            bot: bot.clone(),
            event: event.clone(),
            args: args.to_vec(),
            ctx: ctx.clone(),
        })
        .await
    }
}

/// Represents a bot command
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub usage: Option<String>,
    pub category: String,
    /// Seconds between accepted invocations per chat; `None`/0 = unlimited
    pub cooldown: Option<u64>,
    /// `None` means "inherit from category"
    pub owner_only: Option<bool>,
    pub group_only: bool,
    pub private_only: bool,
    pub admin_only: bool,
    pub handler: Option<Arc<dyn CommandHandler>>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            usage: None,
            category: DEFAULT_CATEGORY.to_string(),
            cooldown: None,
            owner_only: None,
            group_only: false,
            private_only: false,
            admin_only: false,
            handler: None,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown = Some(seconds);
        self
    }

    pub fn owner_only(mut self, value: bool) -> Self {
        self.owner_only = Some(value);
        self
    }

    pub fn group_only(mut self) -> Self {
        self.group_only = true;
        self
    }

    pub fn private_only(mut self) -> Self {
        self.private_only = true;
        self
    }

    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    pub fn with_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(Invocation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BotError>> + Send + 'static,
    {
        self.handler = Some(Arc::new(FnHandler(handler)));
        self
    }

    pub fn with_handler_arc(mut self, handler: Arc<dyn CommandHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Owner restriction after applying the category default.
    pub fn is_owner_only(&self) -> bool {
        self.owner_only
            .unwrap_or_else(|| self.category.eq_ignore_ascii_case(OWNER_CATEGORY))
    }

    /// Cooldown window, if one applies. A configured override wins over the
    /// command's own default, and zero from either means no cooldown.
    pub fn cooldown_window(&self, override_secs: Option<u64>) -> Option<std::time::Duration> {
        override_secs
            .or(self.cooldown)
            .filter(|s| *s > 0)
            .map(std::time::Duration::from_secs)
    }

    /// Name followed by aliases
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("category", &self.category)
            .field("cooldown", &self.cooldown)
            .field("owner_only", &self.is_owner_only())
            .field("group_only", &self.group_only)
            .field("private_only", &self.private_only)
            .field("admin_only", &self.admin_only)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}
