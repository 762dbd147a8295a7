//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use crate::application::errors::ConfigError;
use crate::domain::entities::bare_number;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub queue: QueueConfig,
    pub dispatch: DispatchConfig,
    pub commands: CommandsConfig,
    pub session: SessionConfig,
    pub adapters: AdaptersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub prefix: String,
    /// Bare phone numbers of the bot owners
    pub owners: Vec<String>,
    /// Only owners and group admins get responses
    pub private_mode: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "wa-dispatch".to_string(),
            prefix: "!".to_string(),
            owners: Vec::new(),
            private_mode: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct QueueConfig {
    pub min_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { min_interval_ms: 1000 }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DispatchConfig {
    pub handler_timeout_secs: u64,
    pub metadata_timeout_secs: u64,
    pub metadata_ttl_secs: u64,
    /// Messages kept per chat in the history store
    pub history_limit: usize,
    pub cooldown_sweep_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            handler_timeout_secs: 60,
            metadata_timeout_secs: 10,
            metadata_ttl_secs: 300,
            history_limit: 50,
            cooldown_sweep_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CommandsConfig {
    /// Directory scanned for command manifests
    pub directory: PathBuf,
    /// Re-scan the directory periodically
    pub watch: bool,
    pub reload_interval_secs: u64,
    /// Per-command cooldown overrides in seconds
    pub cooldowns: BTreeMap<String, u64>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./commands"),
            watch: true,
            reload_interval_secs: 5,
            cooldowns: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SessionConfig {
    pub path: PathBuf,
    pub storage: StorageBackend,
    pub reconnect_delay_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./session"),
            storage: StorageBackend::Json,
            reconnect_delay_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdaptersConfig {
    pub console: Option<ConsoleConfig>,
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            console: Some(ConsoleConfig::default()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    pub enabled: bool,
    /// Chat the console pretends to be; use a `@g.us` id to simulate a group
    pub chat_id: String,
    pub sender: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chat_id: "console@s.whatsapp.net".to_string(),
            sender: "console@s.whatsapp.net".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Io(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the config back as YAML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), yaml)
            .map_err(|e| ConfigError::Io(format!("Failed to write config: {}", e)))
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            if !prefix.is_empty() {
                config.bot.prefix = prefix;
            }
        }

        if let Ok(owners) = std::env::var("BOT_OWNERS") {
            config.bot.owners = owners
                .split(',')
                .map(bare_number)
                .filter(|n| !n.is_empty())
                .collect();
        }

        if let Ok(path) = std::env::var("BOT_SESSION_PATH") {
            config.session.path = PathBuf::from(path);
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefix.is_empty() {
            return Err(ConfigError::MissingField("bot.prefix".into()));
        }
        if self.bot.prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidValue(format!(
                "bot.prefix '{}' must not contain whitespace",
                self.bot.prefix
            )));
        }
        if self.dispatch.handler_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "dispatch.handler-timeout-secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Check whether a JID or number belongs to an owner
    pub fn is_owner(&self, id: &str) -> bool {
        let number = bare_number(id);
        !number.is_empty() && self.bot.owners.iter().any(|o| bare_number(o) == number)
    }

    /// Cooldown configured for a command in `commands.cooldowns`, if any
    pub fn cooldown_override(&self, command: &str) -> Option<u64> {
        self.commands.cooldowns.get(&command.to_lowercase()).copied()
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.queue.min_interval_ms)
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.handler_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch.metadata_timeout_secs)
    }

    pub fn metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.dispatch.metadata_ttl_secs)
    }
}

/// Live configuration shared between the dispatcher and the `config`
/// command. Updates are validated, then written back to the file the
/// config was loaded from.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    inner: Arc<RwLock<Config>>,
    path: Option<Arc<PathBuf>>,
}

impl SharedConfig {
    pub fn new(config: Config, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
            path: path.map(Arc::new),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Config) -> R) -> R {
        let config = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&config)
    }

    pub fn snapshot(&self) -> Config {
        self.read(Config::clone)
    }

    pub fn prefix(&self) -> String {
        self.read(|c| c.bot.prefix.clone())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    /// Apply `f` to a copy, validate it, persist it, then publish it.
    /// Nothing changes if validation or the write fails.
    pub fn update<R>(&self, f: impl FnOnce(&mut Config) -> R) -> Result<R, ConfigError> {
        let mut next = self.snapshot();
        let out = f(&mut next);
        next.validate()?;
        if let Some(path) = self.path() {
            next.save(path)?;
            tracing::info!("Saved config to {}", path.display());
        }
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = next;
        Ok(out)
    }
}

impl From<Config> for SharedConfig {
    fn from(config: Config) -> Self {
        Self::new(config, None)
    }
}
