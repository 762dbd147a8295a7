use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use wa_dispatch::application::errors::{BotError, StorageError};
use wa_dispatch::application::messaging::MessageDispatcher;
use wa_dispatch::application::services::{BotFacade, CommandRegistry, CooldownTracker, MetadataCache, SendQueue};
use wa_dispatch::commands;
use wa_dispatch::domain::traits::{Store, Transport};
use wa_dispatch::infrastructure::adapters::ConsoleTransport;
use wa_dispatch::infrastructure::commands::CommandLoader;
use wa_dispatch::infrastructure::config::{Config, SharedConfig, StorageBackend};
use wa_dispatch::infrastructure::database::SqliteStore;
use wa_dispatch::infrastructure::storage::JsonStore;

#[derive(Parser)]
#[command(name = "wa-dispatch")]
#[command(about = "Command dispatch core for a WhatsApp bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
    /// List registered commands by category
    #[command(name = "commands")]
    ListCommands,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => run_bot(&cli.config),
        Commands::Version => {
            println!("wa-dispatch v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
        Commands::ListCommands => list_commands(&cli.config),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

/// Config from the file when it exists, otherwise from the environment.
/// Only a config that came from a file is written back on change.
fn load_config(path: &Path) -> SharedConfig {
    if path.exists() {
        match Config::load(path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                return SharedConfig::new(config, Some(path.to_path_buf()));
            }
            Err(e) => tracing::warn!("Failed to load config: {}, using defaults", e),
        }
    }
    SharedConfig::from(Config::load_env())
}

async fn open_store(config: &Config) -> Result<Arc<dyn Store>, BotError> {
    let path = &config.session.path;
    match config.session.storage {
        StorageBackend::Json => {
            let store = JsonStore::new(path);
            store.init().await?;
            tracing::info!("Using JSON store at {}", path.display());
            Ok(Arc::new(store))
        }
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(path).map_err(StorageError::from)?;
            let db_path = path.join("store.db");
            let store = SqliteStore::new(&db_path).map_err(StorageError::from)?;
            tracing::info!("Using SQLite store at {}", db_path.display());
            Ok(Arc::new(store))
        }
    }
}

fn run_bot(config_path: &Path) -> Result<(), BotError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| BotError::Internal(format!("failed to start runtime: {}", e)))?;
    rt.block_on(run(load_config(config_path)))
}

async fn run(config: SharedConfig) -> Result<(), BotError> {
    let snapshot = config.snapshot();
    tracing::info!("Starting {} (prefix '{}')", snapshot.bot.name, snapshot.bot.prefix);

    let console = snapshot
        .adapters
        .console
        .clone()
        .filter(|c| c.enabled)
        .ok_or_else(|| BotError::Internal("no transport enabled in adapters".into()))?;

    let store = open_store(&snapshot).await?;

    // Commands: built-ins first, then manifests
    let registry = Arc::new(CommandRegistry::new());
    commands::register_builtins(&registry)?;
    let mut loader = CommandLoader::new(snapshot.commands.directory.clone(), commands::catalog());
    let report = loader.reload(&registry);
    tracing::info!(
        "Loaded {} command manifests from {} ({} skipped)",
        report.added.len(),
        loader.dir().display(),
        report.skipped.len()
    );

    let transport: Arc<dyn Transport> = Arc::new(ConsoleTransport::new(console));
    let queue = Arc::new(SendQueue::new(snapshot.min_interval()));
    let metadata = Arc::new(MetadataCache::new(
        transport.clone(),
        snapshot.metadata_ttl(),
        snapshot.metadata_timeout(),
    ));
    let bot = BotFacade::new(transport.clone(), queue.clone(), metadata.clone(), registry.clone(), config.clone())
        .with_store(store.clone());
    let cooldowns = Arc::new(CooldownTracker::new());
    let dispatcher = Arc::new(MessageDispatcher::new(registry.clone(), cooldowns.clone(), bot, config.clone()));

    let mut background = Vec::new();

    let sweep_every = Duration::from_secs(snapshot.dispatch.cooldown_sweep_secs.max(1));
    background.push(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_every);
        loop {
            ticker.tick().await;
            let purged = cooldowns.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired cooldowns removed");
            }
            let forgotten = metadata.purge_expired().await;
            if forgotten > 0 {
                tracing::debug!(forgotten, "expired contact names removed");
            }
        }
    }));

    if snapshot.commands.watch {
        let reload_every = Duration::from_secs(snapshot.commands.reload_interval_secs.max(1));
        let registry = registry.clone();
        background.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(reload_every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let report = loader.reload(&registry);
                if !report.is_empty() {
                    tracing::info!(
                        added = report.added.len(),
                        updated = report.updated.len(),
                        removed = report.removed.len(),
                        skipped = report.skipped.len(),
                        "command manifests reloaded"
                    );
                }
            }
        }));
    }

    let events = transport.start().await?;
    tracing::info!("{} ready with {} commands", snapshot.bot.name, registry.len());

    tokio::select! {
        _ = dispatcher.clone().run(events) => tracing::info!("Event stream ended"),
        _ = shutdown_signal() => tracing::info!("Shutdown signal received"),
    }

    // Stop accepting work, then persist and close the session
    for task in background {
        task.abort();
    }
    queue.shutdown().await;
    if let Err(e) = store.flush().await {
        tracing::error!("Failed to flush store: {}", e);
    }
    transport.stop().await?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.ok();
    }
}

fn init_config() -> Result<(), BotError> {
    let yaml = serde_yaml::to_string(&Config::default())
        .map_err(|e| BotError::Internal(format!("failed to serialize config: {}", e)))?;
    println!("{}", yaml);
    Ok(())
}

fn list_commands(config_path: &Path) -> Result<(), BotError> {
    let config = load_config(config_path).snapshot();
    let registry = CommandRegistry::new();
    commands::register_builtins(&registry)?;
    CommandLoader::new(config.commands.directory.clone(), commands::catalog()).reload(&registry);

    for category in registry.categories() {
        println!("{}:", category);
        for cmd in registry.list_by_category(&category) {
            let aliases = if cmd.aliases.is_empty() {
                String::new()
            } else {
                format!(" ({})", cmd.aliases.join(", "))
            };
            println!(
                "  {}{}{} - {}",
                config.bot.prefix,
                cmd.name,
                aliases,
                cmd.description.as_deref().unwrap_or("")
            );
        }
    }
    Ok(())
}
