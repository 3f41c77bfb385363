//! aiverify - plugin registry and lifecycle manager for the AI Verify portal.
//!
//! Usage:
//!   aiverify validate DIR     Validate a plugin directory
//!   aiverify install DIR      Install or update a staged plugin
//!   aiverify delete GID       Delete an installed plugin
//!   aiverify list             Show the whole registry
//!   aiverify show GID         Show one plugin or component
//!   aiverify sweep            Register every plugin already on disk
//!   aiverify --help           Show help

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use strum::IntoEnumIterator;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use aiverify_core::{ComponentKind, PluginError, PortalConfig, Registry, WidgetStatus};
use aiverify_plugin::{PluginManager, RegistryEntry, SweepReport};
use aiverify_store::RedisStore;
use aiverify_validate::PluginValidator;

#[derive(Parser)]
#[command(
    name = "aiverify",
    version,
    about = "Plugin registry and lifecycle manager for the AI Verify portal",
    long_about = "aiverify validates, installs and removes AI Verify plugins and keeps \
                  the Redis plugin registry in sync with the plugins directory.\n\n\
                  Log verbosity follows RUST_LOG (default: info)."
)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the plugins root directory
    #[arg(long, global = true)]
    plugin_root: Option<PathBuf>,

    /// Override the Redis connection URL
    #[arg(long, global = true)]
    redis_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a plugin directory without installing it
    Validate {
        /// Plugin directory
        dir: PathBuf,
    },

    /// Install or update the plugin staged in a directory
    Install {
        /// Staged plugin directory (moved under the plugins root)
        dir: PathBuf,
    },

    /// Delete an installed plugin
    Delete {
        /// Plugin gid
        gid: String,

        /// Do not announce deleted algorithms
        #[arg(long)]
        quiet: bool,
    },

    /// List every installed plugin and component
    List {
        /// Only list plugin metadata and component ids
        #[arg(long)]
        no_populate: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show one plugin or component by gid
    Show {
        /// Plugin gid or fully-qualified component gid
        gid: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Register every plugin directory under the plugins root
    Sweep {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling running checks");
            on_interrupt.cancel();
        }
    });

    // Validation never touches the registry.
    if let Command::Validate { dir } = &cli.command {
        let validator = PluginValidator::from_config(&config, cancel)?;
        let meta = validator
            .validate(dir)
            .await
            .wrap_err_with(|| format!("{} is not a valid plugin", dir.display()))?;
        println!("{} {} is valid", meta.gid, meta.version);
        return Ok(());
    }

    let store = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await
            .wrap_err_with(|| format!("Failed to connect to {}", config.redis_url))?,
    );
    let manager = PluginManager::from_config(config, store.clone(), store.clone(), cancel)?;

    let result = run(&manager, cli.command).await;
    drop(manager);
    if let Some(store) = Arc::into_inner(store) {
        store.disconnect();
    }
    result
}

fn load_config(cli: &Cli) -> Result<PortalConfig> {
    let mut config = match &cli.config {
        Some(path) => PortalConfig::load(path).context("Failed to load config")?,
        None => PortalConfig::default(),
    };
    if let Some(root) = &cli.plugin_root {
        config.plugin_root = root.clone();
    }
    if let Some(url) = &cli.redis_url {
        config.redis_url = url.clone();
    }
    Ok(config)
}

async fn run(manager: &PluginManager, command: Command) -> Result<()> {
    match command {
        Command::Validate { .. } => Ok(()),
        Command::Install { dir } => run_install(manager, dir).await,
        Command::Delete { gid, quiet } => {
            let plugin = manager.delete(&gid, !quiet).await?;
            println!(
                "Deleted {} {} ({} components)",
                plugin.gid(),
                plugin.meta.version,
                plugin.component_ids.len()
            );
            Ok(())
        }
        Command::List { no_populate, format } => {
            let registry = manager.get_all(!no_populate).await?;
            match format {
                OutputFormat::Text => print_registry(&registry),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&registry)?),
            }
            Ok(())
        }
        Command::Show { gid, format } => {
            let entry = manager
                .get_by_gid(&gid)
                .await?
                .ok_or(PluginError::NotFound { gid })?;
            match format {
                OutputFormat::Text => print_entry(&entry),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entry)?),
            }
            Ok(())
        }
        Command::Sweep { format } => {
            let report = run_with_progress(manager, manager.sweep()).await?;
            match format {
                OutputFormat::Text => print_sweep(&report),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            }
            Ok(())
        }
    }
}

async fn run_install(manager: &PluginManager, dir: PathBuf) -> Result<()> {
    eprintln!("Installing {}...", dir.display());
    let plugin = run_with_progress(manager, manager.install(&dir)).await?;

    println!(
        "Installed {} {} ({} components) at {}",
        plugin.gid(),
        plugin.meta.version,
        plugin.component_ids.len(),
        manager.plugin_path(plugin.gid())?.display()
    );
    for widget in &plugin.report_widgets {
        if widget.status == WidgetStatus::MissingDependencies {
            eprintln!("warning: widget {} has unmet dependencies", widget.base.gid);
        }
    }
    Ok(())
}

/// Drive `task` while echoing scan progress to stderr.
async fn run_with_progress<T>(
    manager: &PluginManager,
    task: impl std::future::Future<Output = Result<T, PluginError>>,
) -> Result<T> {
    let mut progress = manager.scanner().subscribe();
    tokio::pin!(task);
    loop {
        tokio::select! {
            result = &mut task => return Ok(result?),
            Ok(update) = progress.recv() => {
                tracing::debug!(
                    gid = %update.plugin_gid,
                    scanned = update.components_scanned,
                    path = %update.current_path.display(),
                    "scan progress"
                );
            }
        }
    }
}

fn print_registry(registry: &Registry) {
    println!("{}", "─".repeat(60));
    println!(
        " {} plugins, {} components",
        registry.plugins.len(),
        registry.component_count()
    );
    println!("{}", "─".repeat(60));

    for plugin in &registry.plugins {
        let stock = if plugin.is_stock { " [stock]" } else { "" };
        println!("{} {} - {}{}", plugin.gid(), plugin.meta.version, plugin.meta.name, stock);
        for kind in ComponentKind::iter() {
            let ids = plugin.component_ids.get(kind);
            if !ids.is_empty() {
                println!("  {:<12} {}", kind.type_name(), ids.join(", "));
            }
        }
    }

    let broken: Vec<_> = registry
        .report_widgets
        .iter()
        .filter(|w| w.status == WidgetStatus::MissingDependencies)
        .collect();
    if !broken.is_empty() {
        println!();
        println!("{} widget(s) with unmet dependencies:", broken.len());
        for widget in broken {
            let missing: Vec<_> = widget
                .dependencies
                .iter()
                .filter(|d| !d.valid)
                .map(|d| d.gid.as_str())
                .collect();
            println!("  {} -> {}", widget.base.gid, missing.join(", "));
        }
    }
}

fn print_entry(entry: &RegistryEntry) {
    match entry {
        RegistryEntry::Plugin(plugin) => {
            println!("{} {} - {}", plugin.gid(), plugin.meta.version, plugin.meta.name);
            if let Some(author) = &plugin.meta.author {
                println!("  author: {author}");
            }
            if let Some(description) = &plugin.meta.description {
                println!("  {description}");
            }
            println!("  installed: {}", format_installed(plugin.installed_at));
            for widget in &plugin.report_widgets {
                println!("  widget      {} ({:?})", widget.base.gid, widget.status);
            }
            for block in &plugin.input_blocks {
                println!("  inputBlock  {}", block.base.gid);
            }
            for algo in &plugin.algorithms {
                println!("  algorithm   {}", algo.base.gid);
            }
            for template in &plugin.templates {
                println!("  template    {}", template.base.gid);
            }
        }
        RegistryEntry::Component(component) => {
            let base = component.base();
            println!("{} {} - {}", base.gid, component.kind().type_name(), base.name);
            println!("  plugin: {} {}", base.plugin_gid, base.version);
            if let Some(description) = &base.description {
                println!("  {description}");
            }
        }
    }
}

fn print_sweep(report: &SweepReport) {
    println!("Registered {} plugin(s)", report.installed.len());
    for gid in &report.installed {
        println!("  {gid}");
    }
    if !report.is_clean() {
        println!("{} director(ies) skipped:", report.failed.len());
        for failure in &report.failed {
            println!("  {}: {}", failure.path.display(), failure.reason);
        }
    }
}

fn format_installed(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
