use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, FromArgMatches, Parser, ValueEnum};
use reconcile::{ModCatalog, ModSelection, ReconcileConfig, ReconcileEngine};
use tracing::{info, Level};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "reconcile")]
#[command(about = "Find substitute image assets for a mod that mirrors another mod")]
struct Cli {
    /// Mod defining the required assets
    primary_mod_id: String,
    /// Mod that should provide them
    secondary_mod_id: String,
    /// Further mods searched after the secondary one, in order
    secondary_mod_ids_to_crawl: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Directory holding one subdirectory per mod (overrides the configuration)
    #[arg(short, long)]
    root: Option<PathBuf>,
    /// Which reconciliation to run
    #[arg(short, long, value_enum, default_value_t = Workflow::Crawl)]
    workflow: Workflow,
    /// Build an in-memory index of each searched tree
    #[arg(long)]
    indexed: bool,
    /// Record failed copies as unresolved instead of stopping
    #[arg(long)]
    continue_on_error: bool,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Log file, written in addition to stderr
    #[arg(long, default_value = "crawler.log")]
    log_file: PathBuf,
    /// Print run metrics as JSON instead of a summary line
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Workflow {
    /// Walk the primary tree and fill in missing files
    Crawl,
    /// Fill in portraits referenced by character definitions
    Portraits,
    /// Both, sharing one unresolved report
    All,
}

fn tag_help(catalog: &ModCatalog) -> String {
    let tags: Vec<String> = catalog
        .tag_names()
        .map(|tag| format!("{} ({})", tag, catalog.resolve(tag)))
        .collect();
    format!(
        "Mod arguments accept a workshop id or a tag. Built-in tags: {}. \
         A [mods.tags] table in the configuration file replaces them.",
        tags.join(", ")
    )
}

fn init_logging(level: &str, log_file: &Path) -> Result<WorkerGuard> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("reconcile={}", level)));

    let directory = log_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
    let file_name = log_file
        .file_name()
        .unwrap_or_else(|| std::ffi::OsStr::new("crawler.log"));

    let (non_blocking, guard) = tracing_appender::non_blocking(rolling::never(directory, file_name));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(guard)
}

async fn load_config(cli: &Cli) -> Result<ReconcileConfig> {
    let mut config = match &cli.config {
        Some(path) => ReconcileConfig::load(path)
            .await
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ReconcileConfig::default(),
    };

    if let Some(root) = &cli.root {
        config.game_root = root.clone();
    }
    config.indexed |= cli.indexed;
    config.continue_on_error |= cli.continue_on_error;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Cli::command()
        .after_help(tag_help(&ModCatalog::default()))
        .get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    // Held until exit so buffered log lines reach the file
    let _guard = init_logging(&cli.log_level, &cli.log_file)?;

    let config = load_config(&cli).await?;
    let mods = ModSelection::resolve(
        &config.mods,
        &cli.primary_mod_id,
        &cli.secondary_mod_id,
        &cli.secondary_mod_ids_to_crawl,
    );
    info!(
        "Reconciling {} against {} (crawl: {})",
        mods.primary,
        mods.secondary,
        mods.crawl.join(", ")
    );

    let engine = ReconcileEngine::new(&config)?;
    let metrics = match cli.workflow {
        Workflow::Crawl => engine.run_crawl(&mods).await?,
        Workflow::Portraits => engine.run_portraits(&mods).await?,
        Workflow::All => engine.run_all(&mods).await?,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
    } else {
        println!("{}", metrics.summary());
    }
    Ok(())
}
