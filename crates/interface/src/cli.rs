//! CLI - Command Line Interface
//!
//! Available Commands:
//! - taskboard board                          - Show columns and their tasks
//! - taskboard move <id> <column> [--from C]  - Move a task to another column
//! - taskboard clock-in <id>                  - Move a task into the clock column
//! - taskboard clock-out <id> [--to C]        - Move a task out of the clock column
//! - taskboard tracked <id>                   - Show recorded intervals
//! - taskboard init-config [--force]          - Write the default configuration
//!
//! The vault is a directory of markdown documents; task lines are edited in place.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use taskboard_core::{BoardConfig, ConfigError};
use taskboard_runtime::{Board, BoardError, MarkdownTaskSource, Notifier, SharedTaskSource};
use taskboard_storage::{FsDocumentStore, SharedDocumentStore};

use crate::render;

/// Vault-local configuration file name
pub const VAULT_CONFIG_FILE: &str = ".taskboard.yaml";

/// CLI Errors
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Vault directory not found: {0}")]
    VaultNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Board(#[from] BoardError),

    #[error("Configuration already exists at {0} (use --force to overwrite)")]
    ConfigExists(PathBuf),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// CLI Configuration
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Vault directory
    pub vault: PathBuf,

    /// Explicit configuration file
    pub config_path: Option<PathBuf>,

    /// Verbose output
    pub verbose: bool,

    /// Output format
    pub output_format: OutputFormat,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            vault: PathBuf::from("."),
            config_path: None,
            verbose: false,
            output_format: OutputFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

/// Kanban board over markdown task lines
#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Vault directory
    #[arg(short = 'd', long, global = true)]
    pub vault: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Show columns and their tasks
    Board,

    /// Move a task to another column
    Move(MoveArgs),

    /// Move a task into the clock column
    ClockIn(TaskArgs),

    /// Move a task out of the clock column
    ClockOut(ClockOutArgs),

    /// Show the intervals recorded for a task
    Tracked(TaskArgs),

    /// Write the default configuration into the vault
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug)]
pub(crate) struct TaskArgs {
    /// Task id as shown by `board`
    pub task_id: String,
}

#[derive(Args, Debug)]
pub(crate) struct MoveArgs {
    /// Task id as shown by `board`
    pub task_id: String,

    /// Target column
    pub target: String,

    /// Source column (defaults to the task's current column)
    #[arg(long)]
    pub from: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ClockOutArgs {
    /// Task id as shown by `board`
    pub task_id: String,

    /// Column to move to (defaults to the first column)
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct InitConfigArgs {
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Prints notices to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn notify(&self, message: &str) {
        eprintln!("notice: {}", message);
    }
}

/// Parse CLI arguments and execute commands
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    let config = CliConfig {
        vault: cli.vault.unwrap_or_else(|| PathBuf::from(".")),
        config_path: cli.config,
        verbose: cli.verbose,
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
    };

    init_tracing(config.verbose);

    match cli.command {
        Commands::Board => cmd_board(&config).await,
        Commands::Move(args) => cmd_move(args, &config).await,
        Commands::ClockIn(args) => cmd_clock_in(args, &config).await,
        Commands::ClockOut(args) => cmd_clock_out(args, &config).await,
        Commands::Tracked(args) => cmd_tracked(args, &config).await,
        Commands::InitConfig(args) => cmd_init_config(args, &config),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    // Already installed when embedded in a host that set its own subscriber
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn cmd_board(config: &CliConfig) -> Result<(), CliError> {
    let board = open_board(config).await?;
    let columns = board.columns().await;
    match config.output_format {
        OutputFormat::Pretty => print!("{}", render::board(&columns)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&columns)?),
    }
    Ok(())
}

async fn cmd_move(args: MoveArgs, config: &CliConfig) -> Result<(), CliError> {
    let board = open_board(config).await?;
    let report = board
        .move_task(&args.task_id, args.from.as_deref(), &args.target)
        .await?;
    board.settle().await;
    print_report(&render::ReportView::from(&report), config)
}

async fn cmd_clock_in(args: TaskArgs, config: &CliConfig) -> Result<(), CliError> {
    let board = open_board(config).await?;
    let report = board.clock_in(&args.task_id).await?;
    board.settle().await;
    print_report(&render::ReportView::from(&report), config)
}

async fn cmd_clock_out(args: ClockOutArgs, config: &CliConfig) -> Result<(), CliError> {
    let board = open_board(config).await?;
    let report = board.clock_out(&args.task_id, args.to.as_deref()).await?;
    board.settle().await;
    print_report(&render::ReportView::from(&report), config)
}

async fn cmd_tracked(args: TaskArgs, config: &CliConfig) -> Result<(), CliError> {
    let board = open_board(config).await?;
    let tracked = board.tracked_time(&args.task_id).await?;
    match config.output_format {
        OutputFormat::Pretty => print!("{}", render::tracked(&tracked)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tracked)?),
    }
    Ok(())
}

fn cmd_init_config(args: InitConfigArgs, config: &CliConfig) -> Result<(), CliError> {
    let path = write_default_config(&config.vault, args.force)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn print_report(report: &render::ReportView, config: &CliConfig) -> Result<(), CliError> {
    match config.output_format {
        OutputFormat::Pretty => print!("{}", report.pretty()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

/// Load configuration, build the board over the vault and ingest it
async fn open_board(config: &CliConfig) -> Result<Board, CliError> {
    if !config.vault.is_dir() {
        return Err(CliError::VaultNotFound(config.vault.clone()));
    }

    let board_config = discover_config(&config.vault, config.config_path.as_deref())?;
    let store: SharedDocumentStore = Arc::new(FsDocumentStore::new(&config.vault));
    let source: SharedTaskSource = Arc::new(MarkdownTaskSource::new(store.clone()));

    let board = Board::new(board_config, store, Some(source), Arc::new(StderrNotifier));
    let count = board.refresh().await;
    info!("Loaded {} tasks from {}", count, config.vault.display());
    Ok(board)
}

/// Configuration lookup: explicit file, vault file, user config dir, defaults
pub fn discover_config(vault: &Path, explicit: Option<&Path>) -> Result<BoardConfig, CliError> {
    let user_file = dirs::config_dir().map(|dir| dir.join("taskboard").join("board.yaml"));
    discover_config_in(vault, explicit, user_file.as_deref())
}

pub(crate) fn discover_config_in(
    vault: &Path,
    explicit: Option<&Path>,
    user_file: Option<&Path>,
) -> Result<BoardConfig, CliError> {
    if let Some(path) = explicit {
        debug!("Using configuration {}", path.display());
        return Ok(BoardConfig::load(path)?);
    }

    let vault_file = vault.join(VAULT_CONFIG_FILE);
    let candidates = std::iter::once(vault_file.as_path()).chain(user_file);
    for path in candidates {
        if path.is_file() {
            debug!("Using configuration {}", path.display());
            return Ok(BoardConfig::load(path)?);
        }
    }

    debug!("No configuration file found, using defaults");
    Ok(BoardConfig::default())
}

/// Write the default configuration to `<vault>/.taskboard.yaml`
pub fn write_default_config(vault: &Path, force: bool) -> Result<PathBuf, CliError> {
    if !vault.is_dir() {
        return Err(CliError::VaultNotFound(vault.to_path_buf()));
    }

    let path = vault.join(VAULT_CONFIG_FILE);
    if path.exists() && !force {
        return Err(CliError::ConfigExists(path));
    }

    let yaml = BoardConfig::default().to_yaml()?;
    std::fs::write(&path, yaml).map_err(|source| CliError::Io {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
