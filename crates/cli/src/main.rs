//! askdb CLI
//!
//! Main entry point for the askdb command-line tool.
//! Answers natural-language questions about the DVD rental database,
//! from the terminal or over Telegram.

mod commands;
mod context;

use askdb_core::{config, config::AppConfig, logging, logging::LogFormat, AppResult};
use clap::{Parser, Subcommand};
use commands::{AskCommand, BotCommand, TrainCommand, TrainingCommand};
use std::path::PathBuf;

/// askdb - ask the DVD rental database in plain English
#[derive(Parser, Debug)]
#[command(name = "askdb")]
#[command(about = "Natural-language questions over the DVD rental database", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "ASKDB_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "ASKDB_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "ASKDB_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "OPENAI_MODEL_NAME")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load the DVD rental training material
    Train(TrainCommand),

    /// Answer one question
    Ask(AskCommand),

    /// Inspect or edit stored training data
    Training(TrainingCommand),

    /// Run the Telegram bot
    Bot(BotCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // A workspace .env fills in variables the process environment leaves unset
    let workspace = cli
        .workspace
        .clone()
        .or_else(|| std::env::var_os("ASKDB_WORKSPACE").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    config::load_dotenv(&workspace.join(".env"))?;

    // Load base configuration; --workspace and --config decide which file is read
    let workspace = cli.workspace.clone();
    let config_file = cli.config.clone();
    let config = AppConfig::load_with(|key| match key {
        "ASKDB_WORKSPACE" => workspace
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| std::env::var(key).ok()),
        "ASKDB_CONFIG" => config_file
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| std::env::var(key).ok()),
        _ => std::env::var(key).ok(),
    })?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_format)?;

    tracing::info!("askdb starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Train(_) => "train",
        Commands::Ask(_) => "ask",
        Commands::Training(_) => "training",
        Commands::Bot(_) => "bot",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = tracing::Instrument::instrument(
        async {
            match &cli.command {
                Commands::Train(cmd) => cmd.execute(&config).await,
                Commands::Ask(cmd) => cmd.execute(&config).await,
                Commands::Training(cmd) => cmd.execute(&config).await,
                Commands::Bot(cmd) => cmd.execute(&config).await,
            }
        },
        span,
    )
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
