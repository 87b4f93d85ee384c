mod commands;
mod config;
mod logging;
mod sink;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tracetap",
    version,
    about = "Incremental extractor for LangSmith run/trace records"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an extraction, emitting records as JSON lines
    Run {
        /// Path to extractor config YAML file
        config: PathBuf,
        /// Write records to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate config and API connectivity
    Check {
        /// Path to extractor config YAML file
        config: PathBuf,
    },
    /// Show the persisted watermark
    State {
        /// Path to extractor config YAML file
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    match cli.command {
        Commands::Run { config, output } => {
            commands::run::execute(&config, output.as_deref()).await
        }
        Commands::Check { config } => commands::check::execute(&config).await,
        Commands::State { config } => commands::state::execute(&config),
    }
}
