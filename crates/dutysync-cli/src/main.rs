mod cmd;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "dutysync",
    about = "Sync on-call duty records from a Notion roster to Slack direct messages",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: dutysync.yaml in the working directory)
    #[arg(long, global = true, env = "DUTYSYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one reconciliation pass: notify today's starters, close expired records
    Run {
        /// Reference date override (YYYY-MM-DD; default: today in the configured timezone)
        #[arg(long)]
        date: Option<String>,
    },

    /// Show what a run would do, without sending or writing anything
    Plan {
        /// Reference date override (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Validate the config for common mistakes
    Check,
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Run { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .init();

    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(dutysync_core::config::DEFAULT_CONFIG_FILE));

    let result = match cli.command {
        Commands::Run { date } => cmd::run::run(&config_path, date.as_deref(), cli.json),
        Commands::Plan { date } => cmd::plan::run(&config_path, date.as_deref(), cli.json),
        Commands::Check => cmd::check::run(&config_path, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
