mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nutrilog-migrate")]
#[command(
    about = "Migrate users, foods and food logs from the legacy backend to the new backend",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the selected migration stages (users -> foods -> foodlogs)
    Run(RunArgs),
    /// Print the number of legacy records per entity type
    Counts {
        /// Print counts as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub(crate) struct RunArgs {
    /// Stages to run: all, users, foods, foodlogs (default: all)
    #[arg(value_name = "STAGE")]
    pub stages: Vec<String>,
    /// Print the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// Also write the JSON report to this file
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
    /// Records per insert batch (overrides MIGRATION_BATCH_SIZE)
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Concurrent batches and photo transfers (overrides MIGRATION_CONCURRENCY)
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Maximum records fetched per entity type (overrides MIGRATION_FETCH_LIMIT)
    #[arg(long)]
    pub fetch_limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("warning: could not load .env: {e}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Counts { json } => commands::counts::run(json).await,
    }
}
