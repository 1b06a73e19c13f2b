//! `nlg`: curate nonlocal game experiment data into the record store.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use nlg_ingest::Config;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{experiments, games, ingest, init};

/// Nonlocal game data curation
#[derive(Parser)]
#[command(name = "nlg")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// YAML configuration file
    #[arg(short, long, global = true, env = "NLG_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the default games in the database
    Init,

    /// Run the enabled adapters and store their experiments
    Ingest,

    /// List stored games
    Games,

    /// List stored experiments
    Experiments {
        /// Decimals of the rendered win rate
        #[arg(short, long, default_value = "1")]
        decimals: u32,
    },
}

/// Filter directive: `-v` flags win over the configured level.
fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_filter(cli.verbose, &config.logging.level)))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .max_blocking_threads(config.workers.max_blocking_threads.max(1))
        .build()
        .context("failed to start the async runtime")?;

    runtime.block_on(async {
        match cli.command {
            Commands::Init => init::execute(&config).await,
            Commands::Ingest => ingest::execute(&config).await,
            Commands::Games => games::execute(&config).await,
            Commands::Experiments { decimals } => experiments::execute(&config, decimals).await,
        }
    })
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}
