//! Kitha CLI - drive the human-vs-AI text detection pipeline
//!
//! `kitha assemble` builds the dataset, `kitha train` fits the baseline
//! detector, `kitha export` produces the browser bundle and `kitha serve`
//! runs the prediction service.

mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::{assemble, export, serve, train};
use config::KithaConfig;

/// Kitha - human vs. AI text detection
#[derive(Parser, Debug)]
#[command(name = "kitha", author, version, about = "Kitha - human vs. AI text detection pipeline")]
struct Args {
    /// Log level (trace, debug, info, warn, error); RUST_LOG wins when set
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Configuration file (defaults to ./kitha.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the command's report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Assemble the labeled dataset from every configured source
    ///
    /// Fetches, normalizes, segments, balances and splits, then writes
    /// train/val/test/full in JSON and CSV plus stats.json.
    Assemble(assemble::AssembleArgs),

    /// Train the baseline detector on an assembled dataset
    Train(train::TrainArgs),

    /// Export a trained model to a browser bundle
    Export(export::ExportArgs),

    /// Serve predictions over HTTP
    Serve(serve::ServeArgs),
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(format!("kitha={level}")).with_context(|| format!("Invalid log level '{level}'"))?,
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = KithaConfig::load(args.config.as_deref())?.apply_env(|key| std::env::var(key).ok())?;

    match args.command {
        Command::Assemble(cmd) => assemble::execute(cmd, config.assembly, args.json).await,
        Command::Train(cmd) => train::execute(cmd, config.train, &config.assembly, args.json).await,
        Command::Export(cmd) => export::execute(cmd, config.export, args.json).await,
        Command::Serve(cmd) => serve::execute(cmd, config.serve).await,
    }
}
