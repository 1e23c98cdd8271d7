//! `kitha serve`.

use anyhow::{Context, Result};
use clap::Args;
use kitha_serve::ServeConfig;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Local bundle directory
    #[arg(short, long)]
    model_path: Option<PathBuf>,
}

pub async fn execute(args: ServeArgs, mut config: ServeConfig) -> Result<()> {
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(model_path) = args.model_path {
        config.model_path = model_path;
    }
    kitha_serve::run(&config).await.context("Prediction service failed")
}
