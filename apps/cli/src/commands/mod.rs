//! Subcommand implementations.

pub mod assemble;
pub mod export;
pub mod serve;
pub mod train;

use anyhow::{Context, Result};

/// Run blocking pipeline work off the async runtime.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.context("Pipeline task panicked")?
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
