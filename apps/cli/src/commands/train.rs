//! `kitha train`.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kitha_dataset::AssemblyConfig;
use kitha_model::{BaselineTrainer, TrainConfig};
use std::path::PathBuf;

use super::{blocking, print_json};

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Dataset directory (defaults to the assembly output directory)
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Where to write the raw model
    #[arg(short, long, default_value = "models/baseline")]
    output: PathBuf,

    /// Drop tokens seen fewer times than this
    #[arg(long)]
    min_frequency: Option<usize>,
}

pub async fn execute(args: TrainArgs, mut config: TrainConfig, assembly: &AssemblyConfig, json: bool) -> Result<()> {
    if let Some(min_frequency) = args.min_frequency {
        config.min_frequency = min_frequency;
    }
    let data = args.data.unwrap_or_else(|| assembly.output_dir.clone());
    let output = args.output;

    let report = blocking(move || {
        let trainer = BaselineTrainer::new(config).context("Invalid training configuration")?;
        trainer
            .train(&data, &output)
            .with_context(|| format!("Training on {} failed", data.display()))
    })
    .await?;

    if json {
        return print_json(&report);
    }

    println!();
    println!("{}", "Training complete".bold().green());
    println!("  Model:    {}", report.output_dir.display().to_string().cyan());
    println!("  Vocab:    {}", report.vocab_size);
    println!("  Samples:  {}", report.train_samples);
    match &report.metrics {
        Some(m) => println!(
            "  Test:     accuracy {:.4}, precision {:.4}, recall {:.4}, f1 {:.4} ({} samples)",
            m.accuracy, m.precision, m.recall, m.f1, m.test_samples
        ),
        None => println!("  {}", "No test split; metrics skipped.".dimmed()),
    }
    println!();
    Ok(())
}
