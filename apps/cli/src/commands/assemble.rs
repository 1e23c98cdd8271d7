//! `kitha assemble`.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kitha_dataset::{Assembler, AssemblyConfig, AssemblyReport, SourceStatus};
use std::path::PathBuf;

use super::{blocking, print_json};

#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Output directory for the record sets
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Per-source record cap
    #[arg(long)]
    max_samples: Option<usize>,

    /// Maximum segment length in characters
    #[arg(long)]
    max_length: Option<usize>,

    /// Shuffle seed; omit for a fresh shuffle every run
    #[arg(long)]
    seed: Option<u64>,

    /// Cap on records per class after balancing
    #[arg(long)]
    max_per_class: Option<usize>,
}

impl AssembleArgs {
    fn apply(self, config: &mut AssemblyConfig) {
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if self.max_samples.is_some() {
            config.max_samples = self.max_samples;
        }
        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.max_per_class.is_some() {
            config.max_per_class = self.max_per_class;
        }
    }
}

pub async fn execute(args: AssembleArgs, mut config: AssemblyConfig, json: bool) -> Result<()> {
    args.apply(&mut config);
    let report = blocking(move || {
        let assembler = Assembler::from_config(config).context("Invalid assembly configuration")?;
        assembler.run().context("Dataset assembly failed")
    })
    .await?;

    if json {
        return print_json(&report);
    }
    print_summary(&report);
    Ok(())
}

fn print_summary(report: &AssemblyReport) {
    let stats = &report.stats;
    println!();
    println!("{}", "Dataset assembled".bold().green());
    println!("  Output:   {}", report.output_dir.display().to_string().cyan());
    println!(
        "  Samples:  {} (train {}, val {}, test {})",
        stats.total_samples, stats.train_samples, stats.val_samples, stats.test_samples
    );
    println!("  Classes:  {} human / {} ai", stats.human_samples, stats.ai_samples);
    println!("  Avg len:  {:.1} chars", stats.avg_text_length);
    println!("  Id:       {}", stats.dataset_id.dimmed());
    println!();

    println!("{:<24} {:<8} {:>8} {:>8}", "Source", "Status", "Records", "Rejected");
    println!("{}", "─".repeat(52));
    for source in &report.sources {
        let status = match source.status {
            SourceStatus::Ok => "ok".green(),
            SourceStatus::Partial => "partial".yellow(),
            SourceStatus::Failed => "failed".red(),
            SourceStatus::Skipped => "skipped".dimmed(),
        };
        println!("{:<24} {:<8} {:>8} {:>8}", source.id, status, source.records, source.rejected);
        if let Some(error) = &source.error {
            println!("  {}", error.dimmed());
        }
    }
    println!();
}
