//! `kitha export`.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use kitha_export::{ExportConfig, ExportPipeline};
use std::path::PathBuf;

use super::{blocking, print_json};

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Trained raw model directory
    #[arg(short, long)]
    model: PathBuf,

    /// Bundle output directory
    #[arg(short, long, default_value = "models/bundle")]
    output: PathBuf,

    /// max_length written to tokenizer_config.json
    #[arg(long)]
    max_length: Option<usize>,

    /// Go straight to the direct conversion route
    #[arg(long)]
    skip_interchange: bool,

    /// "native" or the converter program to run
    #[arg(long)]
    converter: Option<String>,
}

pub async fn execute(args: ExportArgs, mut config: ExportConfig, json: bool) -> Result<()> {
    if let Some(max_length) = args.max_length {
        config.max_length = max_length;
    }
    if args.skip_interchange {
        config.skip_interchange = true;
    }
    if let Some(converter) = args.converter {
        config.converter = converter;
    }
    let (model, output) = (args.model, args.output);

    let report = blocking(move || {
        ExportPipeline::new(config).run(&model, &output).context("Export failed")
    })
    .await?;

    if json {
        return print_json(&report);
    }

    println!();
    println!("{}", "Export complete".bold().green());
    println!("  Bundle:    {}", report.bundle_dir.display().to_string().cyan());
    println!("  Route:     {}", report.route);
    println!("  Converter: {}", report.converter);
    println!("  Format:    {} ({} shards)", report.format, report.shard_count);
    for warning in &report.warnings {
        println!("  {} {}", "fallback:".yellow(), warning.dimmed());
    }
    println!();
    Ok(())
}
