//! Extract subcommand: re-run decision extraction over stored PDFs.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use bercline_bulletin::{run_extract, BulletinConfig};
use bercline_core::SharedProgress;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Year whose stored bulletins to process
    #[arg(short, long)]
    pub year: u16,

    /// Output directory (the same root the harvest wrote)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Extraction pool size
    #[arg(short, long)]
    pub workers: Option<usize>,
}

pub fn run(args: ExtractArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let bulletin_config = BulletinConfig {
        output_dir: args
            .output
            .unwrap_or_else(|| config.output.default_dir.join("bulletins")),
        extract_workers: args.workers.unwrap_or(16),
        ..Default::default()
    };

    let summary = run_extract(&bulletin_config, args.year, progress)?;
    summary.log();
    if summary.failed_files > 0 {
        log::warn!("{} bulletin(s) could not be processed", summary.failed_files);
    }
    Ok(())
}
