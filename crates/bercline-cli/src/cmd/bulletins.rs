//! Bulletins subcommand: descending year sweep of the PDF stream.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use bercline_bulletin::{run_harvest, BulletinConfig};
use bercline_core::SharedProgress;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct BulletinsArgs {
    /// Newest year to sweep (the harvest walks downward from here)
    #[arg(short, long)]
    pub year: Option<u16>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Concurrent downloads within a year
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Consecutive empty numbers before a year is exhausted
    #[arg(long)]
    pub empty_threshold: Option<usize>,

    /// Skip the gap-recovery pass
    #[arg(long)]
    pub no_gap_recovery: bool,
}

pub fn run(args: BulletinsArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let session = super::acquire_session(None)?;

    let bulletin_config = BulletinConfig {
        output_dir: args
            .output
            .unwrap_or_else(|| config.output.default_dir.join("bulletins")),
        start_year: args.year.unwrap_or(config.bulletins.start_year),
        workers: args.workers.unwrap_or(config.bulletins.workers),
        empty_threshold: args
            .empty_threshold
            .unwrap_or(config.bulletins.empty_threshold),
        max_key: config.bulletins.max_number,
        gap_recovery: !args.no_gap_recovery && config.bulletins.gap_recovery,
        retries: config.bulletins.retries,
        ..Default::default()
    };

    log::info!(
        "bulletins: sweeping from {} into {}",
        bulletin_config.start_year,
        bulletin_config.output_dir.display()
    );

    let summary = run_harvest(&bulletin_config, &session, progress)?;
    if progress.is_tty() {
        eprintln!("\n{}", summary.format_table());
    } else {
        summary.log();
    }
    if summary.stopped {
        log::warn!("harvest interrupted; durable state is flushed and resumable");
    }
    Ok(())
}
