//! Registry subcommand: per-county application-number paginator.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use bercline_core::SharedProgress;
use bercline_registry::{api::PORTAL_ORIGIN, run, RegistryConfig};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RegistryArgs {
    /// Application year to sweep
    #[arg(short, long)]
    pub year: Option<u16>,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// County streams processed concurrently
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// County list JSON file
    #[arg(long)]
    pub counties: Option<PathBuf>,

    /// Consecutive empty numbers before a county is exhausted
    #[arg(long)]
    pub empty_threshold: Option<usize>,

    /// Re-probe failed numbers below the high-water mark after the scan
    #[arg(long)]
    pub gap_recovery: bool,
}

pub fn run_cmd(args: RegistryArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let session = super::acquire_session(Some(PORTAL_ORIGIN))?;

    let registry_config = RegistryConfig {
        output_dir: args
            .output
            .unwrap_or_else(|| config.output.default_dir.join("registry")),
        counties_path: args.counties.unwrap_or_else(|| config.registry.counties.clone()),
        year: args.year.unwrap_or(config.registry.year),
        workers: args.workers.unwrap_or(config.registry.workers),
        empty_threshold: args
            .empty_threshold
            .unwrap_or(config.registry.empty_threshold),
        max_key: config.registry.max_number,
        batch_size: config.registry.batch_size,
        gap_recovery: args.gap_recovery || config.registry.gap_recovery,
        retries: config.registry.retries,
        ..Default::default()
    };

    log::info!(
        "registry: year {} into {}",
        registry_config.year,
        registry_config.output_dir.display()
    );

    let summary = run(&registry_config, &session, progress)?;
    if progress.is_tty() {
        eprintln!("\n{}", summary.format_table());
    } else {
        summary.log();
    }
    if summary.stopped {
        log::warn!("harvest interrupted; durable state is flushed and resumable");
    }
    if summary.failed_counties() > 0 {
        anyhow::bail!("{} county stream(s) incomplete", summary.failed_counties());
    }
    Ok(())
}
