//! Report subcommand: registrar throughput over the decision tables.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use bercline_bulletin::{performance, CsvTable};
use bercline_core::SharedProgress;

use crate::config::Config;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Output directory (the same root the harvest wrote)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rows shown in the console table
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

pub fn run(args: ReportArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let root = args
        .output
        .unwrap_or_else(|| config.output.default_dir.join("bulletins"));
    let table = CsvTable::new(root.join("decisions"));

    let rows = performance::compute(&table)?;
    let csv_path = root.join("performance.csv");
    performance::write_csv(&rows, &csv_path)?;
    log::info!("{} registrars written to {}", rows.len(), csv_path.display());

    if progress.is_tty() {
        eprintln!("\n{}", performance::format_table(&rows, args.top));
    }
    Ok(())
}
