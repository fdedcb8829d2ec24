//! bercline - business-registry harvesting pipelines
//!
//! Downloads bulletin PDFs and sweeps the registry paginator, extracting
//! decision records into partitioned on-disk tables.

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "bercline")]
#[command(about = "Harvest the business-registry portal into partitioned tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress info logs (only warnings and errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file path (default: ./bercline.toml or ~/.config/bercline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Download bulletin PDFs and extract decisions, newest year first
    Bulletins(cmd::bulletins::BulletinsArgs),
    /// Sweep application numbers across every county
    Registry(cmd::registry::RegistryArgs),
    /// Re-extract decisions from already-stored bulletins
    Extract(cmd::extract::ExtractArgs),
    /// Aggregate registrar throughput from the decision tables
    Report(cmd::report::ReportArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(bercline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug  — progress bars show activity
    //   non-TTY: info unless --debug          — logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = cli.quiet || (is_tty && !cli.debug);
    bercline_core::init_logging(quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Bulletins(args) => {
            bercline_core::install_signal_handlers();
            cmd::bulletins::run(args, &config, &progress)
        }
        Command::Registry(args) => {
            bercline_core::install_signal_handlers();
            cmd::registry::run_cmd(args, &config, &progress)
        }
        Command::Extract(args) => {
            bercline_core::install_signal_handlers();
            cmd::extract::run(args, &config, &progress)
        }
        Command::Report(args) => cmd::report::run(args, &config, &progress),
        Command::Config => {
            use comfy_table::{
                modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table,
            };

            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .apply_modifier(UTF8_ROUND_CORNERS)
                .set_header(vec![
                    Cell::new("Setting").fg(Color::Cyan),
                    Cell::new("Value").fg(Color::Cyan),
                ]);

            table.add_row(vec![
                "Output directory",
                &config.output.default_dir.display().to_string(),
            ]);
            table.add_row(vec![
                "Bulletins start year",
                &config.bulletins.start_year.to_string(),
            ]);
            table.add_row(vec![
                "Bulletins workers / threshold",
                &format!(
                    "{} / {}",
                    config.bulletins.workers, config.bulletins.empty_threshold
                ),
            ]);
            table.add_row(vec![
                "Bulletins gap recovery",
                if config.bulletins.gap_recovery { "on" } else { "off" },
            ]);
            table.add_row(vec!["Registry year", &config.registry.year.to_string()]);
            table.add_row(vec![
                "Registry workers / threshold",
                &format!(
                    "{} / {}",
                    config.registry.workers, config.registry.empty_threshold
                ),
            ]);
            table.add_row(vec![
                "Registry batch size",
                &config.registry.batch_size.to_string(),
            ]);
            table.add_row(vec![
                "County list",
                &config.registry.counties.display().to_string(),
            ]);
            table.add_row(vec![
                "Token",
                if std::env::var("BERC_TOKEN").is_ok() {
                    "from BERC_TOKEN"
                } else {
                    "prompted at start"
                },
            ]);

            eprintln!("\n{table}");
            Ok(())
        }
    }
}
