//! Bulletin execution: descending year sweep, per-year scans, gap
//! recovery, and the standalone extract pass over stored PDFs.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use bercline_core::{
    fmt_num, is_shutdown_requested, missing_below, recover_gaps, scan_stream, ErrorJournal,
    Extractor, ProbeOutcome, Prober, RecordSink, ScanPolicy, Session, SharedProgress,
};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::api::BulletinApi;
use crate::config::BulletinConfig;
use crate::decision::{Decision, DecisionPartition};
use crate::extract::DecisionExtractor;
use crate::pdf;
use crate::prober::BulletinProber;
use crate::store::PdfStore;
use crate::table::CsvTable;

/// How one year's stream ended.
#[derive(Debug, Clone, Copy)]
pub struct YearOutcome {
    pub year: u16,
    pub found: usize,
    pub absent: usize,
    pub failed: usize,
    pub recovered: usize,
    pub stopped: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct HarvestSummary {
    pub years: Vec<YearOutcome>,
    pub decisions_written: usize,
    pub write_errors: usize,
    pub stopped: bool,
    pub elapsed: Duration,
}

impl HarvestSummary {
    pub fn bulletins_found(&self) -> usize {
        self.years.iter().map(|y| y.found + y.recovered).sum()
    }

    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("Year").fg(Color::Cyan),
                Cell::new("Found").fg(Color::Cyan),
                Cell::new("Recovered").fg(Color::Cyan),
                Cell::new("Absent").fg(Color::Cyan),
                Cell::new("Failed").fg(Color::Cyan),
                Cell::new("Time").fg(Color::Cyan),
            ]);
        for y in &self.years {
            table.add_row(vec![
                y.year.to_string(),
                fmt_num(y.found),
                fmt_num(y.recovered),
                fmt_num(y.absent),
                fmt_num(y.failed),
                format!("{:.0}s", y.elapsed.as_secs_f64()),
            ]);
        }
        table.add_row(vec![
            "Decisions".to_string(),
            fmt_num(self.decisions_written),
            String::new(),
            String::new(),
            format!("{} write errors", self.write_errors),
            format!("{:.0}s", self.elapsed.as_secs_f64()),
        ]);
        table.to_string()
    }

    pub fn log(&self) {
        for y in &self.years {
            log::info!(
                "year {}: found {}, recovered {}, absent {}, failed {} [{:.0}s]",
                y.year,
                fmt_num(y.found),
                fmt_num(y.recovered),
                fmt_num(y.absent),
                fmt_num(y.failed),
                y.elapsed.as_secs_f64()
            );
        }
        log::info!(
            "bulletins: {} decisions written, {} write errors [{:.0}s]",
            fmt_num(self.decisions_written),
            self.write_errors,
            self.elapsed.as_secs_f64()
        );
    }
}

/// Sweep years descending from `config.start_year` until the empty-year
/// streak ends the harvest.
pub fn run_harvest(
    config: &BulletinConfig,
    session: &Session,
    progress: &SharedProgress,
) -> anyhow::Result<HarvestSummary> {
    std::fs::create_dir_all(&config.output_dir)
        .context("Cannot create bulletin output directory")?;
    let journal = ErrorJournal::new(config.output_dir.join("errors.jsonl"));
    let store = PdfStore::new(config.bulletins_dir());
    let table = Arc::new(CsvTable::new(config.decisions_dir()));
    let sink = RecordSink::spawn(table, config.sink_config()).context("Cannot start sink")?;
    let api = BulletinApi::new(session, &journal, config.backoff());
    let extractor = DecisionExtractor::new();
    let policy = config.scan_policy();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(policy.workers.max(policy.gap_batch))
        .build()
        .context("Failed to create download pool")?;

    let mut years = Vec::new();
    let mut empty_years = 0usize;
    let mut year = config.start_year;
    let start = Instant::now();

    while empty_years < config.max_empty_years && !is_shutdown_requested() {
        // A panicking worker ends this year's stream, not the final flush
        let result = catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| harvest_year(year, &policy, &api, &store, &sink, &extractor, progress))
        }));
        let outcome = match result {
            Ok(outcome) => outcome?,
            Err(_) => {
                log::error!("year {year}: worker panicked; stream is incomplete");
                break;
            }
        };
        if outcome.found + outcome.recovered == 0 {
            empty_years += 1;
            log::info!(
                "no bulletins for {year} ({empty_years}/{} empty years)",
                config.max_empty_years
            );
        } else {
            empty_years = 0;
        }
        years.push(outcome);
        year = match year.checked_sub(1) {
            Some(y) => y,
            None => break,
        };
    }

    let stats = sink.close().context("Sink flusher failed")?;
    Ok(HarvestSummary {
        years,
        decisions_written: stats.flushed,
        write_errors: stats.write_errors,
        stopped: is_shutdown_requested(),
        elapsed: start.elapsed(),
    })
}

/// One year: resume from the stored high-water mark, scan, recover gaps.
fn harvest_year(
    year: u16,
    policy: &ScanPolicy,
    api: &BulletinApi<'_>,
    store: &PdfStore,
    sink: &RecordSink<DecisionPartition, Decision>,
    extractor: &DecisionExtractor,
    progress: &SharedProgress,
) -> anyhow::Result<YearOutcome> {
    let year_start = Instant::now();
    let resume = store
        .resume_point(year)
        .with_context(|| format!("Cannot inspect bulletin store for {year}"))?;
    log::info!(
        "year {year}: starting at #{} ({} bulletins already stored)",
        resume.start_key(),
        fmt_num(resume.records)
    );

    let pb = progress.stream_bar(&year.to_string(), resume.start_key(), policy.max_key);
    let prober = BulletinProber::new(api, year);

    let process = |number: u32| -> ProbeOutcome<usize> {
        match prober.probe(number) {
            ProbeOutcome::Found(bytes) => {
                // The stored PDF is the resume ledger; persist before extracting
                if let Err(e) = store.save(year, number, &bytes) {
                    log::error!("{year}/{number}: cannot persist bulletin: {e}");
                    return ProbeOutcome::Failed;
                }
                let decisions = match pdf::extract_text(&bytes) {
                    Ok(text) => extractor.extract(&text),
                    Err(e) => {
                        log::warn!("{year}/{number}: text layer unavailable: {e}");
                        Vec::new()
                    }
                };
                ProbeOutcome::Found(submit_decisions(sink, decisions))
            }
            ProbeOutcome::Absent => ProbeOutcome::Absent,
            ProbeOutcome::Failed => ProbeOutcome::Failed,
        }
    };

    let report = scan_stream(policy, resume.start_key(), process, &pb);

    let mut recovered = 0;
    if policy.gap_recovery && !report.stopped {
        let downloaded = store.downloaded(year)?;
        let high = downloaded.last().copied().unwrap_or(0);
        let gaps = missing_below(&downloaded, high);
        if !gaps.is_empty() {
            log::info!("year {year}: {} gaps below #{high}, recovering", gaps.len());
            recovered = recover_gaps(policy, &gaps, process, &pb);
        }
    }
    pb.finish_and_clear();

    progress.println(format!(
        "Year {year}: found {}, absent {}, failed {}, recovered {} [{:.0}s]",
        fmt_num(report.found),
        fmt_num(report.absent),
        fmt_num(report.failed),
        recovered,
        year_start.elapsed().as_secs_f64()
    ));

    Ok(YearOutcome {
        year,
        found: report.found,
        absent: report.absent,
        failed: report.failed,
        recovered,
        stopped: report.stopped,
        elapsed: year_start.elapsed(),
    })
}

/// Group decisions by their content-derived partition and hand them to
/// the sink. Decisions that cannot be partitioned are dropped with a log.
fn submit_decisions(
    sink: &RecordSink<DecisionPartition, Decision>,
    decisions: Vec<Decision>,
) -> usize {
    let mut groups: FxHashMap<DecisionPartition, Vec<Decision>> = FxHashMap::default();
    let mut kept = 0usize;
    for decision in decisions {
        match decision.partition() {
            Some(partition) => {
                kept += 1;
                groups.entry(partition).or_default().push(decision);
            }
            None => log::debug!(
                "decision {} has no county/month partition, dropped",
                decision.dossier_number
            ),
        }
    }
    for (partition, records) in groups {
        sink.submit(partition, records);
    }
    kept
}

#[derive(Debug, Default)]
pub struct ExtractSummary {
    pub files: usize,
    pub failed_files: usize,
    pub decisions: usize,
    pub decisions_written: usize,
    pub write_errors: usize,
    pub elapsed: Duration,
}

impl ExtractSummary {
    pub fn log(&self) {
        log::info!(
            "extract: {} files ({} failed), {} decisions, {} written [{:.0}s]",
            self.files,
            self.failed_files,
            fmt_num(self.decisions),
            fmt_num(self.decisions_written),
            self.elapsed.as_secs_f64()
        );
    }
}

/// Re-run extraction over every PDF already stored for `year`.
pub fn run_extract(
    config: &BulletinConfig,
    year: u16,
    progress: &SharedProgress,
) -> anyhow::Result<ExtractSummary> {
    let store = PdfStore::new(config.bulletins_dir());
    let files = store.stored(year)?;
    anyhow::ensure!(
        !files.is_empty(),
        "No bulletins stored for {year} under {}",
        store.root().display()
    );
    log::info!("extract: {} bulletins for {year}", fmt_num(files.len()));

    let table = Arc::new(CsvTable::new(config.decisions_dir()));
    let sink = RecordSink::spawn(table, config.sink_config()).context("Cannot start sink")?;
    let extractor = DecisionExtractor::new();

    let pb = progress.stream_bar(&format!("extract {year}"), 0, files.len() as u32);
    let decisions = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.extract_workers.max(1))
        .build()
        .context("Failed to create extract pool")?;

    let start = Instant::now();
    pool.install(|| {
        files.par_iter().for_each(|(number, path)| {
            if is_shutdown_requested() {
                return;
            }
            match std::fs::read(path) {
                Ok(bytes) => match pdf::extract_text(&bytes) {
                    Ok(text) => {
                        let n = submit_decisions(&sink, extractor.extract(&text));
                        decisions.fetch_add(n, Ordering::Relaxed);
                    }
                    Err(e) => {
                        failed.fetch_add(1, Ordering::Relaxed);
                        log::warn!("{year}/{number}: {e}");
                    }
                },
                Err(e) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{year}/{number}: cannot read {}: {e}", path.display());
                }
            }
            pb.inc(1);
        });
    });
    pb.finish_and_clear();

    let stats = sink.close().context("Sink flusher failed")?;
    Ok(ExtractSummary {
        files: files.len(),
        failed_files: failed.into_inner(),
        decisions: decisions.into_inner(),
        decisions_written: stats.flushed,
        write_errors: stats.write_errors,
        elapsed: start.elapsed(),
    })
}
