//! Paginator execution: one scan stream per county on a shared pool.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Context;
use bercline_core::{
    fmt_num, is_shutdown_requested, missing_below, recover_gaps, scan_stream, ErrorJournal,
    Prober, RecordSink, ResumePoint, Session, SharedProgress,
};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use crate::api::RegistryApi;
use crate::config::RegistryConfig;
use crate::county::load_counties;
use crate::prober::ArticleProber;
use crate::table::JsonTable;

/// How one county's stream ended.
#[derive(Debug, Clone)]
pub struct CountyOutcome {
    pub name: String,
    pub found: usize,
    pub absent: usize,
    pub failed_probes: usize,
    pub recovered: usize,
    /// Records already on disk before this run
    pub resumed_records: usize,
    /// Worker died on an unexpected panic; stream incomplete
    pub panicked: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub struct RegistrySummary {
    pub outcomes: Vec<CountyOutcome>,
    pub records_written: usize,
    pub write_errors: usize,
    pub stopped: bool,
    pub elapsed: Duration,
}

impl RegistrySummary {
    pub fn failed_counties(&self) -> usize {
        self.outcomes.iter().filter(|o| o.panicked).count()
    }

    pub fn format_table(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![
                Cell::new("County").fg(Color::Cyan),
                Cell::new("Found").fg(Color::Cyan),
                Cell::new("Absent").fg(Color::Cyan),
                Cell::new("Failed").fg(Color::Cyan),
                Cell::new("Time").fg(Color::Cyan),
            ]);
        for o in &self.outcomes {
            let name = if o.panicked {
                format!("{} (incomplete)", o.name)
            } else {
                o.name.clone()
            };
            table.add_row(vec![
                name,
                fmt_num(o.found),
                fmt_num(o.absent),
                fmt_num(o.failed_probes),
                format!("{:.0}s", o.elapsed.as_secs_f64()),
            ]);
        }
        table.add_row(vec![
            "Total".to_string(),
            fmt_num(self.outcomes.iter().map(|o| o.found).sum()),
            fmt_num(self.outcomes.iter().map(|o| o.absent).sum()),
            fmt_num(self.outcomes.iter().map(|o| o.failed_probes).sum()),
            format!("{:.0}s", self.elapsed.as_secs_f64()),
        ]);
        table.to_string()
    }

    pub fn log(&self) {
        for o in &self.outcomes {
            log::info!(
                "{}: found {}, absent {}, failed {} [{:.0}s]{}",
                o.name,
                fmt_num(o.found),
                fmt_num(o.absent),
                fmt_num(o.failed_probes),
                o.elapsed.as_secs_f64(),
                if o.panicked { " INCOMPLETE" } else { "" }
            );
        }
        log::info!(
            "registry: {} records written, {} write errors [{:.0}s]",
            fmt_num(self.records_written),
            self.write_errors,
            self.elapsed.as_secs_f64()
        );
    }
}

/// Run the paginator over every county.
pub fn run(
    config: &RegistryConfig,
    session: &Session,
    progress: &SharedProgress,
) -> anyhow::Result<RegistrySummary> {
    let counties = load_counties(&config.counties_path)?;
    std::fs::create_dir_all(&config.output_dir)
        .context("Cannot create registry output directory")?;

    let journal = ErrorJournal::new(config.output_dir.join("errors.jsonl"));
    let table = Arc::new(JsonTable::new(config.output_dir.join("counties")));

    // Resume points resolved before any worker starts: corrupt durable
    // state halts the run here rather than silently re-harvesting.
    let resumes: Vec<ResumePoint> = counties
        .iter()
        .map(|c| table.last_processed(&c.name))
        .collect::<anyhow::Result<_>>()?;

    log::info!(
        "registry: {} counties, year {}, resuming {} records",
        counties.len(),
        config.year,
        fmt_num(resumes.iter().map(|r| r.records).sum())
    );

    let sink = RecordSink::spawn(table.clone(), config.sink_config())
        .context("Cannot start sink flusher")?;
    let api = RegistryApi::new(session, &journal, config.backoff(), config.year);
    let policy = config.scan_policy();

    let outcomes: Mutex<Vec<CountyOutcome>> = Mutex::new(Vec::new());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.workers.min(counties.len()).max(1))
        .build()
        .context("Failed to create county pool")?;

    let start = Instant::now();
    pool.install(|| {
        rayon::scope(|s| {
            for (county, resume) in counties.iter().zip(resumes.iter()) {
                let sink = &sink;
                let api = &api;
                let table = &table;
                let journal = &journal;
                let outcomes = &outcomes;
                let policy = policy;
                s.spawn(move |_| {
                    let county_start = Instant::now();
                    let pb = progress.stream_bar(&county.name, resume.start_key(), policy.max_key);
                    let prober = ArticleProber::new(api, county);
                    let probe = |key: u32| {
                        prober.probe(key).map(|articles| {
                            let n = articles.len();
                            sink.submit(county.name.clone(), articles);
                            n
                        })
                    };

                    let result = catch_unwind(AssertUnwindSafe(|| {
                        let report = scan_stream(&policy, resume.start_key(), probe, &pb);
                        let mut recovered = 0;
                        if policy.gap_recovery && !report.stopped {
                            if let (Some(high), Ok(keys)) =
                                (report.last_found, table.persisted_keys(&county.name))
                            {
                                let gaps = missing_below(&keys, high);
                                if !gaps.is_empty() {
                                    log::info!(
                                        "{}: recovering {} gaps below #{high}",
                                        county.name,
                                        gaps.len()
                                    );
                                    recovered = recover_gaps(&policy, &gaps, probe, &pb);
                                }
                            }
                        }
                        (report, recovered)
                    }));
                    pb.finish_and_clear();

                    match result {
                        Ok((report, recovered)) => {
                            progress.println(format!(
                                "Completed {}: found {}, absent {}, failed {} [{:.0}s]",
                                county.name,
                                fmt_num(report.found),
                                fmt_num(report.absent),
                                fmt_num(report.failed),
                                county_start.elapsed().as_secs_f64()
                            ));
                            outcomes.lock().unwrap().push(CountyOutcome {
                                name: county.name.clone(),
                                found: report.found,
                                absent: report.absent,
                                failed_probes: report.failed,
                                recovered,
                                resumed_records: resume.records,
                                panicked: false,
                                elapsed: county_start.elapsed(),
                            });
                        }
                        Err(_) => {
                            log::error!(
                                "{}: worker panicked; stream is incomplete (see {})",
                                county.name,
                                journal.path().display()
                            );
                            outcomes.lock().unwrap().push(CountyOutcome {
                                name: county.name.clone(),
                                found: 0,
                                absent: 0,
                                failed_probes: 0,
                                recovered: 0,
                                resumed_records: resume.records,
                                panicked: true,
                                elapsed: county_start.elapsed(),
                            });
                        }
                    }
                });
            }
        });
    });

    // Mandatory final flush before reporting
    let sink_stats = sink.close().context("Sink flusher failed")?;

    let mut outcomes = outcomes.into_inner().unwrap();
    outcomes.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(RegistrySummary {
        outcomes,
        records_written: sink_stats.flushed,
        write_errors: sink_stats.write_errors,
        stopped: is_shutdown_requested(),
        elapsed: start.elapsed(),
    })
}
