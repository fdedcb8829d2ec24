//! Bulletin stream configuration.

use std::path::PathBuf;
use std::time::Duration;

use bercline_core::backoff::BackoffPolicy;
use bercline_core::scan::ScanPolicy;
use bercline_core::sink::SinkConfig;

/// Runtime configuration for the bulletin downloader.
#[derive(Debug, Clone)]
pub struct BulletinConfig {
    pub output_dir: PathBuf,
    /// Newest year swept; the harvest walks downward from here
    pub start_year: u16,
    /// Consecutive empty years that end the whole sweep
    pub max_empty_years: usize,
    /// Exclusive upper bound of bulletin numbers within a year
    pub max_key: u32,
    /// Consecutive empty numbers before a year is exhausted
    pub empty_threshold: usize,
    /// Concurrent downloads within a year
    pub workers: usize,
    pub gap_recovery: bool,
    pub gap_batch: usize,
    pub retries: u32,
    pub retry_base: Duration,
    /// Decisions accumulated before an incremental save
    pub batch_size: usize,
    pub flush_interval: Duration,
    /// Pool size for the standalone extract pass over stored PDFs
    pub extract_workers: usize,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("bulletins"),
            start_year: 2024,
            max_empty_years: 3,
            max_key: 100_001,
            empty_threshold: 100,
            workers: 4,
            gap_recovery: true,
            gap_batch: 10,
            retries: 5,
            retry_base: Duration::from_secs(1),
            batch_size: 500,
            flush_interval: Duration::from_secs(5),
            extract_workers: 16,
        }
    }
}

impl BulletinConfig {
    /// Raw PDFs: `<output>/pdf/<year>/<number>.pdf`
    pub fn bulletins_dir(&self) -> PathBuf {
        self.output_dir.join("pdf")
    }

    /// Decision tables: `<output>/decisions/<county>/<month>.csv`
    pub fn decisions_dir(&self) -> PathBuf {
        self.output_dir.join("decisions")
    }

    pub fn scan_policy(&self) -> ScanPolicy {
        ScanPolicy {
            workers: self.workers,
            empty_threshold: self.empty_threshold,
            max_key: self.max_key,
            gap_recovery: self.gap_recovery,
            gap_batch: self.gap_batch,
            dispatch_jitter: None,
        }
    }

    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(self.retry_base, Duration::from_secs(1), self.retries.max(1))
    }

    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            batch_size: self.batch_size,
            flush_interval: self.flush_interval,
            queue_depth: 256,
        }
    }
}
