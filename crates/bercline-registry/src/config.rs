//! Registry stream configuration.

use std::path::PathBuf;
use std::time::Duration;

use bercline_core::backoff::BackoffPolicy;
use bercline_core::scan::ScanPolicy;
use bercline_core::sink::SinkConfig;

/// Runtime configuration for the paginator stream.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub output_dir: PathBuf,
    pub counties_path: PathBuf,
    /// Application year swept by the paginator
    pub year: u16,
    /// Exclusive upper bound of the application-number space
    pub max_key: u32,
    /// Consecutive empty numbers before a county is exhausted
    pub empty_threshold: usize,
    /// County streams processed concurrently
    pub workers: usize,
    /// Records accumulated before an incremental save
    pub batch_size: usize,
    pub flush_interval: Duration,
    /// Second pass over failed numbers below the high-water mark
    pub gap_recovery: bool,
    pub retries: u32,
    pub retry_base: Duration,
    /// Max random delay between successive probes within a county
    pub dispatch_jitter: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("results"),
            counties_path: PathBuf::from("data/counties.json"),
            year: 2024,
            max_key: 380_001,
            empty_threshold: 1_500,
            workers: 8,
            batch_size: 250,
            flush_interval: Duration::from_secs(30),
            gap_recovery: false,
            retries: 2,
            retry_base: Duration::from_millis(200),
            dispatch_jitter: Duration::from_millis(100),
        }
    }
}

impl RegistryConfig {
    /// Scan policy for one county stream: sequential within the county,
    /// jittered dispatch, no gap recovery unless asked for.
    pub fn scan_policy(&self) -> ScanPolicy {
        ScanPolicy {
            workers: 1,
            empty_threshold: self.empty_threshold,
            max_key: self.max_key,
            gap_recovery: self.gap_recovery,
            gap_batch: 10,
            dispatch_jitter: Some(self.dispatch_jitter),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stream_family() {
        let config = RegistryConfig::default();
        assert_eq!(config.empty_threshold, 1_500);
        assert_eq!(config.batch_size, 250);
        assert!(!config.gap_recovery);
        let policy = config.scan_policy();
        assert_eq!(policy.workers, 1);
        assert_eq!(policy.max_key, 380_001);
    }
}
