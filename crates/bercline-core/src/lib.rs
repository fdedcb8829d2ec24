//! Bercline Core - Common infrastructure for registry harvesting pipelines
//!
//! This crate provides the reusable pieces shared by the bulletin and
//! registry streams: probe outcomes, backoff/retry, the scan coordinator,
//! the incremental partition sink, and progress/logging/shutdown plumbing.

pub mod backoff;
pub mod extract;
pub mod http;
pub mod journal;
pub mod keys;
pub mod logging;
pub mod probe;
pub mod progress;
pub mod resume;
pub mod scan;
pub mod shutdown;
pub mod sink;

// Re-exports for convenience
pub use backoff::{BackoffPolicy, Retryable, retry};
pub use extract::Extractor;
pub use http::{ApiError, Session, http_client, SHARED_RUNTIME};
pub use journal::{ErrorJournal, JournalEntry};
pub use keys::KeySpace;
pub use logging::init_logging;
pub use probe::{ProbeOutcome, Prober};
pub use progress::{ProgressContext, SharedProgress, fmt_num};
pub use resume::{missing_below, numbered_keys, ResumePoint};
pub use scan::{recover_gaps, scan_stream, ScanPolicy, ScanReport, StreamPhase};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, request_shutdown, shutdown_flag};
pub use sink::{PartitionStore, RecordSink, SinkConfig, SinkStats};
