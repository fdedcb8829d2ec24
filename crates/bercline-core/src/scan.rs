//! Scan coordinator: bounded-concurrency sweep over a key-space.
//!
//! Per-stream state machine: `Scanning` until a run of consecutive empty
//! probes reaches the policy threshold, then optionally one `GapRecovery`
//! pass over keys missed below the high-water mark, then `Exhausted`.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use indicatif::ProgressBar;

use crate::keys::KeySpace;
use crate::probe::ProbeOutcome;
use crate::progress::fmt_num;
use crate::shutdown::is_shutdown_requested;

/// Tunables for one stream family.
///
/// The downloader and the paginator share the control-flow skeleton but
/// differ in worker count, threshold, and whether gaps get a second pass.
#[derive(Debug, Clone, Copy)]
pub struct ScanPolicy {
    /// Worker-pool size for the main scan
    pub workers: usize,
    /// Consecutive empty probes before the stream is declared exhausted
    pub empty_threshold: usize,
    /// Exclusive upper bound of the key-space
    pub max_key: u32,
    /// Whether to re-probe keys missing below the high-water mark
    pub gap_recovery: bool,
    /// Batch size (and pool size) for the gap-recovery pass
    pub gap_batch: usize,
    /// Max uniform delay injected before each dispatch, if any
    pub dispatch_jitter: Option<Duration>,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            workers: 4,
            empty_threshold: 100,
            max_key: 100_001,
            gap_recovery: true,
            gap_batch: 10,
            dispatch_jitter: None,
        }
    }
}

/// Stream lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Scanning,
    GapRecovery,
    Exhausted,
}

impl std::fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Scanning => "scanning",
            Self::GapRecovery => "gap-recovery",
            Self::Exhausted => "exhausted",
        })
    }
}

/// What one scan pass did.
#[derive(Debug, Clone, Copy)]
pub struct ScanReport {
    pub start_key: u32,
    /// Highest key that yielded a resource, if any
    pub last_found: Option<u32>,
    pub found: usize,
    pub absent: usize,
    pub failed: usize,
    /// `Exhausted` when the key-space ended or the empty threshold
    /// tripped; `Scanning` when a stop signal cut the pass short
    pub phase: StreamPhase,
    /// True when the scan was cut short by a stop signal
    pub stopped: bool,
}

impl ScanReport {
    pub fn probed(&self) -> usize {
        self.found + self.absent + self.failed
    }
}

/// Sweep keys from `start_key` upward until the consecutive-empty counter
/// reaches the policy threshold (or the key-space/stop signal ends it).
///
/// `probe` runs on pool workers and must fold probe + extract + submit;
/// it returns the record count forwarded to the sink. Completions are
/// handled in arrival order — no cross-key ordering is assumed.
pub fn scan_stream(
    policy: &ScanPolicy,
    start_key: u32,
    probe: impl Fn(u32) -> ProbeOutcome<usize> + Sync,
    pb: &ProgressBar,
) -> ScanReport {
    let keys = KeySpace::new(start_key, policy.max_key);
    let empty_streak = AtomicUsize::new(0);
    // 0 is "nothing found yet"; real keys in both streams start at 1
    let last_found = AtomicU32::new(0);
    let found = AtomicUsize::new(0);
    let absent = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    rayon::scope(|s| {
        for _ in 0..policy.workers.max(1) {
            s.spawn(|_| {
                while let Some(key) = keys.claim() {
                    if is_shutdown_requested() {
                        keys.halt();
                        break;
                    }
                    if let Some(max) = policy.dispatch_jitter {
                        std::thread::sleep(max.mul_f64(fastrand::f64()));
                    }
                    match probe(key) {
                        ProbeOutcome::Found(_records) => {
                            empty_streak.store(0, Ordering::Relaxed);
                            last_found.fetch_max(key, Ordering::Relaxed);
                            found.fetch_add(1, Ordering::Relaxed);
                        }
                        ProbeOutcome::Absent => {
                            absent.fetch_add(1, Ordering::Relaxed);
                            bump_empty(&empty_streak, policy.empty_threshold, &keys);
                        }
                        ProbeOutcome::Failed => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            bump_empty(&empty_streak, policy.empty_threshold, &keys);
                        }
                    }
                    pb.set_position(u64::from(key));
                    pb.set_message(format!(
                        "key #{key}, found {}",
                        fmt_num(found.load(Ordering::Relaxed))
                    ));
                }
            });
        }
    });

    let last = last_found.load(Ordering::Relaxed);
    let stopped = is_shutdown_requested();
    ScanReport {
        start_key,
        last_found: (last > 0).then_some(last),
        found: found.load(Ordering::Relaxed),
        absent: absent.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        phase: if stopped {
            StreamPhase::Scanning
        } else {
            StreamPhase::Exhausted
        },
        stopped,
    }
}

fn bump_empty(streak: &AtomicUsize, threshold: usize, keys: &KeySpace) {
    if streak.fetch_add(1, Ordering::Relaxed) + 1 >= threshold {
        keys.halt();
    }
}

/// One-shot retry pass over keys that failed during the main scan.
///
/// Keys below the high-water mark that are still missing from durable
/// storage are very likely transient casualties, so each is attempted
/// exactly once, in bounded batches with their own pool, independent of
/// the consecutive-empty policy. Returns how many were recovered.
pub fn recover_gaps(
    policy: &ScanPolicy,
    gaps: &[u32],
    probe: impl Fn(u32) -> ProbeOutcome<usize> + Sync,
    pb: &ProgressBar,
) -> usize {
    log::debug!("{}: {} keys, batches of {}", StreamPhase::GapRecovery, gaps.len(), policy.gap_batch);
    let recovered = AtomicUsize::new(0);
    for batch in gaps.chunks(policy.gap_batch.max(1)) {
        if is_shutdown_requested() {
            break;
        }
        rayon::scope(|s| {
            for &key in batch {
                let probe = &probe;
                let recovered = &recovered;
                s.spawn(move |_| {
                    if is_shutdown_requested() {
                        return;
                    }
                    if let ProbeOutcome::Found(_) = probe(key) {
                        recovered.fetch_add(1, Ordering::Relaxed);
                    }
                    pb.inc(1);
                });
            }
        });
    }
    recovered.load(Ordering::Relaxed)
}
