//! Incremental sink: accumulate records per partition, flush in batches.
//!
//! A single flusher thread owns the accumulator; workers hand it batches
//! through a bounded channel, so partition files never see two writers.
//! Flushes fire when enough records have arrived since the last flush or
//! when the flush interval elapses, and always once more on close.

use std::hash::Hash;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// Durable storage for one stream's partitions.
///
/// `append` merges a batch into the partition's file, creating it with a
/// header/structure on first write. Each call must be atomic.
pub trait PartitionStore<K, R> {
    fn append(&self, partition: &K, records: &[R]) -> std::io::Result<()>;
}

impl<K, R, S: PartitionStore<K, R> + ?Sized> PartitionStore<K, R> for std::sync::Arc<S> {
    fn append(&self, partition: &K, records: &[R]) -> std::io::Result<()> {
        (**self).append(partition, records)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    /// Records accumulated since the last flush that force a new one
    pub batch_size: usize,
    /// Time-based flush trigger
    pub flush_interval: Duration,
    /// Bound of the submit channel (backpressure on fast producers)
    pub queue_depth: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            batch_size: 250,
            flush_interval: Duration::from_secs(5),
            queue_depth: 256,
        }
    }
}

/// Counters returned by the flusher on close.
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkStats {
    /// Records received from producers
    pub submitted: usize,
    /// Records durably written
    pub flushed: usize,
    /// Flush operations that had pending work
    pub flushes: usize,
    /// Partition writes that failed (records held for retry)
    pub write_errors: usize,
    /// Records still unwritten after the final flush
    pub lost: usize,
}

/// Handle to a running sink; dropping the handle without `close` leaks the
/// flusher, so runners call `close` and surface the stats.
pub struct RecordSink<K, R> {
    tx: SyncSender<(K, Vec<R>)>,
    handle: JoinHandle<SinkStats>,
}

impl<K, R> RecordSink<K, R>
where
    K: Eq + Hash + Clone + Send + std::fmt::Display + 'static,
    R: Send + 'static,
{
    /// Start the flusher thread over `store`.
    pub fn spawn<S>(store: S, config: SinkConfig) -> std::io::Result<Self>
    where
        S: PartitionStore<K, R> + Send + 'static,
    {
        let (tx, rx) = std::sync::mpsc::sync_channel(config.queue_depth.max(1));
        let handle = std::thread::Builder::new()
            .name("sink-flusher".into())
            .spawn(move || flusher(&rx, &store, &config))?;
        Ok(Self { tx, handle })
    }

    /// Enqueue a batch for `partition`. Blocks only when the flusher is
    /// behind (bounded queue).
    pub fn submit(&self, partition: K, records: Vec<R>) {
        if records.is_empty() {
            return;
        }
        let count = records.len();
        if self.tx.send((partition, records)).is_err() {
            log::error!("sink flusher is gone; {count} records dropped");
        }
    }

    /// Drain the queue, perform the mandatory final flush, return stats.
    pub fn close(self) -> std::io::Result<SinkStats> {
        let Self { tx, handle } = self;
        drop(tx);
        handle
            .join()
            .map_err(|_| std::io::Error::other("sink flusher panicked"))
    }
}

fn flusher<K, R, S>(rx: &Receiver<(K, Vec<R>)>, store: &S, config: &SinkConfig) -> SinkStats
where
    K: Eq + Hash + Clone + std::fmt::Display,
    S: PartitionStore<K, R>,
{
    // Accumulator: owned by this thread exclusively between flushes
    let mut pending: FxHashMap<K, Vec<R>> = FxHashMap::default();
    let mut stats = SinkStats::default();
    let mut since_flush = 0usize;
    let mut last_flush = Instant::now();
    let poll = config.flush_interval.min(Duration::from_millis(250));

    loop {
        match rx.recv_timeout(poll) {
            Ok((partition, records)) => {
                stats.submitted += records.len();
                since_flush += records.len();
                pending.entry(partition).or_default().extend(records);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        let due = since_flush >= config.batch_size
            || (last_flush.elapsed() >= config.flush_interval && !pending.is_empty());
        if due {
            flush(store, &mut pending, &mut stats);
            since_flush = 0;
            last_flush = Instant::now();
        }
    }

    // Mandatory final flush: nothing may be silently dropped on shutdown
    flush(store, &mut pending, &mut stats);
    stats.lost = pending.values().map(Vec::len).sum();
    if stats.lost > 0 {
        log::error!(
            "sink closed with {} unwritable records across {} partition(s)",
            stats.lost,
            pending.len()
        );
    }
    stats
}

/// Write every partition with pending records; clear only on success.
///
/// A failed partition is logged and skipped, never blocking sibling
/// partitions; its records stay accumulated for the next cycle.
fn flush<K, R, S>(store: &S, pending: &mut FxHashMap<K, Vec<R>>, stats: &mut SinkStats)
where
    K: Eq + Hash + Clone + std::fmt::Display,
    S: PartitionStore<K, R>,
{
    if pending.is_empty() {
        return;
    }
    stats.flushes += 1;
    let partitions: Vec<K> = pending.keys().cloned().collect();
    for partition in partitions {
        let records = &pending[&partition];
        match store.append(&partition, records) {
            Ok(()) => {
                stats.flushed += records.len();
                pending.remove(&partition);
            }
            Err(e) => {
                stats.write_errors += 1;
                log::warn!(
                    "flush failed for partition {partition}: {e} ({} records held for retry)",
                    records.len()
                );
            }
        }
    }
}
