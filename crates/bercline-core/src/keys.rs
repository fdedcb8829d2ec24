//! Lazy, cancellable key-space generator.
//!
//! Workers claim candidate keys one at a time; the coordinator halts the
//! sequence once the exhaustion threshold trips, so the upper bound is a
//! policy parameter rather than a loop constant.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Monotonically increasing sequence of candidate keys in `[start, end)`.
pub struct KeySpace {
    next: AtomicU32,
    end: u32,
    halted: AtomicBool,
}

impl KeySpace {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            next: AtomicU32::new(start),
            end,
            halted: AtomicBool::new(false),
        }
    }

    /// Atomically claim the next key, or `None` if halted or exhausted.
    pub fn claim(&self) -> Option<u32> {
        if self.halted.load(Ordering::Relaxed) {
            return None;
        }
        let key = self.next.fetch_add(1, Ordering::Relaxed);
        (key < self.end).then_some(key)
    }

    /// Stop handing out keys. In-flight probes are unaffected.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::Relaxed);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Relaxed)
    }
}
