//! Exponential backoff with jitter for probe retries.
//!
//! The policy is a pure delay function; the sleeper is injected by the
//! caller so retry behavior is testable without real sleeps.

use std::time::Duration;

/// Backoff schedule: `base * 2^attempt` plus up to `jitter` of uniform noise.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Delay before the first retry
    pub base: Duration,
    /// Upper bound of the uniform jitter added to each delay
    pub jitter: Duration,
    /// Total attempts before giving up (first try included)
    pub max_attempts: u32,
}

impl BackoffPolicy {
    pub const fn new(base: Duration, jitter: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            jitter,
            max_attempts,
        }
    }

    /// Deterministic delay component for the nth failed attempt (0-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Delay with uniform jitter in `[0, self.jitter)` applied.
    pub fn jittered_delay(&self, attempt: u32) -> Duration {
        self.delay(attempt) + self.jitter.mul_f64(fastrand::f64())
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(200), Duration::from_secs(1), 3)
    }
}

/// Errors that can distinguish transient from permanent failure.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Retry a fallible operation under `policy`, sleeping through `sleep`.
///
/// Calls `attempt_fn` up to `policy.max_attempts` times. Non-retryable
/// errors short-circuit. Returns the final error on exhaustion.
pub fn retry<T, E>(
    policy: &BackoffPolicy,
    label: &str,
    mut sleep: impl FnMut(Duration),
    mut attempt_fn: impl FnMut() -> Result<T, E>,
) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match attempt_fn() {
            Ok(v) => return Ok(v),
            Err(e) if attempt + 1 < policy.max_attempts && e.is_retryable() => {
                let delay = policy.jittered_delay(attempt);
                attempt += 1;
                log::debug!(
                    "{label}: attempt {attempt}/{} failed: {e}, retrying in {delay:?}",
                    policy.max_attempts
                );
                sleep(delay);
            }
            Err(e) => {
                log::debug!("{label}: giving up after {} attempt(s): {e}", attempt + 1);
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Transient;

    impl std::fmt::Display for Transient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("transient")
        }
    }

    impl Retryable for Transient {
        fn is_retryable(&self) -> bool {
            true
        }
    }

    #[derive(Debug)]
    struct Permanent;

    impl std::fmt::Display for Permanent {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("permanent")
        }
    }

    impl Retryable for Permanent {
        fn is_retryable(&self) -> bool {
            false
        }
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = BackoffPolicy::new(Duration::from_millis(200), Duration::ZERO, 5);
        assert_eq!(policy.delay(0), Duration::from_millis(200));
        assert_eq!(policy.delay(1), Duration::from_millis(400));
        assert_eq!(policy.delay(2), Duration::from_millis(800));
        assert_eq!(policy.delay(3), Duration::from_millis(1600));
    }

    #[test]
    fn delay_is_monotonic() {
        let policy = BackoffPolicy::default();
        let mut prev = Duration::ZERO;
        for attempt in 0..10 {
            let d = policy.delay(attempt);
            assert!(d >= prev, "delay({attempt}) = {d:?} < {prev:?}");
            prev = d;
        }
    }

    #[test]
    fn jittered_delay_bounded() {
        let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(1), 3);
        for attempt in 0..4 {
            let d = policy.jittered_delay(attempt);
            assert!(d >= policy.delay(attempt));
            assert!(d < policy.delay(attempt) + Duration::from_secs(1));
        }
    }

    #[test]
    fn gives_up_at_attempt_ceiling() {
        let policy = BackoffPolicy::new(Duration::from_millis(1), Duration::ZERO, 5);
        let mut calls = 0;
        let result: Result<(), Transient> = retry(&policy, "test", |_| {}, || {
            calls += 1;
            Err(Transient)
        });
        assert!(result.is_err());
        assert_eq!(calls, 5);
    }

    #[test]
    fn sleeps_follow_the_schedule() {
        let policy = BackoffPolicy::new(Duration::from_millis(10), Duration::ZERO, 4);
        let mut slept = Vec::new();
        let _: Result<(), Transient> = retry(&policy, "test", |d| slept.push(d), || Err(Transient));
        assert_eq!(
            slept,
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(40),
            ]
        );
    }

    #[test]
    fn permanent_error_short_circuits() {
        let policy = BackoffPolicy::new(Duration::from_millis(1), Duration::ZERO, 5);
        let mut calls = 0;
        let result: Result<(), Permanent> = retry(&policy, "test", |_| {}, || {
            calls += 1;
            Err(Permanent)
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn success_after_failures() {
        let policy = BackoffPolicy::new(Duration::from_millis(1), Duration::ZERO, 5);
        let mut calls = 0;
        let result: Result<u32, Transient> = retry(&policy, "test", |_| {}, || {
            calls += 1;
            if calls < 3 { Err(Transient) } else { Ok(42) }
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 3);
    }
}
