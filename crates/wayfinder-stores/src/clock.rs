//! Monotonic clock abstraction.
//!
//! Cache expiry and token-bucket refill are pure arithmetic over "seconds
//! since some origin". Injecting the time source keeps both deterministic
//! under test without real waiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic time source measured in fractional seconds.
pub trait Clock: Send + Sync {
    /// Seconds elapsed since the clock's origin. Never decreases.
    fn now(&self) -> f64;
}

/// Process clock backed by `Instant`, anchored at construction.
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Manually advanced clock for deterministic expiry/refill tests.
///
/// Stores the current reading as `f64` bits in an atomic so readers never
/// block and the type stays lock-free across threads.
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::starting_at(0.0)
    }

    pub fn starting_at(seconds: f64) -> Self {
        Self {
            bits: AtomicU64::new(seconds.to_bits()),
        }
    }

    /// Move the clock forward by `seconds`.
    pub fn advance(&self, seconds: f64) {
        let next = self.reading() + seconds;
        self.bits.store(next.to_bits(), Ordering::SeqCst);
    }

    fn reading(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.reading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now(), 0.0);
        clock.advance(1.5);
        clock.advance(0.5);
        assert_eq!(clock.now(), 2.0);
    }

    #[test]
    fn test_monotonic_clock_never_decreases() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
