//! Token-bucket rate limiter.

use std::sync::{Arc, Mutex};

use crate::clock::Clock;
use crate::StoreError;

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: f64,
}

/// Token bucket with a fractional refill rate.
///
/// Every operation refills first (elapsed seconds times rate, capped at
/// capacity), then consumes or reports. A denied `allow` never consumes
/// partial tokens.
pub struct RateLimiter {
    rate_per_second: f64,
    capacity: f64,
    clock: Arc<dyn Clock>,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    pub fn new(
        rate_per_second: f64,
        capacity: f64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        if rate_per_second <= 0.0 {
            return Err(StoreError::Invalid(
                "rate_per_second must be > 0".to_string(),
            ));
        }
        if capacity <= 0.0 {
            return Err(StoreError::Invalid("capacity must be > 0".to_string()));
        }
        let last_refill = clock.now();
        Ok(Self {
            rate_per_second,
            capacity,
            clock,
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill,
            }),
        })
    }

    pub fn rate_per_second(&self) -> f64 {
        self.rate_per_second
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    /// Try to consume `cost` tokens. Returns false without consuming when
    /// the bucket cannot cover the full cost.
    pub fn allow(&self, cost: f64) -> Result<bool, StoreError> {
        if cost <= 0.0 {
            return Err(StoreError::Invalid("cost must be > 0".to_string()));
        }
        let mut state = self.lock_state()?;
        self.refill(&mut state);
        if state.tokens >= cost {
            state.tokens -= cost;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Seconds until `cost` tokens will be available; 0 when already covered.
    pub fn wait_time(&self, cost: f64) -> Result<f64, StoreError> {
        if cost <= 0.0 {
            return Err(StoreError::Invalid("cost must be > 0".to_string()));
        }
        let mut state = self.lock_state()?;
        self.refill(&mut state);
        if state.tokens >= cost {
            return Ok(0.0);
        }
        Ok((cost - state.tokens) / self.rate_per_second)
    }

    fn refill(&self, state: &mut BucketState) {
        let now = self.clock.now();
        let elapsed = (now - state.last_refill).max(0.0);
        state.last_refill = now;
        state.tokens = self
            .capacity
            .min(state.tokens + elapsed * self.rate_per_second);
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, BucketState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }
}
