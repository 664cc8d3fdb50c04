//! # Wayfinder Stores
//!
//! Shared in-memory primitives used by every specialist invocation:
//! - MemoryCache: TTL + LRU cache over JSON values
//! - RateLimiter: token-bucket limiter with fractional costs
//! - Clock: injectable monotonic time source (deterministic in tests)
//! - fingerprint helpers: stable cache-key derivation
//!
//! Nothing in this crate performs I/O; callers own all network access.

mod cache;
mod clock;
mod fingerprint;
mod limiter;

pub use cache::MemoryCache;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use fingerprint::{hash_bbox, make_cache_key, normalize_text, stable_json_hash, KeyPart};
pub use limiter::RateLimiter;

use thiserror::Error;

/// Store error types
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    Invalid(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
