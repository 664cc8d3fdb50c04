//! Shared wiring for a single pipeline run: per-family cache/limiter
//! handles and the cross-handler result mirror.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::debug;

use wayfinder_core::{HandlerError, TaskId, TripLeg, TripSpec};
use wayfinder_config::WayfinderConfig;
use wayfinder_stores::{Clock, MemoryCache, RateLimiter, StoreError};

/// Longest denial the context will wait out before surfacing it.
const MAX_LIMITER_WAIT_SECONDS: f64 = 5.0;

/// Slack added on top of the reported wait so the bucket has refilled
/// by the time the retry lands.
const LIMITER_WAIT_PAD_SECONDS: f64 = 0.05;

/// Long-lived cache and limiter instances shared across pipeline runs.
///
/// Handlers are rebuilt per run (they capture the run's `TripSpec`), but
/// the stores persist so cache hits and token buckets carry over.
pub struct ToolStores {
    pub cache: Arc<MemoryCache>,
    pub geo_limiter: Arc<RateLimiter>,
    pub poi_limiter: Arc<RateLimiter>,
}

impl ToolStores {
    pub fn from_config(
        config: &WayfinderConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            cache: Arc::new(MemoryCache::new(config.cache.max_size, Arc::clone(&clock))?),
            geo_limiter: Arc::new(RateLimiter::new(
                config.limits.geo.rate_per_second,
                config.limits.geo.capacity,
                Arc::clone(&clock),
            )?),
            poi_limiter: Arc::new(RateLimiter::new(
                config.limits.poi.rate_per_second,
                config.limits.poi.capacity,
                clock,
            )?),
        })
    }
}

/// Cache and limiter handles for one tool family.
#[derive(Clone)]
pub struct ToolContext {
    cache: Arc<MemoryCache>,
    limiter: Option<Arc<RateLimiter>>,
    ttl_seconds: f64,
}

impl ToolContext {
    pub fn new(cache: Arc<MemoryCache>, ttl_seconds: f64) -> Self {
        Self {
            cache,
            limiter: None,
            ttl_seconds,
        }
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Cache-first lookup for a normalized payload.
    pub fn cached(&self, key: &str) -> Result<Option<Value>, HandlerError> {
        self.cache.get(key).map_err(store_error)
    }

    /// Consume one token, waiting out a short denial once before
    /// surfacing it as an error.
    pub async fn acquire(&self) -> Result<(), HandlerError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        if limiter.allow(1.0).map_err(store_error)? {
            return Ok(());
        }
        let wait_seconds = limiter.wait_time(1.0).map_err(store_error)?;
        if wait_seconds <= MAX_LIMITER_WAIT_SECONDS {
            debug!(wait_seconds, "tool budget exhausted; waiting for refill");
            tokio::time::sleep(Duration::from_secs_f64(
                wait_seconds + LIMITER_WAIT_PAD_SECONDS,
            ))
            .await;
            if limiter.allow(1.0).map_err(store_error)? {
                return Ok(());
            }
        }
        let wait_seconds = limiter.wait_time(1.0).map_err(store_error)?;
        Err(HandlerError::RateLimited { wait_seconds })
    }

    /// Store a normalized payload under the family TTL.
    pub fn store(&self, key: &str, payload: &Value) -> Result<(), HandlerError> {
        self.cache
            .set(key, payload.clone(), self.ttl_seconds)
            .map_err(store_error)
    }
}

fn store_error(err: StoreError) -> HandlerError {
    HandlerError::Store(err.to_string())
}

/// One provenance entry in the standard result envelope.
///
/// `retrieved_at` is the run's reference instant rather than wall-clock
/// time, keeping payloads reproducible for a fixed request.
pub(crate) fn evidence_item(
    source: &str,
    title: String,
    snippet: String,
    retrieved_at: DateTime<Utc>,
) -> Value {
    json!({
        "source": source,
        "title": title,
        "snippet": snippet,
        "retrieved_at": retrieved_at.to_rfc3339(),
    })
}

/// Payloads published by handlers during the current run, keyed by task id.
///
/// The executor keeps the authoritative result map; this mirror lets
/// downstream handlers read upstream payloads (weather and POI lookups
/// reuse the geocoding selection) without widening the handler trait.
#[derive(Default)]
pub struct SharedResults {
    inner: Mutex<BTreeMap<String, Value>>,
}

impl SharedResults {
    pub fn publish(&self, task_id: &TaskId, payload: &Value) -> Result<(), HandlerError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| HandlerError::Store("shared results lock poisoned".to_string()))?;
        inner.insert(task_id.as_str().to_string(), payload.clone());
        Ok(())
    }

    pub fn get(&self, task_id: &str) -> Result<Option<Value>, HandlerError> {
        let inner = self
            .inner
            .lock()
            .map_err(|_| HandlerError::Store("shared results lock poisoned".to_string()))?;
        Ok(inner.get(task_id).cloned())
    }
}

/// Parse a `legs[N]` reference into its index.
pub fn leg_index(input_ref: &str) -> Result<usize, HandlerError> {
    parse_leg(input_ref).ok_or_else(|| HandlerError::InvalidInputRef(input_ref.to_string()))
}

/// Parse a `legs[A]->legs[B]` transfer reference into both indices.
pub fn transfer_indices(input_ref: &str) -> Result<(usize, usize), HandlerError> {
    input_ref
        .split_once("->")
        .and_then(|(origin, destination)| Some((parse_leg(origin)?, parse_leg(destination)?)))
        .ok_or_else(|| HandlerError::InvalidInputRef(input_ref.to_string()))
}

fn parse_leg(text: &str) -> Option<usize> {
    text.trim().strip_prefix("legs[")?.strip_suffix(']')?.parse().ok()
}

/// Look up a leg by index, reporting the offending reference on a miss.
pub(crate) fn leg_at<'a>(
    trip: &'a TripSpec,
    index: usize,
    input_ref: &str,
) -> Result<&'a TripLeg, HandlerError> {
    trip.legs
        .get(index)
        .ok_or_else(|| HandlerError::InvalidInputRef(input_ref.to_string()))
}
