//! Geocoding specialist: resolves a leg's destination text into
//! coordinates and a bounding box.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use wayfinder_core::{AgentHandler, HandlerError, PlanTask, TripSpec};
use wayfinder_stores::{make_cache_key, normalize_text};

use crate::context::{evidence_item, leg_at, leg_index, SharedResults, ToolContext};
use crate::offline::stable_fold;
use crate::ProviderError;

/// Candidates requested per geocode call.
pub const GEO_CANDIDATE_LIMIT: usize = 5;

/// Confidence attached to offline-derived coordinates.
pub const OFFLINE_GEO_CONFIDENCE: f64 = 0.65;

/// One resolved place.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoCandidate {
    pub lat: f64,
    pub lon: f64,
    /// [south, west, north, east]
    pub bbox: [f64; 4],
    pub place_name: String,
    pub country_code: String,
    pub confidence: f64,
}

/// Seam for geocoding backends.
pub trait GeoProvider: Send + Sync {
    fn geocode(
        &self,
        query: &str,
        locale: &str,
        limit: usize,
    ) -> Result<Vec<GeoCandidate>, ProviderError>;
}

/// Derives coordinates from the destination text alone.
///
/// Latitude comes from a stable fold of the normalized text and
/// longitude from the reversed text, each mapped into a fixed band, so
/// the same destination always resolves to the same point without any
/// network access.
#[derive(Debug, Default)]
pub struct OfflineGeoProvider;

impl GeoProvider for OfflineGeoProvider {
    fn geocode(
        &self,
        query: &str,
        _locale: &str,
        _limit: usize,
    ) -> Result<Vec<GeoCandidate>, ProviderError> {
        let normalized = normalize_text(query);
        if normalized.is_empty() {
            return Ok(Vec::new());
        }
        let reversed: String = normalized.chars().rev().collect();
        let lat = derive_coordinate(&normalized, 10.0);
        let lon = derive_coordinate(&reversed, 5.0);
        Ok(vec![GeoCandidate {
            lat,
            lon,
            bbox: [lat - 0.1, lon - 0.1, lat + 0.1, lon + 0.1],
            place_name: query.trim().to_string(),
            country_code: "xx".to_string(),
            confidence: OFFLINE_GEO_CONFIDENCE,
        }])
    }
}

fn derive_coordinate(text: &str, base: f64) -> f64 {
    base + (stable_fold(text) % 7_000) as f64 / 100.0
}

/// Handler for `geo` tasks: cache-first, rate-limited, normalized to
/// the standard result envelope.
pub struct GeoHandler {
    trip: Arc<TripSpec>,
    context: ToolContext,
    shared: Arc<SharedResults>,
    provider: Arc<dyn GeoProvider>,
}

impl GeoHandler {
    pub fn new(
        trip: Arc<TripSpec>,
        context: ToolContext,
        shared: Arc<SharedResults>,
        provider: Arc<dyn GeoProvider>,
    ) -> Self {
        Self {
            trip,
            context,
            shared,
            provider,
        }
    }

    fn normalize(
        &self,
        query: &str,
        locale: &str,
        mut candidates: Vec<GeoCandidate>,
        cache_key: String,
    ) -> Value {
        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let rows: Vec<Value> = candidates.iter().map(candidate_json).collect();
        let selected = rows.first().cloned().unwrap_or(Value::Null);
        let confidence = candidates.first().map_or(0.0, |c| c.confidence);
        let warnings: Vec<String> = if candidates.is_empty() {
            vec!["No geocoding candidates returned.".to_string()]
        } else {
            Vec::new()
        };
        json!({
            "data": {
                "query": query,
                "locale": locale,
                "candidates": rows,
                "selected": selected,
            },
            "evidence": [evidence_item(
                "geo",
                format!("Geocoding for '{query}'"),
                format!("{} candidate(s) for locale '{locale}'.", candidates.len()),
                self.trip.request_context.now_ts,
            )],
            "confidence": confidence,
            "warnings": warnings,
            "cache_key": cache_key,
        })
    }
}

fn candidate_json(candidate: &GeoCandidate) -> Value {
    json!({
        "lat": candidate.lat,
        "lon": candidate.lon,
        "bbox": candidate.bbox,
        "place_name": candidate.place_name,
        "country_code": candidate.country_code,
        "confidence": candidate.confidence,
    })
}

#[async_trait]
impl AgentHandler for GeoHandler {
    async fn handle(&self, task: &PlanTask) -> Result<Value, HandlerError> {
        let index = leg_index(&task.input_ref)?;
        let leg = leg_at(&self.trip, index, &task.input_ref)?;
        let locale = self.trip.request_context.output_language.clone();
        let cache_key = make_cache_key(
            "geocode",
            &[
                normalize_text(&leg.destination_text).into(),
                locale.as_str().into(),
                GEO_CANDIDATE_LIMIT.into(),
            ],
        );

        if let Some(hit) = self.context.cached(&cache_key)? {
            debug!(task_id = %task.task_id, "geocode cache hit");
            self.shared.publish(&task.task_id, &hit)?;
            return Ok(hit);
        }

        self.context.acquire().await?;
        let candidates = self
            .provider
            .geocode(&leg.destination_text, &locale, GEO_CANDIDATE_LIMIT)
            .map_err(|err| HandlerError::Other(err.to_string()))?;
        let payload = self.normalize(&leg.destination_text, &locale, candidates, cache_key.clone());
        self.context.store(&cache_key, &payload)?;
        self.shared.publish(&task.task_id, &payload)?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::testing::{manual_stores, trip_fixture};
    use wayfinder_core::{AgentKind, StandardAgentResult};

    struct CountingProvider {
        calls: AtomicUsize,
    }

    impl CountingProvider {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl GeoProvider for CountingProvider {
        fn geocode(
            &self,
            query: &str,
            locale: &str,
            limit: usize,
        ) -> Result<Vec<GeoCandidate>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            OfflineGeoProvider.geocode(query, locale, limit)
        }
    }

    struct EmptyProvider;

    impl GeoProvider for EmptyProvider {
        fn geocode(
            &self,
            _query: &str,
            _locale: &str,
            _limit: usize,
        ) -> Result<Vec<GeoCandidate>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn geo_task(index: usize) -> PlanTask {
        PlanTask::new(
            format!("geo_leg_{index}"),
            AgentKind::Geo,
            format!("legs[{index}]"),
        )
    }

    #[test]
    fn test_offline_geocode_is_deterministic() {
        let provider = OfflineGeoProvider;
        let first = provider.geocode("Lisbon", "en", 5).unwrap();
        let second = provider.geocode("  Lisbon  ", "en", 5).unwrap();
        assert_eq!(first, second);

        let candidate = &first[0];
        assert!((10.0..=80.0).contains(&candidate.lat));
        assert!((5.0..=75.0).contains(&candidate.lon));
        assert_eq!(candidate.bbox[0], candidate.lat - 0.1);
        assert_eq!(candidate.bbox[3], candidate.lon + 0.1);
        assert_eq!(candidate.country_code, "xx");
        assert_eq!(candidate.confidence, OFFLINE_GEO_CONFIDENCE);
    }

    #[test]
    fn test_handler_normalizes_and_caches() {
        let (stores, _clock) = manual_stores();
        let trip = trip_fixture(&["Lisbon"]);
        let provider = CountingProvider::new();
        let handler = GeoHandler::new(
            Arc::clone(&trip),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::clone(&provider) as Arc<dyn GeoProvider>,
        );

        let payload = tokio_test::block_on(handler.handle(&geo_task(0))).unwrap();
        let result = StandardAgentResult::from_value(payload.clone()).unwrap();
        assert_eq!(result.confidence, OFFLINE_GEO_CONFIDENCE);
        assert_eq!(result.evidence[0].source, "geo");
        assert!(result.cache_key.starts_with("geocode:"));
        assert_eq!(payload["data"]["query"], "Lisbon");
        assert_eq!(
            payload["data"]["selected"]["place_name"],
            payload["data"]["candidates"][0]["place_name"]
        );

        let again = tokio_test::block_on(handler.handle(&geo_task(0))).unwrap();
        assert_eq!(again, payload);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_reports_wait_when_rate_limited() {
        let (stores, _clock) = manual_stores();
        let trip = trip_fixture(&["Lisbon", "Porto"]);
        let handler = GeoHandler::new(
            trip,
            ToolContext::new(Arc::clone(&stores.cache), 60.0)
                .with_limiter(Arc::clone(&stores.geo_limiter)),
            Arc::new(SharedResults::default()),
            Arc::new(OfflineGeoProvider),
        );

        tokio_test::block_on(handler.handle(&geo_task(0))).unwrap();
        // Second leg misses the cache; the manual clock never refills
        // the bucket, so even the waited retry is denied.
        let err = tokio_test::block_on(handler.handle(&geo_task(1))).unwrap_err();
        match err {
            HandlerError::RateLimited { wait_seconds } => assert!(wait_seconds > 0.0),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn test_handler_rejects_unknown_leg() {
        let (stores, _clock) = manual_stores();
        let handler = GeoHandler::new(
            trip_fixture(&["Lisbon"]),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(OfflineGeoProvider),
        );

        let err = tokio_test::block_on(handler.handle(&geo_task(9))).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInputRef(_)));
    }

    #[test]
    fn test_empty_candidates_surface_zero_confidence() {
        let (stores, _clock) = manual_stores();
        let handler = GeoHandler::new(
            trip_fixture(&["Lisbon"]),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(EmptyProvider),
        );

        let payload = tokio_test::block_on(handler.handle(&geo_task(0))).unwrap();
        assert_eq!(payload["confidence"], 0.0);
        assert_eq!(payload["data"]["selected"], Value::Null);
        assert_eq!(payload["warnings"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_handler_publishes_shared_result() {
        let (stores, _clock) = manual_stores();
        let shared = Arc::new(SharedResults::default());
        let handler = GeoHandler::new(
            trip_fixture(&["Lisbon"]),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::clone(&shared),
            Arc::new(OfflineGeoProvider),
        );

        tokio_test::block_on(handler.handle(&geo_task(0))).unwrap();
        let mirrored = shared.get("geo_leg_0").unwrap().unwrap();
        assert!(mirrored["data"]["selected"]["lat"].is_f64());
    }
}
