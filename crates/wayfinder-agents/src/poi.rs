//! Points-of-interest specialist: candidate activities inside a leg's
//! bounding box, filtered by preference tags.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use wayfinder_core::{AgentHandler, HandlerError, PlanTask, TripLeg, TripSpec};
use wayfinder_stores::{hash_bbox, make_cache_key, normalize_text};

use crate::context::{evidence_item, leg_at, leg_index, SharedResults, ToolContext};
use crate::ProviderError;

/// POIs requested per leg.
pub const POI_LIMIT: usize = 8;

/// Tags used when the traveler stated no preferences.
pub const DEFAULT_POI_TAGS: [&str; 2] = ["tourism=attraction", "tourism=museum"];

/// One point of interest.
#[derive(Debug, Clone, PartialEq)]
pub struct PoiEntry {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// OSM-style key/value pairs
    pub tags: BTreeMap<String, String>,
}

/// Seam for POI backends.
pub trait PoiProvider: Send + Sync {
    fn search(
        &self,
        place_name: &str,
        bbox: &[f64; 4],
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<PoiEntry>, ProviderError>;
}

/// Derives a fixed activity roster from the destination name.
///
/// Every destination gets an Old Town Walk and a City Museum; each
/// extra requested tag contributes one more entry placed near the
/// bounding-box center.
#[derive(Debug, Default)]
pub struct OfflinePoiProvider;

impl PoiProvider for OfflinePoiProvider {
    fn search(
        &self,
        place_name: &str,
        bbox: &[f64; 4],
        tags: &[String],
        limit: usize,
    ) -> Result<Vec<PoiEntry>, ProviderError> {
        let place = match place_name.trim() {
            "" => "Destination",
            trimmed => trimmed,
        };
        let mut entries = vec![
            entry(place, "Old Town Walk", ("tourism", "attraction"), bbox, 0),
            entry(place, "City Museum", ("tourism", "museum"), bbox, 1),
        ];
        for tag in tags {
            let (key, value) = split_tag(tag);
            if key == "tourism" && matches!(value, "attraction" | "museum") {
                continue;
            }
            let slot = entries.len();
            entries.push(entry(place, &tag_label(value), (key, value), bbox, slot));
        }
        entries.truncate(limit);
        Ok(entries)
    }
}

fn entry(
    place: &str,
    label: &str,
    (key, value): (&str, &str),
    bbox: &[f64; 4],
    slot: usize,
) -> PoiEntry {
    PoiEntry {
        name: format!("{place} {label}"),
        lat: (bbox[0] + bbox[2]) / 2.0 + slot as f64 * 0.003,
        lon: (bbox[1] + bbox[3]) / 2.0 + slot as f64 * 0.003,
        tags: BTreeMap::from([(key.to_string(), value.to_string())]),
    }
}

/// Split `key=value`; bare words default to the tourism key.
fn split_tag(tag: &str) -> (&str, &str) {
    match tag.split_once('=') {
        Some((key, value)) => (key, value),
        None => ("tourism", tag),
    }
}

fn tag_label(value: &str) -> String {
    value
        .split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Handler for `poi` tasks.
pub struct PoiHandler {
    trip: Arc<TripSpec>,
    context: ToolContext,
    shared: Arc<SharedResults>,
    provider: Arc<dyn PoiProvider>,
}

impl PoiHandler {
    pub fn new(
        trip: Arc<TripSpec>,
        context: ToolContext,
        shared: Arc<SharedResults>,
        provider: Arc<dyn PoiProvider>,
    ) -> Self {
        Self {
            trip,
            context,
            shared,
            provider,
        }
    }

    fn bounding_box(&self, index: usize, leg: &TripLeg) -> Result<[f64; 4], HandlerError> {
        if let Some(geo) = &leg.geo {
            return Ok(geo.bbox);
        }
        let upstream = self.shared.get(&format!("geo_leg_{index}"))?;
        upstream.as_ref().and_then(selected_bbox).ok_or_else(|| {
            HandlerError::Other(format!("missing bounding box for poi on leg {index}"))
        })
    }

    fn requested_tags(&self) -> Vec<String> {
        let stated: Vec<String> = self
            .trip
            .preferences
            .tags
            .iter()
            .map(|tag| normalize_text(tag))
            .filter(|tag| !tag.is_empty())
            .collect();
        if stated.is_empty() {
            DEFAULT_POI_TAGS.iter().map(|tag| tag.to_string()).collect()
        } else {
            stated
        }
    }
}

fn selected_bbox(payload: &Value) -> Option<[f64; 4]> {
    let values = payload
        .get("data")?
        .get("selected")?
        .get("bbox")?
        .as_array()?;
    if values.len() != 4 {
        return None;
    }
    let mut bbox = [0.0; 4];
    for (slot, value) in bbox.iter_mut().zip(values) {
        *slot = value.as_f64()?;
    }
    Some(bbox)
}

#[async_trait]
impl AgentHandler for PoiHandler {
    async fn handle(&self, task: &PlanTask) -> Result<Value, HandlerError> {
        let index = leg_index(&task.input_ref)?;
        let leg = leg_at(&self.trip, index, &task.input_ref)?;
        let bbox = self.bounding_box(index, leg)?;
        let tags = self.requested_tags();
        let locale = self.trip.request_context.output_language.clone();
        let cache_key = make_cache_key(
            "poi",
            &[
                hash_bbox(&bbox).into(),
                json!(&tags).into(),
                POI_LIMIT.into(),
                locale.as_str().into(),
            ],
        );

        if let Some(hit) = self.context.cached(&cache_key)? {
            debug!(task_id = %task.task_id, "poi cache hit");
            self.shared.publish(&task.task_id, &hit)?;
            return Ok(hit);
        }

        self.context.acquire().await?;
        let entries = self
            .provider
            .search(&leg.destination_text, &bbox, &tags, POI_LIMIT)
            .map_err(|err| HandlerError::Other(err.to_string()))?;
        let confidence = if entries.is_empty() { 0.2 } else { 0.8 };
        let warnings: Vec<String> = if entries.is_empty() {
            vec!["No POIs found for the requested area and tags.".to_string()]
        } else {
            Vec::new()
        };
        let rows: Vec<Value> = entries.iter().map(poi_json).collect();
        let payload = json!({
            "data": {
                "pois": rows,
                "requested_tags": tags,
                "returned_count": entries.len(),
            },
            "evidence": [evidence_item(
                "poi",
                format!("POI search for '{}'", leg.destination_text),
                format!("{} POI(s) for tags: {}.", entries.len(), tags.join(", ")),
                self.trip.request_context.now_ts,
            )],
            "confidence": confidence,
            "warnings": warnings,
            "cache_key": cache_key,
        });
        self.context.store(&cache_key, &payload)?;
        self.shared.publish(&task.task_id, &payload)?;
        Ok(payload)
    }
}

fn poi_json(entry: &PoiEntry) -> Value {
    json!({
        "name": entry.name,
        "lat": entry.lat,
        "lon": entry.lon,
        "tags": entry.tags,
    })
}
