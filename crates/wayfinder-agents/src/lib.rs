//! # Wayfinder Agents
//!
//! The specialist handlers behind the executor's dispatch table.
//!
//! This crate contains:
//!
//! - One handler per agent kind (geo, weather, poi, transport, synth),
//!   each normalizing its payload into the standard result envelope
//! - Provider traits as the seam a real backend would plug into, with
//!   deterministic offline implementations as the defaults
//! - [`build_registry`] to wire the handlers for one run against the
//!   long-lived cache and per-family rate limiters
//!
//! Every payload derives from the trip spec alone; nothing in this
//! crate performs network I/O, so identical requests produce identical
//! results.

pub mod context;
pub mod geo;
mod offline;
pub mod poi;
pub mod synth;
pub mod transport;
pub mod weather;

pub use context::{leg_index, transfer_indices, SharedResults, ToolContext, ToolStores};
pub use geo::{
    GeoCandidate, GeoHandler, GeoProvider, OfflineGeoProvider, GEO_CANDIDATE_LIMIT,
    OFFLINE_GEO_CONFIDENCE,
};
pub use poi::{OfflinePoiProvider, PoiEntry, PoiHandler, PoiProvider, DEFAULT_POI_TAGS, POI_LIMIT};
pub use synth::SynthHandler;
pub use transport::{
    OfflineTransportProvider, TransportHandler, TransportOption, TransportProvider,
    TRANSPORT_CAVEAT, TRANSPORT_LIMIT,
};
pub use weather::{DailyForecast, OfflineWeatherProvider, WeatherHandler, WeatherProvider};

use std::sync::Arc;

use thiserror::Error;

use wayfinder_config::WayfinderConfig;
use wayfinder_core::{HandlerRegistry, TripSpec};

/// Failure inside a provider implementation.
#[derive(Debug, Clone, Error)]
#[error("provider failure: {0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Wire the offline handlers for one pipeline run.
///
/// The stores outlive the run; the handlers do not, since they capture
/// the run's trip spec and share a fresh result mirror.
pub fn build_registry(
    trip: Arc<TripSpec>,
    stores: &ToolStores,
    config: &WayfinderConfig,
) -> HandlerRegistry {
    let shared = Arc::new(SharedResults::default());
    let geo = GeoHandler::new(
        Arc::clone(&trip),
        ToolContext::new(Arc::clone(&stores.cache), config.cache.geo_ttl_seconds)
            .with_limiter(Arc::clone(&stores.geo_limiter)),
        Arc::clone(&shared),
        Arc::new(OfflineGeoProvider),
    );
    let weather = WeatherHandler::new(
        Arc::clone(&trip),
        ToolContext::new(Arc::clone(&stores.cache), config.cache.weather_ttl_seconds),
        Arc::clone(&shared),
        Arc::new(OfflineWeatherProvider),
    );
    let poi = PoiHandler::new(
        Arc::clone(&trip),
        ToolContext::new(Arc::clone(&stores.cache), config.cache.poi_ttl_seconds)
            .with_limiter(Arc::clone(&stores.poi_limiter)),
        Arc::clone(&shared),
        Arc::new(OfflinePoiProvider),
    );
    let transport = TransportHandler::new(
        Arc::clone(&trip),
        ToolContext::new(Arc::clone(&stores.cache), config.cache.search_ttl_seconds),
        Arc::clone(&shared),
        Arc::new(OfflineTransportProvider),
    );
    let synth = SynthHandler::new(trip, shared);
    HandlerRegistry::new(
        Arc::new(geo),
        Arc::new(weather),
        Arc::new(poi),
        Arc::new(transport),
        Arc::new(synth),
    )
}
