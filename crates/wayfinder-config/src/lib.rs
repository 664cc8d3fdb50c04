//! # Wayfinder Config
//!
//! Unified single-file configuration for Wayfinder. One `wayfinder.yaml`
//! configures the engine thresholds, cache sizing and TTLs, per-tool
//! rate limits, and the intake guardrails.

mod loader;

pub use loader::{load_config, validate_config, ConfigError};

use serde::Deserialize;

use wayfinder_core::AgentKind;

/// Top-level configuration schema for Wayfinder.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WayfinderConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
}

/// Executor thresholds and escalation policy.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Confidence gate applied to parsed specialist results.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Agent kinds whose failure aborts the whole plan.
    #[serde(default = "default_critical_agents")]
    pub critical_agents: Vec<AgentKind>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            max_retries: default_max_retries(),
            critical_agents: default_critical_agents(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.5
}

fn default_max_retries() -> u32 {
    1
}

fn default_critical_agents() -> Vec<AgentKind> {
    vec![
        AgentKind::Geo,
        AgentKind::Weather,
        AgentKind::Poi,
        AgentKind::Transport,
    ]
}

/// Shared tool cache sizing and per-tool TTLs, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
    /// Geocode results change rarely; 30 days.
    #[serde(default = "default_geo_ttl")]
    pub geo_ttl_seconds: f64,
    /// Forecasts go stale fast; 6 hours.
    #[serde(default = "default_weather_ttl")]
    pub weather_ttl_seconds: f64,
    /// 24 hours.
    #[serde(default = "default_poi_ttl")]
    pub poi_ttl_seconds: f64,
    /// Transport searches; 12 hours.
    #[serde(default = "default_search_ttl")]
    pub search_ttl_seconds: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
            geo_ttl_seconds: default_geo_ttl(),
            weather_ttl_seconds: default_weather_ttl(),
            poi_ttl_seconds: default_poi_ttl(),
            search_ttl_seconds: default_search_ttl(),
        }
    }
}

fn default_cache_max_size() -> usize {
    512
}

fn default_geo_ttl() -> f64 {
    2_592_000.0
}

fn default_weather_ttl() -> f64 {
    21_600.0
}

fn default_poi_ttl() -> f64 {
    86_400.0
}

fn default_search_ttl() -> f64 {
    43_200.0
}

/// Token-bucket budgets for the rate-limited tool families.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_geo_limit")]
    pub geo: RateLimitSpec,
    #[serde(default = "default_poi_limit")]
    pub poi: RateLimitSpec,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            geo: default_geo_limit(),
            poi: default_poi_limit(),
        }
    }
}

fn default_geo_limit() -> RateLimitSpec {
    RateLimitSpec {
        rate_per_second: 1.0,
        capacity: 1.0,
    }
}

fn default_poi_limit() -> RateLimitSpec {
    RateLimitSpec {
        rate_per_second: 0.5,
        capacity: 1.0,
    }
}

/// One token bucket: sustained rate plus burst capacity.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSpec {
    #[serde(default = "default_rate_per_second")]
    pub rate_per_second: f64,
    #[serde(default = "default_limit_capacity")]
    pub capacity: f64,
}

fn default_rate_per_second() -> f64 {
    1.0
}

fn default_limit_capacity() -> f64 {
    1.0
}

/// Date guardrails applied while building a TripSpec.
#[derive(Debug, Clone, Deserialize)]
pub struct IntakeConfig {
    #[serde(default = "default_min_trip_days")]
    pub min_trip_days: i64,
    #[serde(default = "default_max_trip_days")]
    pub max_trip_days: i64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            min_trip_days: default_min_trip_days(),
            max_trip_days: default_max_trip_days(),
        }
    }
}

fn default_min_trip_days() -> i64 {
    1
}

fn default_max_trip_days() -> i64 {
    30
}
