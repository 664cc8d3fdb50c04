//! Configuration loading and validation.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::WayfinderConfig;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Load and validate a Wayfinder configuration from a YAML file.
pub fn load_config(path: &Path) -> Result<WayfinderConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: WayfinderConfig = serde_yaml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Check value ranges serde cannot express.
pub fn validate_config(config: &WayfinderConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.engine.confidence_threshold) {
        return Err(ConfigError::Invalid(format!(
            "engine.confidence_threshold must be within 0..=1, got {}",
            config.engine.confidence_threshold
        )));
    }

    if config.cache.max_size == 0 {
        return Err(ConfigError::Invalid(
            "cache.max_size must be > 0".to_string(),
        ));
    }

    for (name, spec) in [("geo", &config.limits.geo), ("poi", &config.limits.poi)] {
        if spec.rate_per_second <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "limits.{name}.rate_per_second must be > 0"
            )));
        }
        if spec.capacity <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "limits.{name}.capacity must be > 0"
            )));
        }
    }

    if config.intake.min_trip_days < 1 {
        return Err(ConfigError::Invalid(
            "intake.min_trip_days must be >= 1".to_string(),
        ));
    }
    if config.intake.max_trip_days < config.intake.min_trip_days {
        return Err(ConfigError::Invalid(format!(
            "intake.max_trip_days ({}) must not be below intake.min_trip_days ({})",
            config.intake.max_trip_days, config.intake.min_trip_days
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfinder_core::AgentKind;

    #[test]
    fn test_default_config_validates() {
        let config = WayfinderConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.engine.confidence_threshold, 0.5);
        assert_eq!(config.engine.max_retries, 1);
        assert_eq!(config.cache.max_size, 512);
        assert_eq!(config.limits.poi.rate_per_second, 0.5);
        assert_eq!(config.intake.max_trip_days, 30);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let mut config = WayfinderConfig::default();
        config.engine.confidence_threshold = 1.5;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_zero_cache_size_rejected() {
        let mut config = WayfinderConfig::default();
        config.cache.max_size = 0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_non_positive_rate_rejected() {
        let mut config = WayfinderConfig::default();
        config.limits.geo.rate_per_second = 0.0;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_trip_day_inversion_rejected() {
        let mut config = WayfinderConfig::default();
        config.intake.min_trip_days = 10;
        config.intake.max_trip_days = 5;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_config_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wayfinder.yaml");
        std::fs::write(
            &path,
            concat!(
                "engine:\n",
                "  confidence_threshold: 0.6\n",
                "  critical_agents: [geo, weather]\n",
                "cache:\n",
                "  max_size: 64\n",
                "limits:\n",
                "  geo:\n",
                "    rate_per_second: 2.0\n",
                "    capacity: 4.0\n",
                "intake:\n",
                "  max_trip_days: 14\n",
            ),
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.engine.confidence_threshold, 0.6);
        assert_eq!(
            config.engine.critical_agents,
            vec![AgentKind::Geo, AgentKind::Weather]
        );
        // untouched sections keep their defaults
        assert_eq!(config.engine.max_retries, 1);
        assert_eq!(config.cache.weather_ttl_seconds, 21_600.0);
        assert_eq!(config.limits.geo.capacity, 4.0);
        assert_eq!(config.limits.poi.capacity, 1.0);
        assert_eq!(config.intake.min_trip_days, 1);
        assert_eq!(config.intake.max_trip_days, 14);
    }

    #[test]
    fn test_load_config_surfaces_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wayfinder.yaml");
        std::fs::write(&path, "engine: [not, a, mapping]\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse(_))));
    }
}
