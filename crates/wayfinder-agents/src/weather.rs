//! Weather specialist: daily forecast rows for a leg's date range.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use serde_json::{json, Value};
use tracing::debug;

use wayfinder_core::{AgentHandler, HandlerError, PlanTask, TripLeg, TripSpec};
use wayfinder_stores::make_cache_key;

use crate::context::{evidence_item, leg_at, leg_index, SharedResults, ToolContext};
use crate::offline::stable_fold;
use crate::ProviderError;

/// Open-Meteo style daily weather codes the offline provider cycles
/// through: clear, mainly clear, partly cloudy, overcast, fog, light
/// drizzle, light rain, rain showers.
const WEATHER_CODES: [u32; 8] = [0, 1, 2, 3, 45, 51, 61, 80];

/// One day of forecast data.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_min_c: f64,
    pub temp_max_c: f64,
    pub precipitation_probability_max: u32,
    pub weather_code: u32,
}

/// Seam for forecast backends.
pub trait WeatherProvider: Send + Sync {
    fn daily_forecast(
        &self,
        lat: f64,
        lon: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        timezone: &str,
    ) -> Result<Vec<DailyForecast>, ProviderError>;
}

/// Derives one row per day from a stable fold of date and coordinates.
#[derive(Debug, Default)]
pub struct OfflineWeatherProvider;

impl WeatherProvider for OfflineWeatherProvider {
    fn daily_forecast(
        &self,
        lat: f64,
        lon: f64,
        start_date: NaiveDate,
        end_date: NaiveDate,
        _timezone: &str,
    ) -> Result<Vec<DailyForecast>, ProviderError> {
        let days = (end_date - start_date).num_days();
        if days < 0 {
            return Ok(Vec::new());
        }
        let rows = (0..=days)
            .map(|offset| day_row(start_date + Days::new(offset as u64), lat, lon))
            .collect();
        Ok(rows)
    }
}

fn day_row(date: NaiveDate, lat: f64, lon: f64) -> DailyForecast {
    let seed = stable_fold(&format!("{date}:{lat:.4}:{lon:.4}"));
    let temp_min = 4.0 + (seed % 120) as f64 / 10.0;
    let spread = 5.0 + ((seed >> 8) % 80) as f64 / 10.0;
    DailyForecast {
        date,
        temp_min_c: round1(temp_min),
        temp_max_c: round1(temp_min + spread),
        precipitation_probability_max: ((seed >> 16) % 101) as u32,
        weather_code: WEATHER_CODES[((seed >> 24) % WEATHER_CODES.len() as u64) as usize],
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Handler for `weather` tasks.
///
/// Coordinates come from the leg itself when the destination was
/// already resolved, otherwise from the geocoding result published
/// earlier in the same run.
pub struct WeatherHandler {
    trip: Arc<TripSpec>,
    context: ToolContext,
    shared: Arc<SharedResults>,
    provider: Arc<dyn WeatherProvider>,
}

impl WeatherHandler {
    pub fn new(
        trip: Arc<TripSpec>,
        context: ToolContext,
        shared: Arc<SharedResults>,
        provider: Arc<dyn WeatherProvider>,
    ) -> Self {
        Self {
            trip,
            context,
            shared,
            provider,
        }
    }

    fn coordinates(&self, index: usize, leg: &TripLeg) -> Result<(f64, f64), HandlerError> {
        if let Some(geo) = &leg.geo {
            return Ok((geo.lat, geo.lon));
        }
        let upstream = self.shared.get(&format!("geo_leg_{index}"))?;
        upstream
            .as_ref()
            .and_then(selected_coords)
            .ok_or_else(|| {
                HandlerError::Other(format!("missing coordinates for weather on leg {index}"))
            })
    }
}

fn selected_coords(payload: &Value) -> Option<(f64, f64)> {
    let selected = payload.get("data")?.get("selected")?;
    Some((selected.get("lat")?.as_f64()?, selected.get("lon")?.as_f64()?))
}

#[async_trait]
impl AgentHandler for WeatherHandler {
    async fn handle(&self, task: &PlanTask) -> Result<Value, HandlerError> {
        let index = leg_index(&task.input_ref)?;
        let leg = leg_at(&self.trip, index, &task.input_ref)?;
        let (lat, lon) = self.coordinates(index, leg)?;
        let start = leg.date_range.start_date;
        let end = leg.date_range.end_date;
        let timezone = self.trip.request_context.timezone.clone();
        let cache_key = make_cache_key(
            "weather",
            &[
                lat.into(),
                lon.into(),
                start.to_string().into(),
                end.to_string().into(),
                timezone.as_str().into(),
            ],
        );

        if let Some(hit) = self.context.cached(&cache_key)? {
            debug!(task_id = %task.task_id, "weather cache hit");
            self.shared.publish(&task.task_id, &hit)?;
            return Ok(hit);
        }

        let rows = self
            .provider
            .daily_forecast(lat, lon, start, end, &timezone)
            .map_err(|err| HandlerError::Other(err.to_string()))?;
        let confidence = if rows.is_empty() { 0.25 } else { 0.85 };
        let warnings: Vec<String> = if rows.is_empty() {
            vec!["No daily weather rows available.".to_string()]
        } else {
            Vec::new()
        };
        let daily: Vec<Value> = rows.iter().map(row_json).collect();
        let payload = json!({
            "data": {
                "summary": {
                    "latitude": lat,
                    "longitude": lon,
                    "timezone": timezone,
                    "start_date": start.to_string(),
                    "end_date": end.to_string(),
                    "days": rows.len(),
                },
                "daily": daily,
            },
            "evidence": [evidence_item(
                "weather",
                format!("Daily forecast {start} to {end}"),
                format!("{} forecast row(s) for ({lat:.4}, {lon:.4}).", rows.len()),
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

fn row_json(row: &DailyForecast) -> Value {
    json!({
        "date": row.date.to_string(),
        "temp_min_c": row.temp_min_c,
        "temp_max_c": row.temp_max_c,
        "precipitation_probability_max": row.precipitation_probability_max,
        "weather_code": row.weather_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{GeoHandler, OfflineGeoProvider};
    use crate::testing::{manual_stores, trip_fixture};
    use wayfinder_core::{AgentKind, GeoPoint, StandardAgentResult};

    fn weather_task(index: usize) -> PlanTask {
        PlanTask::new(
            format!("weather_leg_{index}"),
            AgentKind::Weather,
            format!("legs[{index}]"),
        )
    }

    #[test]
    fn test_offline_forecast_covers_every_day() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 13).unwrap();
        let rows = OfflineWeatherProvider
            .daily_forecast(41.15, -8.61, start, end, "Europe/Lisbon")
            .unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].date, start);
        assert_eq!(rows[3].date, end);
        for row in &rows {
            assert!(row.temp_max_c > row.temp_min_c);
            assert!(row.precipitation_probability_max <= 100);
            assert!(WEATHER_CODES.contains(&row.weather_code));
        }
        // same inputs, same rows
        let again = OfflineWeatherProvider
            .daily_forecast(41.15, -8.61, start, end, "Europe/Lisbon")
            .unwrap();
        assert_eq!(rows, again);
    }

    #[test]
    fn test_handler_uses_resolved_leg_geo() {
        let (stores, _clock) = manual_stores();
        let mut trip = (*trip_fixture(&["Porto"])).clone();
        trip.legs[0].geo = Some(GeoPoint {
            lat: 41.15,
            lon: -8.61,
            bbox: [41.05, -8.71, 41.25, -8.51],
            place_name: "Porto".to_string(),
            country_code: "pt".to_string(),
        });
        let handler = WeatherHandler::new(
            Arc::new(trip),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(OfflineWeatherProvider),
        );

        let payload = tokio_test::block_on(handler.handle(&weather_task(0))).unwrap();
        let result = StandardAgentResult::from_value(payload.clone()).unwrap();
        assert_eq!(result.confidence, 0.85);
        assert_eq!(payload["data"]["summary"]["latitude"], 41.15);
        assert_eq!(payload["data"]["daily"].as_array().unwrap().len(), 2);
        assert!(result.cache_key.starts_with("weather:"));
    }

    #[test]
    fn test_handler_reads_published_geocode() {
        let (stores, _clock) = manual_stores();
        let trip = trip_fixture(&["Porto"]);
        let shared = Arc::new(SharedResults::default());
        let geo = GeoHandler::new(
            Arc::clone(&trip),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::clone(&shared),
            Arc::new(OfflineGeoProvider),
        );
        let geo_task = PlanTask::new("geo_leg_0", AgentKind::Geo, "legs[0]");
        tokio_test::block_on(geo.handle(&geo_task)).unwrap();

        let handler = WeatherHandler::new(
            trip,
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            shared,
            Arc::new(OfflineWeatherProvider),
        );
        let payload = tokio_test::block_on(handler.handle(&weather_task(0))).unwrap();
        assert_eq!(payload["confidence"], 0.85);
        assert!(payload["data"]["summary"]["latitude"].is_f64());
    }

    #[test]
    fn test_handler_without_coordinates_raises() {
        let (stores, _clock) = manual_stores();
        let handler = WeatherHandler::new(
            trip_fixture(&["Porto"]),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(OfflineWeatherProvider),
        );

        let err = tokio_test::block_on(handler.handle(&weather_task(0))).unwrap_err();
        match err {
            HandlerError::Other(message) => assert!(message.contains("coordinates")),
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_forecast_lowers_confidence() {
        struct NoRows;
        impl WeatherProvider for NoRows {
            fn daily_forecast(
                &self,
                _lat: f64,
                _lon: f64,
                _start_date: NaiveDate,
                _end_date: NaiveDate,
                _timezone: &str,
            ) -> Result<Vec<DailyForecast>, ProviderError> {
                Ok(Vec::new())
            }
        }

        let (stores, _clock) = manual_stores();
        let mut trip = (*trip_fixture(&["Porto"])).clone();
        trip.legs[0].geo = Some(GeoPoint {
            lat: 41.15,
            lon: -8.61,
            bbox: [41.05, -8.71, 41.25, -8.51],
            place_name: "Porto".to_string(),
            country_code: "pt".to_string(),
        });
        let handler = WeatherHandler::new(
            Arc::new(trip),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(NoRows),
        );

        let payload = tokio_test::block_on(handler.handle(&weather_task(0))).unwrap();
        assert_eq!(payload["confidence"], 0.25);
        assert_eq!(
            payload["warnings"][0],
            "No daily weather rows available."
        );
    }
}
