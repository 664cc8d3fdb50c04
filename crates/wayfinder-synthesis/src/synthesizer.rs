//! Day-by-day itinerary assembly from validated specialist results.
//!
//! Synthesis is a pure function of the trip spec and the executor's
//! result map. Missing inputs degrade to fallback content plus a
//! warning instead of failing the run.

use std::collections::{BTreeMap, HashSet};

use chrono::{Days, NaiveDate};
use serde_json::{Map, Value};
use tracing::debug;

use wayfinder_core::{StandardAgentResult, TaskId, TripSpec};

use crate::catalog::{text, transport_option, Language, Message};
use crate::itinerary::{DayPlan, ItineraryActivity, ItineraryPlan, Period, RainRisk};

/// Open-Meteo daily codes counted as rain.
const RAINY_CODES: [i64; 12] = [51, 53, 55, 56, 57, 61, 63, 65, 80, 81, 82, 95];

/// Builds an itinerary using only the provided validated inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Synthesizer;

impl Synthesizer {
    pub fn new() -> Self {
        Self
    }

    /// Assemble one day per calendar date across all legs.
    ///
    /// `language_override` wins over the trip's output language when
    /// present. Each day schedules a morning and an afternoon pick,
    /// preferring indoor POIs on rainy days; transport notes land on a
    /// leg's first day only.
    pub fn synthesize(
        &self,
        trip: &TripSpec,
        results: &BTreeMap<TaskId, StandardAgentResult>,
        language_override: Option<Language>,
    ) -> ItineraryPlan {
        let language = language_override
            .unwrap_or_else(|| Language::from_tag(&trip.request_context.output_language));
        let mut days: Vec<DayPlan> = Vec::new();
        let mut warnings: Vec<String> = Vec::new();
        let mut day_index: u32 = 1;

        for (leg_index, leg) in trip.legs.iter().enumerate() {
            let weather = results.get(&TaskId::from(format!("weather_leg_{leg_index}")));
            let poi = results.get(&TaskId::from(format!("poi_leg_{leg_index}")));
            let transport = if leg_index > 0 {
                let prev = leg_index - 1;
                results.get(&TaskId::from(format!("transport_leg_{prev}_{leg_index}")))
            } else {
                None
            };

            let weather_by_date = weather_by_date(weather);
            let pois = poi_rows(poi);
            let destination = leg
                .geo
                .as_ref()
                .map(|geo| geo.place_name.clone())
                .unwrap_or_else(|| leg.destination_text.clone());

            let span = leg.date_range.num_days().max(0) as u64;
            for offset in 0..span {
                let date = leg.date_range.start_date + Days::new(offset);
                let risk = weather_risk(weather_by_date.get(&date));
                let rainy = risk == RainRisk::High;
                let note_key = if rainy {
                    Message::WeatherRain
                } else {
                    Message::WeatherClear
                };

                if weather_by_date.is_empty() {
                    warnings.push(text(language, Message::MissingWeatherWarning).to_string());
                }
                if pois.is_empty() {
                    warnings.push(text(language, Message::MissingPoiWarning).to_string());
                }

                days.push(DayPlan {
                    day_index,
                    date,
                    destination: destination.clone(),
                    weather_risk: risk,
                    weather_note: text(language, note_key).to_string(),
                    activities: build_activities(language, &pois, rainy),
                    alternatives: if rainy {
                        vec![text(language, Message::RainAlternative).to_string()]
                    } else {
                        Vec::new()
                    },
                    transport_notes: transport_notes(language, transport, offset == 0),
                });
                day_index += 1;
            }
        }

        let mut seen = HashSet::new();
        warnings.retain(|warning| seen.insert(warning.clone()));

        debug!(language = %language, days = days.len(), "itinerary synthesized");
        ItineraryPlan {
            language,
            title: text(language, Message::Title).to_string(),
            days,
            warnings,
        }
    }
}

fn weather_by_date(result: Option<&StandardAgentResult>) -> BTreeMap<NaiveDate, Value> {
    let Some(rows) = result
        .and_then(|result| result.data.get("daily"))
        .and_then(Value::as_array)
    else {
        return BTreeMap::new();
    };
    rows.iter()
        .filter_map(|row| {
            let date = row.get("date")?.as_str()?.parse::<NaiveDate>().ok()?;
            Some((date, row.clone()))
        })
        .collect()
}

fn poi_rows(result: Option<&StandardAgentResult>) -> Vec<Value> {
    result
        .and_then(|result| result.data.get("pois"))
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn weather_risk(row: Option<&Value>) -> RainRisk {
    let Some(row) = row else {
        return RainRisk::Low;
    };
    let precip = row
        .get("precipitation_probability_max")
        .and_then(Value::as_f64);
    if matches!(precip, Some(value) if value >= 60.0) {
        return RainRisk::High;
    }
    let code = row.get("weather_code").and_then(Value::as_i64);
    if matches!(code, Some(value) if RAINY_CODES.contains(&value)) {
        return RainRisk::High;
    }
    RainRisk::Low
}

/// Two picks per day: indoor first on rainy days, outdoor first
/// otherwise, backfilled from the other bucket and finally from the
/// catalog fallback.
fn build_activities(language: Language, pois: &[Value], rainy: bool) -> Vec<ItineraryActivity> {
    let mut indoor: Vec<String> = Vec::new();
    let mut outdoor: Vec<String> = Vec::new();
    for poi in pois {
        let name = poi
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or("");
        if name.is_empty() {
            continue;
        }
        if is_indoor(poi.get("tags")) {
            indoor.push(name.to_string());
        } else {
            outdoor.push(name.to_string());
        }
    }

    let (primary, secondary) = if rainy {
        (&indoor, &outdoor)
    } else {
        (&outdoor, &indoor)
    };
    let mut selected: Vec<String> = primary.iter().take(2).cloned().collect();
    if selected.len() < 2 {
        let missing = 2 - selected.len();
        selected.extend(secondary.iter().take(missing).cloned());
    }
    let fallback = text(language, Message::FallbackActivity);
    while selected.len() < 2 {
        selected.push(fallback.to_string());
    }

    selected
        .into_iter()
        .take(2)
        .zip([Period::Morning, Period::Afternoon])
        .map(|(name, period)| {
            let indoor_flag = indoor.contains(&name) || name == fallback;
            ItineraryActivity {
                name,
                period,
                indoor: indoor_flag,
            }
        })
        .collect()
}

fn transport_notes(
    language: Language,
    transport: Option<&StandardAgentResult>,
    is_leg_start: bool,
) -> Vec<String> {
    if !is_leg_start {
        return Vec::new();
    }
    let Some(transport) = transport else {
        return Vec::new();
    };
    let options = transport
        .data
        .get("options")
        .and_then(Value::as_array)
        .filter(|rows| !rows.is_empty());
    let Some(options) = options else {
        return vec![text(language, Message::TransportGeneric).to_string()];
    };
    let notes: Vec<String> = options
        .iter()
        .take(2)
        .filter_map(|option| option.get("title").and_then(Value::as_str))
        .filter(|title| !title.is_empty())
        .map(|title| transport_option(language, title))
        .collect();
    if notes.is_empty() {
        vec![text(language, Message::TransportGeneric).to_string()]
    } else {
        notes
    }
}

fn is_indoor(tags: Option<&Value>) -> bool {
    let Some(tags) = tags.and_then(Value::as_object) else {
        return false;
    };
    if matches!(tag_text(tags, "indoor").as_str(), "yes" | "true" | "1") {
        return true;
    }
    if matches!(tag_text(tags, "tourism").as_str(), "museum" | "gallery") {
        return true;
    }
    matches!(
        tag_text(tags, "amenity").as_str(),
        "theatre" | "cinema" | "library"
    )
}

fn tag_text(tags: &Map<String, Value>, key: &str) -> String {
    match tags.get(key) {
        Some(Value::String(value)) => value.to_lowercase(),
        Some(Value::Bool(value)) => value.to_string(),
        Some(Value::Number(value)) => value.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wayfinder_core::{
        Budget, BudgetScope, Constraints, DateRange, GeoPoint, Mobility, Preferences,
        RequestContext, TripLeg, TripSpec,
    };

    fn leg(place: &str, lat: f64, lon: f64, start: &str, end: &str) -> TripLeg {
        TripLeg {
            destination_text: place.to_string(),
            geo: Some(GeoPoint {
                lat,
                lon,
                bbox: [lat - 0.1, lon - 0.1, lat + 0.1, lon + 0.1],
                place_name: place.to_string(),
                country_code: "it".to_string(),
            }),
            date_range: DateRange::new(start.parse().unwrap(), end.parse().unwrap()),
        }
    }

    fn tripspec(output_language: &str, second_leg: bool) -> TripSpec {
        let mut legs = vec![leg("Rome", 41.9, 12.4, "2026-03-10", "2026-03-11")];
        if second_leg {
            legs.push(leg("Florence", 43.8, 11.3, "2026-03-12", "2026-03-12"));
        }
        TripSpec {
            request_context: RequestContext {
                now_ts: Utc.with_ymd_and_hms(2026, 2, 20, 12, 0, 0).unwrap(),
                timezone: "Europe/Rome".to_string(),
                input_language: "en".to_string(),
                output_language: output_language.to_string(),
            },
            budget: Budget {
                amount: 1200.0,
                currency: "EUR".to_string(),
                scope: BudgetScope::Total,
                num_travelers: None,
            },
            legs,
            preferences: Preferences {
                tags: vec!["culture".to_string(), "food".to_string()],
            },
            constraints: Constraints {
                mobility: Mobility::PublicTransport,
                ..Constraints::default()
            },
        }
    }

    fn result(data: Value) -> StandardAgentResult {
        StandardAgentResult::from_value(json!({
            "data": data,
            "evidence": [{
                "source": "test",
                "title": "mock",
                "snippet": "mock",
                "retrieved_at": "2026-02-20T12:00:00Z",
            }],
            "confidence": 0.9,
            "warnings": [],
            "cache_key": "cache:key",
        }))
        .unwrap()
    }

    fn results(entries: Vec<(&str, Value)>) -> BTreeMap<TaskId, StandardAgentResult> {
        entries
            .into_iter()
            .map(|(task_id, data)| (TaskId::from(task_id), result(data)))
            .collect()
    }

    #[test]
    fn test_builds_day_by_day_with_weather_aware_alternative() {
        let trip = tripspec("en", false);
        let results = results(vec![
            (
                "weather_leg_0",
                json!({"daily": [
                    {"date": "2026-03-10", "precipitation_probability_max": 80, "weather_code": 63},
                    {"date": "2026-03-11", "precipitation_probability_max": 10, "weather_code": 1},
                ]}),
            ),
            (
                "poi_leg_0",
                json!({"pois": [
                    {"name": "Capitoline Museums", "tags": {"tourism": "museum"}},
                    {"name": "Villa Borghese", "tags": {"leisure": "park"}},
                ]}),
            ),
        ]);

        let plan = Synthesizer::new().synthesize(&trip, &results, None);

        assert_eq!(plan.language, Language::En);
        assert_eq!(plan.title, "Day-by-day itinerary");
        let dates: Vec<String> = plan.days.iter().map(|day| day.date.to_string()).collect();
        assert_eq!(dates, vec!["2026-03-10", "2026-03-11"]);
        // rainy day leads with the museum and offers an indoor backup
        assert_eq!(plan.days[0].weather_risk, RainRisk::High);
        assert_eq!(plan.days[0].activities[0].name, "Capitoline Museums");
        assert!(plan.days[0].activities[0].indoor);
        assert_eq!(
            plan.days[0].alternatives,
            vec!["Indoor backup: museum or covered market.".to_string()]
        );
        // clear day leads with the park
        assert_eq!(plan.days[1].weather_risk, RainRisk::Low);
        assert_eq!(plan.days[1].activities[0].name, "Villa Borghese");
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_italian_catalog_selected_by_output_language() {
        let trip = tripspec("it", false);
        let results = results(vec![
            (
                "weather_leg_0",
                json!({"daily": [
                    {"date": "2026-03-10", "precipitation_probability_max": 75, "weather_code": 63},
                ]}),
            ),
            ("poi_leg_0", json!({"pois": []})),
        ]);

        let plan = Synthesizer::new().synthesize(&trip, &results, None);

        assert_eq!(plan.language, Language::It);
        assert_eq!(plan.title, "Itinerario giorno per giorno");
        assert_eq!(
            plan.days[0].weather_note,
            "Rischio pioggia alto. Preferisci attivita al chiuso."
        );
        assert!(plan
            .warnings
            .contains(&"Dati POI mancanti per alcuni giorni.".to_string()));
    }

    #[test]
    fn test_language_override_and_first_day_transport_notes() {
        let trip = tripspec("en", true);
        let results = results(vec![
            ("weather_leg_0", json!({"daily": [{"date": "2026-03-10"}]})),
            (
                "poi_leg_0",
                json!({"pois": [{"name": "Pantheon", "tags": {"tourism": "attraction"}}]}),
            ),
            ("weather_leg_1", json!({"daily": [{"date": "2026-03-12"}]})),
            (
                "poi_leg_1",
                json!({"pois": [{"name": "Uffizi Gallery", "tags": {"tourism": "museum"}}]}),
            ),
            (
                "transport_leg_0_1",
                json!({"options": [
                    {"title": "Fast train Rome to Florence"},
                    {"title": "Regional train alternative"},
                ]}),
            ),
        ]);

        let plan = Synthesizer::new().synthesize(&trip, &results, Some(Language::It));

        assert_eq!(plan.language, Language::It);
        assert_eq!(plan.days.len(), 3);
        assert_eq!(plan.days[2].destination, "Florence");
        assert_eq!(
            plan.days[2].transport_notes,
            vec![
                "Opzione trasferimento: Fast train Rome to Florence".to_string(),
                "Opzione trasferimento: Regional train alternative".to_string(),
            ]
        );
        // transport notes stay off the first leg and off later days
        assert!(plan.days[0].transport_notes.is_empty());
    }

    #[test]
    fn test_missing_results_fall_back_with_warnings() {
        let trip = tripspec("en", false);
        let plan = Synthesizer::new().synthesize(&trip, &BTreeMap::new(), None);

        assert_eq!(plan.days.len(), 2);
        for day in &plan.days {
            assert_eq!(day.weather_risk, RainRisk::Low);
            assert_eq!(day.activities.len(), 2);
            assert_eq!(day.activities[0].name, "Local indoor discovery walk");
            assert!(day.activities[0].indoor);
        }
        // one warning per missing family, despite two days
        assert_eq!(
            plan.warnings,
            vec![
                "Weather data missing for some days.".to_string(),
                "POI data missing for some days.".to_string(),
            ]
        );
    }

    #[test]
    fn test_indoor_classification_covers_tag_shapes() {
        assert!(is_indoor(Some(&json!({"tourism": "gallery"}))));
        assert!(is_indoor(Some(&json!({"amenity": "cinema"}))));
        assert!(is_indoor(Some(&json!({"indoor": "yes"}))));
        assert!(is_indoor(Some(&json!({"indoor": true}))));
        assert!(is_indoor(Some(&json!({"indoor": 1}))));
        assert!(!is_indoor(Some(&json!({"leisure": "park"}))));
        assert!(!is_indoor(Some(&json!("not a map"))));
        assert!(!is_indoor(None));
    }

    #[test]
    fn test_high_precipitation_alone_flags_rain() {
        let row = json!({"precipitation_probability_max": 60, "weather_code": 0});
        assert_eq!(weather_risk(Some(&row)), RainRisk::High);
        let dry = json!({"precipitation_probability_max": 59, "weather_code": 0});
        assert_eq!(weather_risk(Some(&dry)), RainRisk::Low);
        let drizzle = json!({"weather_code": 51});
        assert_eq!(weather_risk(Some(&drizzle)), RainRisk::High);
        assert_eq!(weather_risk(None), RainRisk::Low);
    }
}
