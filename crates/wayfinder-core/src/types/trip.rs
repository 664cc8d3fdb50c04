//! Trip request contracts
//!
//! TripSpec is the validated input document the planner compiles. It is
//! immutable once constructed; intake is the only place one is built.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A TripSpec structural invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trip spec: {0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Ambient request parameters carried through the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Reference instant for all relative date resolution
    pub now_ts: DateTime<Utc>,
    /// IANA timezone name the request is anchored in
    pub timezone: String,
    pub input_language: String,
    pub output_language: String,
}

/// How a budget amount is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BudgetScope {
    #[default]
    Total,
    PerPerson,
}

/// Money the traveler is willing to spend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Strictly positive amount
    pub amount: f64,
    /// Three-letter currency code
    pub currency: String,
    pub scope: BudgetScope,
    /// Strictly positive when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_travelers: Option<u32>,
}

/// A resolved destination point with its bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    /// [south, west, north, east]; the array type fixes the length
    pub bbox: [f64; 4],
    pub place_name: String,
    /// Two-letter country code
    pub country_code: String,
}

/// Inclusive calendar date span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Number of calendar days covered, counting both endpoints.
    pub fn num_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

/// One geographic segment of the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripLeg {
    /// Destination as the traveler phrased it
    pub destination_text: String,
    /// Present when the destination is already resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
    pub date_range: DateRange,
}

/// Soft preferences used to bias enrichment and synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Preferences {
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Daily intensity of the itinerary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Relaxed,
    #[default]
    Standard,
    Packed,
}

/// How the traveler moves between activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mobility {
    WalkOnly,
    #[default]
    PublicTransport,
    Car,
}

/// Hard constraints on itinerary construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Constraints {
    pub pace: Pace,
    pub mobility: Mobility,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessibility: Option<String>,
}

/// The validated trip request: ordered legs plus request-wide context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSpec {
    pub request_context: RequestContext,
    pub budget: Budget,
    /// At least one leg
    pub legs: Vec<TripLeg>,
    pub preferences: Preferences,
    pub constraints: Constraints,
}

impl TripSpec {
    /// Check the structural invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.legs.is_empty() {
            return Err(ValidationError::new("trip must contain at least one leg"));
        }
        if self.budget.amount <= 0.0 {
            return Err(ValidationError::new(format!(
                "budget amount must be positive, got {}",
                self.budget.amount
            )));
        }
        if self.budget.currency.len() != 3 {
            return Err(ValidationError::new(format!(
                "currency must be a 3-letter code, got '{}'",
                self.budget.currency
            )));
        }
        if self.budget.num_travelers == Some(0) {
            return Err(ValidationError::new("num_travelers must be positive"));
        }
        for (idx, leg) in self.legs.iter().enumerate() {
            if let Some(geo) = &leg.geo {
                if geo.country_code.len() != 2 {
                    return Err(ValidationError::new(format!(
                        "legs[{idx}]: country_code must be a 2-letter code, got '{}'",
                        geo.country_code
                    )));
                }
            }
        }
        Ok(())
    }

    /// Parse and validate a spec from a raw JSON document.
    pub fn from_value(value: Value) -> Result<Self, ValidationError> {
        let spec: Self = serde_json::from_value(value)
            .map_err(|e| ValidationError::new(format!("malformed trip spec: {e}")))?;
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_spec() -> TripSpec {
        TripSpec {
            request_context: RequestContext {
                now_ts: Utc.with_ymd_and_hms(2026, 2, 16, 10, 30, 0).unwrap(),
                timezone: "Europe/Rome".to_string(),
                input_language: "en".to_string(),
                output_language: "en".to_string(),
            },
            budget: Budget {
                amount: 1200.0,
                currency: "EUR".to_string(),
                scope: BudgetScope::Total,
                num_travelers: Some(2),
            },
            legs: vec![TripLeg {
                destination_text: "Lisbon".to_string(),
                geo: None,
                date_range: DateRange::new(
                    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
                    NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
                ),
            }],
            preferences: Preferences::default(),
            constraints: Constraints::default(),
        }
    }

    #[test]
    fn test_valid_spec_passes_validation() {
        assert!(sample_spec().validate().is_ok());
    }

    #[test]
    fn test_structural_violations_are_rejected() {
        let mut spec = sample_spec();
        spec.legs.clear();
        assert!(spec.validate().is_err());

        let mut spec = sample_spec();
        spec.budget.amount = 0.0;
        assert!(spec.validate().is_err());

        let mut spec = sample_spec();
        spec.budget.currency = "EURO".to_string();
        assert!(spec.validate().is_err());

        let mut spec = sample_spec();
        spec.budget.num_travelers = Some(0);
        assert!(spec.validate().is_err());

        let mut spec = sample_spec();
        spec.legs[0].geo = Some(GeoPoint {
            lat: 38.72,
            lon: -9.14,
            bbox: [38.62, -9.24, 38.82, -9.04],
            place_name: "Lisbon".to_string(),
            country_code: "prt".to_string(),
        });
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_from_value_rejects_malformed_documents() {
        let err = TripSpec::from_value(serde_json::json!({"legs": []})).unwrap_err();
        assert!(err.to_string().contains("malformed trip spec"));
    }

    #[test]
    fn test_date_range_counts_both_endpoints() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
        );
        assert_eq!(range.num_days(), 4);
    }

    #[test]
    fn test_constraint_enums_use_snake_case() {
        assert_eq!(
            serde_json::to_string(&Mobility::PublicTransport).unwrap(),
            "\"public_transport\""
        );
        let pace: Pace = serde_json::from_str("\"packed\"").unwrap();
        assert_eq!(pace, Pace::Packed);
    }
}
