//! Itinerary output types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::Language;

/// Slot of the day an activity is scheduled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
    Evening,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Morning => "morning",
            Period::Afternoon => "afternoon",
            Period::Evening => "evening",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rain likelihood bucket for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RainRisk {
    Low,
    High,
}

/// One scheduled activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryActivity {
    pub name: String,
    pub period: Period,
    pub indoor: bool,
}

/// One rendered day of the trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    /// 1-based position across the whole trip
    pub day_index: u32,
    pub date: NaiveDate,
    pub destination: String,
    pub weather_risk: RainRisk,
    pub weather_note: String,
    #[serde(default)]
    pub activities: Vec<ItineraryActivity>,
    /// Suggested swaps when the weather turns
    #[serde(default)]
    pub alternatives: Vec<String>,
    /// Present only on a leg's first day
    #[serde(default)]
    pub transport_notes: Vec<String>,
}

/// The full synthesized itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryPlan {
    pub language: Language,
    pub title: String,
    #[serde(default)]
    pub days: Vec<DayPlan>,
    /// Data-gap notices, deduplicated in first-seen order
    #[serde(default)]
    pub warnings: Vec<String>,
}
