//! Intake decision step
//!
//! Turns an extracted draft into either a validated [`TripSpec`] or a
//! clarifying question. At most two questions go back to the user per
//! round, and the reason reflects the first gap found.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use wayfinder_core::types::{
    Budget, Constraints, DateRange, Preferences, RequestContext, TripLeg, TripSpec,
    ValidationError,
};

use crate::draft::{DraftExtractor, TripSpecDraft};
use crate::guardrails;

/// Country-level destinations that need a city or region before planning.
const AMBIGUOUS_COUNTRIES: [&str; 9] = [
    "spain",
    "italy",
    "france",
    "germany",
    "portugal",
    "greece",
    "japan",
    "usa",
    "united states",
];

const MIN_TRIP_DAYS: i64 = 1;
const MAX_TRIP_DAYS: i64 = 30;

/// Why intake could not produce a TripSpec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClarificationReason {
    MissingInformation,
    DestinationMissing,
    DestinationAmbiguous,
    DatesMissing,
    DatesInvalid,
    BudgetMissing,
}

impl ClarificationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClarificationReason::MissingInformation => "missing_information",
            ClarificationReason::DestinationMissing => "destination_missing",
            ClarificationReason::DestinationAmbiguous => "destination_ambiguous",
            ClarificationReason::DatesMissing => "dates_missing",
            ClarificationReason::DatesInvalid => "dates_invalid",
            ClarificationReason::BudgetMissing => "budget_missing",
        }
    }
}

impl std::fmt::Display for ClarificationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to ask the user, and why. Carries one or two questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarifyingQuestion {
    pub reason: ClarificationReason,
    pub questions: Vec<String>,
}

/// Outcome of one intake round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntakeResult {
    Ready { tripspec: TripSpec },
    ClarificationNeeded { clarifying_question: ClarifyingQuestion },
}

impl IntakeResult {
    pub fn is_ready(&self) -> bool {
        matches!(self, IntakeResult::Ready { .. })
    }
}

/// Converts a user query into a TripSpec or clarifying questions.
pub struct Intake {
    extractor: Arc<dyn DraftExtractor>,
    destination_split: Regex,
    min_trip_days: i64,
    max_trip_days: i64,
}

impl Intake {
    pub fn new(extractor: Arc<dyn DraftExtractor>) -> Self {
        Self {
            extractor,
            destination_split: Regex::new(r"(?i)\s*(?:,| and | then |->| to )\s*")
                .expect("valid pattern"),
            min_trip_days: MIN_TRIP_DAYS,
            max_trip_days: MAX_TRIP_DAYS,
        }
    }

    /// Set the acceptable trip duration window, in days.
    pub fn with_trip_day_bounds(mut self, min_trip_days: i64, max_trip_days: i64) -> Self {
        self.min_trip_days = min_trip_days;
        self.max_trip_days = max_trip_days;
        self
    }

    /// Run one intake round for a raw query.
    ///
    /// Gap checks run in a fixed order (destination, dates, budget) and the
    /// recorded reason is the first gap hit; later gaps only contribute
    /// questions. Errs only when a structurally invalid spec slips through
    /// extraction, e.g. a non-positive budget amount.
    pub fn process(
        &self,
        query: &str,
        now_ts: DateTime<Utc>,
        timezone: &str,
    ) -> Result<IntakeResult, ValidationError> {
        let draft = self.extractor.extract(query, now_ts, timezone);

        let mut questions: Vec<String> = Vec::new();
        let mut reason = ClarificationReason::MissingInformation;

        let destination_text = draft
            .destination_text
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_string();
        let destinations = self.split_destinations(&destination_text);
        if destination_text.is_empty() {
            questions.push("Which city or region would you like to visit?".to_string());
            reason = ClarificationReason::DestinationMissing;
        } else if destinations.iter().any(|d| is_ambiguous_destination(d)) {
            questions.push("Which city or region in that country should I plan for?".to_string());
            reason = ClarificationReason::DestinationAmbiguous;
        }

        let parsed_range = resolve_dates(&draft, now_ts, timezone);
        match parsed_range {
            None => {
                questions.push("What are your exact travel dates (start and end)?".to_string());
                if reason == ClarificationReason::MissingInformation {
                    reason = ClarificationReason::DatesMissing;
                }
            }
            Some((start_date, end_date)) => {
                if let Err(err) = guardrails::validate_date_range(
                    start_date,
                    end_date,
                    self.min_trip_days,
                    self.max_trip_days,
                ) {
                    questions.push(err.to_string());
                    if reason == ClarificationReason::MissingInformation {
                        reason = ClarificationReason::DatesInvalid;
                    }
                }
            }
        }

        if draft.budget_amount.is_none() {
            questions.push("What is your budget and currency for this trip?".to_string());
            if reason == ClarificationReason::MissingInformation {
                reason = ClarificationReason::BudgetMissing;
            }
        }

        match (parsed_range, draft.budget_amount) {
            (Some(range), Some(amount)) if questions.is_empty() => {
                self.build_ready(&draft, destinations, amount, range, now_ts, timezone)
            }
            _ => {
                questions.truncate(2);
                debug!(reason = %reason, questions = questions.len(), "intake needs clarification");
                Ok(IntakeResult::ClarificationNeeded {
                    clarifying_question: ClarifyingQuestion { reason, questions },
                })
            }
        }
    }

    fn build_ready(
        &self,
        draft: &TripSpecDraft,
        destinations: Vec<String>,
        amount: f64,
        (start_date, end_date): (NaiveDate, NaiveDate),
        now_ts: DateTime<Utc>,
        timezone: &str,
    ) -> Result<IntakeResult, ValidationError> {
        let total_days = (end_date - start_date).num_days() + 1;
        if total_days < destinations.len() as i64 {
            return Ok(IntakeResult::ClarificationNeeded {
                clarifying_question: ClarifyingQuestion {
                    reason: ClarificationReason::DatesInvalid,
                    questions: vec![
                        "Your date range is shorter than the number of destinations. \
                         Please provide more days or fewer destinations."
                            .to_string(),
                    ],
                },
            });
        }

        let input_language = draft
            .input_language
            .clone()
            .unwrap_or_else(|| "en".to_string());
        let output_language = draft
            .output_language
            .clone()
            .unwrap_or_else(|| input_language.clone());

        let tripspec = TripSpec {
            request_context: RequestContext {
                now_ts,
                timezone: timezone.to_string(),
                input_language,
                output_language,
            },
            budget: Budget {
                amount,
                currency: draft.budget_currency.as_deref().unwrap_or("EUR").to_uppercase(),
                scope: draft.budget_scope.unwrap_or_default(),
                num_travelers: draft.num_travelers,
            },
            legs: build_legs(&destinations, start_date, end_date),
            preferences: Preferences {
                tags: draft.preferences_tags.clone(),
            },
            constraints: Constraints {
                pace: draft.pace.unwrap_or_default(),
                mobility: draft.mobility.unwrap_or_default(),
                accessibility: draft.accessibility.clone(),
            },
        };
        tripspec.validate()?;

        debug!(
            legs = tripspec.legs.len(),
            language = %tripspec.request_context.output_language,
            "intake ready"
        );
        Ok(IntakeResult::Ready { tripspec })
    }

    /// Split a destination phrase on the common connectors, de-duplicating
    /// while preserving order. A phrase with no connector is one destination.
    fn split_destinations(&self, destination_text: &str) -> Vec<String> {
        let normalized = destination_text
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if normalized.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut destinations = Vec::new();
        for part in self.destination_split.split(&normalized) {
            let text = part.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                continue;
            }
            if seen.insert(text.to_lowercase()) {
                destinations.push(text);
            }
        }
        if destinations.is_empty() {
            destinations.push(normalized);
        }
        destinations
    }
}

/// Resolve the draft's dates, explicit pair first, expression second.
/// Any guardrail failure reads as "no usable dates".
fn resolve_dates(
    draft: &TripSpecDraft,
    now_ts: DateTime<Utc>,
    timezone: &str,
) -> Option<(NaiveDate, NaiveDate)> {
    if let (Some(start), Some(end)) = (draft.start_date.as_deref(), draft.end_date.as_deref()) {
        let start_date = guardrails::parse_date_expression(start, now_ts, timezone).ok()?;
        let end_date = guardrails::parse_date_expression(end, now_ts, timezone).ok()?;
        return Some((start_date, end_date));
    }

    let expression = draft.date_expression.as_deref()?;
    let normalized = expression
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    if normalized == "next weekend" || normalized == "this weekend" {
        return guardrails::resolve_weekend_range(&normalized, now_ts, timezone).ok();
    }
    let resolved = guardrails::parse_date_expression(expression, now_ts, timezone).ok()?;
    Some((resolved, resolved))
}

fn is_ambiguous_destination(destination: &str) -> bool {
    let normalized = destination
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    AMBIGUOUS_COUNTRIES.contains(&normalized.as_str())
}

/// Split the total days evenly across destinations; earlier legs absorb
/// the remainder so every day is assigned exactly once.
fn build_legs(destinations: &[String], start_date: NaiveDate, end_date: NaiveDate) -> Vec<TripLeg> {
    let total_days = (end_date - start_date).num_days() + 1;
    let count = destinations.len() as i64;
    let base_days = total_days / count;
    let remainder = total_days % count;

    let mut legs = Vec::with_capacity(destinations.len());
    let mut cursor = start_date;
    for (idx, destination) in destinations.iter().enumerate() {
        let mut days_for_leg = base_days;
        if (idx as i64) < remainder {
            days_for_leg += 1;
        }
        let leg_end = cursor + Duration::days(days_for_leg - 1);
        legs.push(TripLeg {
            destination_text: destination.clone(),
            geo: None,
            date_range: DateRange::new(cursor, leg_end),
        });
        cursor = leg_end + Duration::days(1);
    }
    legs
}
