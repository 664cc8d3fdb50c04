//! Draft extraction
//!
//! A draft is the partially-filled view of a trip request before any
//! validation. Extraction quality is pluggable behind [`DraftExtractor`];
//! the in-crate [`QueryDraftExtractor`] is pure regex heuristics so the
//! pipeline runs deterministically with no network collaborator.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use wayfinder_core::types::{BudgetScope, Mobility, Pace};

use crate::guardrails::resolve_weekend_range;

/// Partially-filled trip request produced by an extractor.
///
/// Every field is optional; the intake step decides what is missing and
/// what to ask. Date fields stay as raw strings so the guardrails own all
/// date interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripSpecDraft {
    #[serde(default)]
    pub destination_text: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub date_expression: Option<String>,
    #[serde(default)]
    pub budget_amount: Option<f64>,
    #[serde(default)]
    pub budget_currency: Option<String>,
    #[serde(default)]
    pub budget_scope: Option<BudgetScope>,
    #[serde(default)]
    pub num_travelers: Option<u32>,
    #[serde(default)]
    pub preferences_tags: Vec<String>,
    #[serde(default)]
    pub pace: Option<Pace>,
    #[serde(default)]
    pub mobility: Option<Mobility>,
    #[serde(default)]
    pub accessibility: Option<String>,
    #[serde(default)]
    pub input_language: Option<String>,
    #[serde(default)]
    pub output_language: Option<String>,
}

/// Boundary for draft extraction.
///
/// A structured-output language model sits behind this trait in a real
/// deployment; intake never learns where a draft came from.
pub trait DraftExtractor: Send + Sync {
    fn extract(&self, query: &str, now_ts: DateTime<Utc>, timezone: &str) -> TripSpecDraft;
}

/// Deterministic regex extractor over the raw query text.
pub struct QueryDraftExtractor {
    destination_lead: Regex,
    destination_stop: Regex,
    stop_words: Regex,
    destination_split: Regex,
    iso_range: Regex,
    single_date: Regex,
    duration: Regex,
    money: Regex,
    per_person: Regex,
    travelers: Regex,
}

const TAG_KEYWORDS: [&str; 5] = ["museum", "food", "hiking", "beach", "nightlife"];
const ITALIAN_MARKERS: [&str; 5] = ["ciao", "viaggio", "giorni", "itinerario", "musei"];

impl QueryDraftExtractor {
    pub fn new() -> Self {
        // Patterns are literals; compilation cannot fail at runtime.
        Self {
            destination_lead: Regex::new(r"(?i)\bto\s+(.+)").expect("valid pattern"),
            destination_stop: Regex::new(
                r"(?i)\b(?:next weekend|this weekend|from\b|on\b|for \d+ day)",
            )
            .expect("valid pattern"),
            stop_words: Regex::new(r"(?i)\b(?:plan|trip|travel|visit|days?|a|an|the|please)\b")
                .expect("valid pattern"),
            destination_split: Regex::new(r"(?i),| and | then | -> ").expect("valid pattern"),
            iso_range: Regex::new(r"(\d{4}-\d{2}-\d{2})\s*(to|-)\s*(\d{4}-\d{2}-\d{2})")
                .expect("valid pattern"),
            single_date: Regex::new(r"(?i)\b(?:on\s+)?(\d{4}-\d{2}-\d{2})\b")
                .expect("valid pattern"),
            duration: Regex::new(r"\b(\d+)\s*-\s*day\b|\b(\d+)\s+day\b").expect("valid pattern"),
            money: Regex::new(r"(?i)([€$])\s*(\d+(?:\.\d+)?)|(\d+(?:\.\d+)?)\s*(eur|usd)")
                .expect("valid pattern"),
            per_person: Regex::new(r"(?i)\bper\s+person\b").expect("valid pattern"),
            travelers: Regex::new(r"(?i)\bfor\s+(\d+)\s+(?:people|travelers|travellers|persons)\b")
                .expect("valid pattern"),
        }
    }

    fn destinations(&self, query: &str) -> Vec<String> {
        let segment = match self
            .destination_lead
            .captures(query)
            .and_then(|caps| caps.get(1))
        {
            Some(m) => &query[m.start()..],
            None => query,
        };
        let segment = match self.destination_stop.find(segment) {
            Some(m) => &segment[..m.start()],
            None => segment,
        };
        let cleaned = self.stop_words.replace_all(segment, " ");

        let mut seen = std::collections::HashSet::new();
        let mut destinations = Vec::new();
        for part in self.destination_split.split(&cleaned) {
            let text = part.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.chars().count() <= 2 {
                continue;
            }
            let titled = title_case(&text);
            if seen.insert(titled.to_lowercase()) {
                destinations.push(titled);
            }
        }
        destinations
    }

    fn fill_dates(
        &self,
        draft: &mut TripSpecDraft,
        query: &str,
        now_ts: DateTime<Utc>,
        timezone: &str,
    ) {
        let lowered = query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let duration = self.duration_days(&lowered);

        for phrase in ["next weekend", "this weekend"] {
            if !lowered.contains(phrase) {
                continue;
            }
            // A duration phrase extends the stay from the weekend start;
            // otherwise the weekend pair itself is the range.
            match (
                duration,
                resolve_weekend_range(phrase, now_ts, timezone),
            ) {
                (Some(days), Ok((saturday, _))) => {
                    draft.start_date = Some(saturday.to_string());
                    draft.end_date = Some((saturday + Duration::days(days - 1)).to_string());
                }
                _ => draft.date_expression = Some(phrase.to_string()),
            }
            return;
        }

        let start_raw = if let Some(caps) = self.iso_range.captures(query) {
            draft.end_date = caps.get(3).map(|m| m.as_str().to_string());
            caps.get(1).map(|m| m.as_str().to_string())
        } else {
            self.single_date
                .captures(query)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        };

        let Some(start_raw) = start_raw else { return };
        if draft.end_date.is_none() {
            draft.end_date = Some(start_raw.clone());
        }
        if let (Some(days), Ok(start)) = (
            duration,
            NaiveDate::parse_from_str(&start_raw, "%Y-%m-%d"),
        ) {
            draft.end_date = Some((start + Duration::days(days - 1)).to_string());
        }
        draft.start_date = Some(start_raw);
    }

    fn duration_days(&self, lowered: &str) -> Option<i64> {
        let caps = self.duration.captures(lowered)?;
        let raw = caps.get(1).or_else(|| caps.get(2))?.as_str();
        let days: i64 = raw.parse().ok()?;
        Some(days.max(1))
    }

    fn fill_budget(&self, draft: &mut TripSpecDraft, query: &str) {
        let amount = self.money.captures(query).and_then(|caps| {
            caps.get(2)
                .or_else(|| caps.get(3))
                .and_then(|m| m.as_str().parse::<f64>().ok())
        });
        draft.budget_amount = Some(amount.unwrap_or(1500.0));

        let lowered = query.to_lowercase();
        let currency = if query.contains('€') || lowered.contains("eur") {
            "EUR"
        } else if query.contains('$') || lowered.contains("usd") {
            "USD"
        } else {
            "EUR"
        };
        draft.budget_currency = Some(currency.to_string());

        if self.per_person.is_match(query) {
            draft.budget_scope = Some(BudgetScope::PerPerson);
        }
    }

    fn traveler_count(&self, query: &str) -> Option<u32> {
        self.travelers
            .captures(query)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    fn tags(&self, query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        TAG_KEYWORDS
            .iter()
            .filter(|keyword| lowered.contains(*keyword))
            .map(|keyword| keyword.to_string())
            .collect()
    }

    fn language(&self, query: &str) -> String {
        let lowered = query.to_lowercase();
        if ITALIAN_MARKERS
            .iter()
            .any(|marker| lowered.contains(marker))
        {
            "it".to_string()
        } else {
            "en".to_string()
        }
    }
}

impl Default for QueryDraftExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl DraftExtractor for QueryDraftExtractor {
    fn extract(&self, query: &str, now_ts: DateTime<Utc>, timezone: &str) -> TripSpecDraft {
        let mut draft = TripSpecDraft::default();

        let destinations = self.destinations(query);
        if !destinations.is_empty() {
            draft.destination_text = Some(destinations.join(", "));
        }

        self.fill_dates(&mut draft, query, now_ts, timezone);
        self.fill_budget(&mut draft, query);
        draft.num_travelers = self.traveler_count(query);
        draft.preferences_tags = self.tags(query);

        let language = self.language(query);
        draft.input_language = Some(language.clone());
        draft.output_language = Some(language);

        draft
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
