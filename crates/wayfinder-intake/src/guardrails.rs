//! Deterministic date guardrails
//!
//! Every relative expression resolves against the request's `now_ts` in the
//! request's IANA timezone, so the same query yields the same dates on every
//! run. The accepted vocabulary is deliberately closed: ISO dates, weekend
//! phrases, and a handful of relative forms.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;

/// Date parsing or validation failure.
///
/// Display strings double as user-facing clarification text, so wording
/// stays stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardrailError {
    #[error("Date expression cannot be empty.")]
    EmptyExpression,
    #[error("Unknown timezone: '{0}'.")]
    UnknownTimezone(String),
    #[error("Could not parse date expression: '{0}'.")]
    UnparseableExpression(String),
    #[error("Weekend resolver supports only 'this weekend' and 'next weekend'.")]
    UnsupportedWeekendExpression,
    #[error("min_trip_days must be > 0.")]
    NonPositiveMinimum,
    #[error("max_trip_days must be >= min_trip_days.")]
    MaximumBelowMinimum,
    #[error("Invalid date range: end_date ({end_date}) is before start_date ({start_date}).")]
    EndBeforeStart {
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    #[error("Trip duration {trip_days} day(s) is below minimum {min_trip_days}.")]
    BelowMinimumDuration { trip_days: i64, min_trip_days: i64 },
    #[error("Trip duration {trip_days} day(s) exceeds maximum {max_trip_days}.")]
    AboveMaximumDuration { trip_days: i64, max_trip_days: i64 },
    #[error("Leg date ranges overlap or are not strictly ordered.")]
    OverlappingLegs,
}

fn normalized(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn local_today(now_ts: DateTime<Utc>, timezone: &str) -> Result<NaiveDate, GuardrailError> {
    let tz: Tz = timezone
        .parse()
        .map_err(|_| GuardrailError::UnknownTimezone(timezone.to_string()))?;
    Ok(now_ts.with_timezone(&tz).date_naive())
}

fn number_word(token: &str) -> Option<i64> {
    match token {
        "a" | "an" | "one" => Some(1),
        "two" => Some(2),
        "three" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        _ => token.parse().ok(),
    }
}

/// Resolve a date expression against the request clock.
///
/// Accepts ISO `YYYY-MM-DD`, `this weekend` / `next weekend`, `today`,
/// `tomorrow`, and `in N days` / `in N weeks` with N numeric or spelled
/// out up to ten.
pub fn parse_date_expression(
    expression: &str,
    now_ts: DateTime<Utc>,
    timezone: &str,
) -> Result<NaiveDate, GuardrailError> {
    let text = expression.trim();
    if text.is_empty() {
        return Err(GuardrailError::EmptyExpression);
    }

    let expr = normalized(text);
    let today = local_today(now_ts, timezone)?;

    if expr == "this weekend" || expr == "next weekend" {
        return Ok(resolve_weekend_range(&expr, now_ts, timezone)?.0);
    }

    if let Ok(date) = NaiveDate::parse_from_str(&expr, "%Y-%m-%d") {
        return Ok(date);
    }

    match expr.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        _ => {}
    }

    if let ["in", amount, unit] = expr.split(' ').collect::<Vec<_>>().as_slice() {
        if let Some(n) = number_word(amount) {
            match *unit {
                "day" | "days" => return Ok(today + Duration::days(n)),
                "week" | "weeks" => return Ok(today + Duration::weeks(n)),
                _ => {}
            }
        }
    }

    Err(GuardrailError::UnparseableExpression(
        expression.to_string(),
    ))
}

/// Resolve `this weekend` or `next weekend` to a (Saturday, Sunday) pair.
pub fn resolve_weekend_range(
    expression: &str,
    now_ts: DateTime<Utc>,
    timezone: &str,
) -> Result<(NaiveDate, NaiveDate), GuardrailError> {
    let expr = normalized(expression);
    if expr != "this weekend" && expr != "next weekend" {
        return Err(GuardrailError::UnsupportedWeekendExpression);
    }

    let today = local_today(now_ts, timezone)?;
    let days_until_saturday =
        (5 - i64::from(today.weekday().num_days_from_monday())).rem_euclid(7);
    let mut saturday = today + Duration::days(days_until_saturday);
    if expr == "next weekend" {
        saturday += Duration::days(7);
    }
    Ok((saturday, saturday + Duration::days(1)))
}

/// Parse a start/end expression pair and validate the resulting range.
pub fn parse_date_range(
    start_expression: &str,
    end_expression: &str,
    now_ts: DateTime<Utc>,
    timezone: &str,
    min_trip_days: i64,
    max_trip_days: i64,
) -> Result<(NaiveDate, NaiveDate), GuardrailError> {
    let start_date = parse_date_expression(start_expression, now_ts, timezone)?;
    let end_date = parse_date_expression(end_expression, now_ts, timezone)?;
    validate_date_range(start_date, end_date, min_trip_days, max_trip_days)?;
    Ok((start_date, end_date))
}

/// Reject reversed ranges and durations outside the configured bounds.
///
/// Duration counts both endpoints, so a same-day trip is one day long.
pub fn validate_date_range(
    start_date: NaiveDate,
    end_date: NaiveDate,
    min_trip_days: i64,
    max_trip_days: i64,
) -> Result<(), GuardrailError> {
    if min_trip_days <= 0 {
        return Err(GuardrailError::NonPositiveMinimum);
    }
    if max_trip_days < min_trip_days {
        return Err(GuardrailError::MaximumBelowMinimum);
    }
    if end_date < start_date {
        return Err(GuardrailError::EndBeforeStart {
            start_date,
            end_date,
        });
    }

    let trip_days = (end_date - start_date).num_days() + 1;
    if trip_days < min_trip_days {
        return Err(GuardrailError::BelowMinimumDuration {
            trip_days,
            min_trip_days,
        });
    }
    if trip_days > max_trip_days {
        return Err(GuardrailError::AboveMaximumDuration {
            trip_days,
            max_trip_days,
        });
    }
    Ok(())
}

/// Reject leg ranges that overlap or touch once sorted by start date.
pub fn validate_non_overlapping_legs(
    legs: &[(NaiveDate, NaiveDate)],
) -> Result<(), GuardrailError> {
    let mut sorted = legs.to_vec();
    sorted.sort_by_key(|leg| leg.0);
    for window in sorted.windows(2) {
        if window[1].0 <= window[0].1 {
            return Err(GuardrailError::OverlappingLegs);
        }
    }
    Ok(())
}
