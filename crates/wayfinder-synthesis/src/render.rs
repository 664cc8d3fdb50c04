//! Plain-text renderings of synthesis output.

use wayfinder_core::TaskFailure;

use crate::catalog::Language;
use crate::itinerary::DayPlan;

/// Compact day-by-day listing for terminal output.
pub fn render_day_by_day(days: &[DayPlan]) -> String {
    let mut lines: Vec<String> = Vec::new();
    for day in days {
        lines.push(format!(
            "Day {} ({}) - {}",
            day.day_index, day.date, day.destination
        ));
        for activity in &day.activities {
            lines.push(format!("  - {}: {}", activity.period, activity.name));
        }
    }
    lines.join("\n")
}

/// The user-facing question for an executor escalation.
pub fn render_clarification(failure: &TaskFailure, language: Language) -> String {
    let issues = failure
        .issues
        .iter()
        .map(|issue| issue.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    match language {
        Language::En => format!(
            "I need clarification because task '{}' failed ({issues}).",
            failure.task_id
        ),
        Language::It => format!(
            "Ho bisogno di chiarimenti perche il task '{}' e fallito ({issues}).",
            failure.task_id
        ),
    }
}
