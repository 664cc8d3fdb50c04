//! One front door for the whole engine.
//!
//! [`Pipeline`] owns the long-lived pieces (config, intake, planner,
//! synthesizer, tool stores) and drives a query through intake,
//! planning, execution, and synthesis to a terminal [`PipelineReport`].
//! Stores persist across runs, so repeated queries hit the cache.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use wayfinder_agents::{build_registry, ToolStores};
use wayfinder_config::{load_config, ConfigError, WayfinderConfig};
use wayfinder_core::planner::Planner;
use wayfinder_core::types::ValidationError;
use wayfinder_core::{ExecuteError, ExecutionOutcome, Executor, TaskId, TripSpec};
use wayfinder_intake::{Intake, IntakeResult, QueryDraftExtractor};
use wayfinder_stores::{MonotonicClock, StoreError};
use wayfinder_synthesis::{
    render_clarification, render_day_by_day, DayPlan, Language, Synthesizer,
};

use crate::observer::TracingObserver;

/// Fatal pipeline failure. User-facing gaps are not errors; they come
/// back as [`PipelineReport::ClarificationNeeded`].
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}

/// Per-run request parameters.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Reference instant for date resolution; wall clock when absent.
    pub now_ts: Option<DateTime<Utc>>,
    /// IANA timezone the request is anchored in.
    pub timezone: String,
    /// Forces the report language regardless of query detection.
    pub output_language: Option<Language>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            now_ts: None,
            timezone: "UTC".to_string(),
            output_language: None,
        }
    }
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineReport {
    /// More information is needed, from intake or from a failed
    /// critical task.
    ClarificationNeeded {
        clarifying_question: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        stages: Vec<Vec<TaskId>>,
    },
    /// A full itinerary was produced.
    Completed {
        language: Language,
        title: String,
        days: Vec<DayPlan>,
        warnings: Vec<String>,
        stages: Vec<Vec<TaskId>>,
        itinerary_text: String,
    },
}

impl PipelineReport {
    pub fn is_completed(&self) -> bool {
        matches!(self, PipelineReport::Completed { .. })
    }
}

/// Drives queries end to end against one configuration.
pub struct Pipeline {
    config: WayfinderConfig,
    intake: Intake,
    planner: Planner,
    synthesizer: Synthesizer,
    stores: ToolStores,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Build a pipeline from an already-validated config. The cache and
    /// rate limiters run on the monotonic clock and are shared by every
    /// run of this pipeline.
    pub fn new(config: WayfinderConfig) -> Result<Self, PipelineError> {
        let stores = ToolStores::from_config(&config, Arc::new(MonotonicClock::new()))?;
        let intake = Intake::new(Arc::new(QueryDraftExtractor::new()))
            .with_trip_day_bounds(config.intake.min_trip_days, config.intake.max_trip_days);
        Ok(Self {
            config,
            intake,
            planner: Planner::new(),
            synthesizer: Synthesizer::new(),
            stores,
        })
    }

    /// Build a pipeline from a config file on disk.
    pub fn from_config_path(path: &Path) -> Result<Self, PipelineError> {
        Self::new(load_config(path)?)
    }

    pub fn config(&self) -> &WayfinderConfig {
        &self.config
    }

    /// Run one query to a terminal report.
    pub async fn run(
        &self,
        query: &str,
        options: &RunOptions,
    ) -> Result<PipelineReport, PipelineError> {
        let run_id = Uuid::new_v4().to_string();
        let now_ts = options.now_ts.unwrap_or_else(Utc::now);
        info!(run_id = %run_id, timezone = %options.timezone, "pipeline run started");

        let mut trip = match self.intake.process(query, now_ts, &options.timezone)? {
            IntakeResult::Ready { tripspec } => tripspec,
            IntakeResult::ClarificationNeeded {
                clarifying_question,
            } => {
                info!(
                    run_id = %run_id,
                    reason = %clarifying_question.reason,
                    "intake needs clarification"
                );
                return Ok(PipelineReport::ClarificationNeeded {
                    clarifying_question: clarifying_question.questions.join(" "),
                    reason: Some(clarifying_question.reason.to_string()),
                    stages: Vec::new(),
                });
            }
        };
        if let Some(language) = options.output_language {
            trip.request_context.output_language = language.as_str().to_string();
        }

        let plan = self.planner.generate(&trip);
        debug!(run_id = %run_id, tasks = plan.len(), legs = trip.legs.len(), "plan generated");

        let trip = Arc::new(trip);
        let registry = build_registry(Arc::clone(&trip), &self.stores, &self.config);
        let executor = Executor::new(registry)
            .with_confidence_threshold(self.config.engine.confidence_threshold)
            .with_max_retries(self.config.engine.max_retries)
            .with_critical_agents(self.config.engine.critical_agents.iter().copied())
            .with_observer(Arc::new(TracingObserver));

        let ExecutionOutcome {
            results,
            stages,
            failure,
            ..
        } = executor.execute(&plan).await?;

        let language = report_language(&trip);
        if let Some(failure) = failure {
            info!(
                run_id = %run_id,
                task_id = %failure.task_id,
                "run ended in clarification"
            );
            return Ok(PipelineReport::ClarificationNeeded {
                clarifying_question: render_clarification(&failure, language),
                reason: None,
                stages,
            });
        }

        let itinerary = self.synthesizer.synthesize(&trip, &results, None);
        let itinerary_text = render_day_by_day(&itinerary.days);
        info!(
            run_id = %run_id,
            days = itinerary.days.len(),
            warnings = itinerary.warnings.len(),
            "run completed"
        );
        Ok(PipelineReport::Completed {
            language: itinerary.language,
            title: itinerary.title,
            days: itinerary.days,
            warnings: itinerary.warnings,
            stages,
            itinerary_text,
        })
    }
}

/// Report language once any override has been folded into the trip.
fn report_language(trip: &TripSpec) -> Language {
    Language::from_tag(&trip.request_context.output_language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FULL_QUERY: &str = "Plan a trip to Lisbon from 2026-03-10 to 2026-03-12 with 800 EUR";

    fn fixed_options() -> RunOptions {
        RunOptions {
            now_ts: Some(Utc.with_ymd_and_hms(2026, 2, 16, 10, 30, 0).unwrap()),
            timezone: "Europe/Rome".to_string(),
            output_language: None,
        }
    }

    fn pipeline() -> Pipeline {
        Pipeline::new(WayfinderConfig::default()).unwrap()
    }

    #[test]
    fn test_full_query_produces_three_day_itinerary() {
        let report = tokio_test::block_on(async {
            pipeline().run(FULL_QUERY, &fixed_options()).await.unwrap()
        });

        match report {
            PipelineReport::Completed {
                language,
                title,
                days,
                warnings,
                stages,
                itinerary_text,
            } => {
                assert_eq!(language, Language::En);
                assert_eq!(title, "Day-by-day itinerary");
                assert_eq!(days.len(), 3);
                assert_eq!(days[0].destination, "Lisbon");
                assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
                assert_eq!(stages.len(), 3);
                assert_eq!(stages[0], vec![TaskId::from("geo_leg_0")]);
                assert_eq!(
                    stages[1],
                    vec![TaskId::from("poi_leg_0"), TaskId::from("weather_leg_0")]
                );
                assert_eq!(stages[2], vec![TaskId::from("synth_trip")]);
                assert!(itinerary_text.starts_with("Day 1 (2026-03-10) - Lisbon"));
            }
            other => panic!("expected a completed report, got {other:?}"),
        }
    }

    #[test]
    fn test_vague_query_returns_intake_clarification() {
        let report = tokio_test::block_on(async {
            pipeline().run("Plan a trip", &fixed_options()).await.unwrap()
        });

        match report {
            PipelineReport::ClarificationNeeded {
                clarifying_question,
                reason,
                stages,
            } => {
                assert!(clarifying_question.contains("city or region"));
                assert!(clarifying_question.contains("travel dates"));
                assert_eq!(reason.as_deref(), Some("destination_missing"));
                assert!(stages.is_empty());
            }
            other => panic!("expected a clarification, got {other:?}"),
        }
    }

    #[test]
    fn test_output_language_override_renders_italian() {
        let mut options = fixed_options();
        options.output_language = Some(Language::It);
        let report = tokio_test::block_on(async {
            pipeline().run(FULL_QUERY, &options).await.unwrap()
        });

        match report {
            PipelineReport::Completed {
                language, title, ..
            } => {
                assert_eq!(language, Language::It);
                assert_eq!(title, "Itinerario giorno per giorno");
            }
            other => panic!("expected a completed report, got {other:?}"),
        }
    }

    #[test]
    fn test_high_confidence_threshold_escalates_geo() {
        let mut config = WayfinderConfig::default();
        config.engine.confidence_threshold = 0.9;
        let pipeline = Pipeline::new(config).unwrap();

        let report = tokio_test::block_on(async {
            pipeline.run(FULL_QUERY, &fixed_options()).await.unwrap()
        });

        match report {
            PipelineReport::ClarificationNeeded {
                clarifying_question,
                reason,
                stages,
            } => {
                assert!(clarifying_question.contains("geo_leg_0"));
                assert!(clarifying_question.contains("confidence_low"));
                assert!(reason.is_none());
                assert!(stages.is_empty());
            }
            other => panic!("expected a clarification, got {other:?}"),
        }
    }

    #[test]
    fn test_repeat_run_reuses_stores_across_runs() {
        let pipeline = pipeline();
        let (first, second) = tokio_test::block_on(async {
            let first = pipeline.run(FULL_QUERY, &fixed_options()).await.unwrap();
            let second = pipeline.run(FULL_QUERY, &fixed_options()).await.unwrap();
            (first, second)
        });

        // Second run is served from the cache and must match the first.
        assert_eq!(first, second);
        assert!(second.is_completed());
    }

    #[test]
    fn test_missing_config_file_surfaces_config_error() {
        let err = Pipeline::from_config_path(Path::new("/nonexistent/wayfinder.yaml"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn test_completed_report_serializes_with_status_tag() {
        let report = tokio_test::block_on(async {
            pipeline().run(FULL_QUERY, &fixed_options()).await.unwrap()
        });

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["language"], "en");
        assert_eq!(value["stages"][0][0], "geo_leg_0");
        assert!(value["itinerary_text"].as_str().unwrap().contains("Day 2"));
    }
}
