//! Transport specialist: connection options between consecutive legs.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use tracing::debug;

use wayfinder_core::{AgentHandler, HandlerError, PlanTask, TripSpec};
use wayfinder_stores::{make_cache_key, normalize_text};

use crate::context::{evidence_item, leg_at, transfer_indices, SharedResults, ToolContext};
use crate::ProviderError;

/// Options requested per transfer.
pub const TRANSPORT_LIMIT: usize = 3;

/// Caveat attached to every non-empty option list.
pub const TRANSPORT_CAVEAT: &str = "Transport times are indicative and may change.";

/// One way to get from origin to destination.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportOption {
    pub title: String,
}

/// Seam for transport-search backends.
pub trait TransportProvider: Send + Sync {
    fn options(
        &self,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<TransportOption>, ProviderError>;
}

/// Always proposes one train and one bus connection.
#[derive(Debug, Default)]
pub struct OfflineTransportProvider;

impl TransportProvider for OfflineTransportProvider {
    fn options(
        &self,
        origin: &str,
        destination: &str,
        _departure_date: NaiveDate,
        limit: usize,
    ) -> Result<Vec<TransportOption>, ProviderError> {
        let mut options = vec![
            TransportOption {
                title: format!("Train {origin} to {destination} (approx. 2h 30m)"),
            },
            TransportOption {
                title: format!("Bus {origin} to {destination} (approx. 3h 45m)"),
            },
        ];
        options.truncate(limit);
        Ok(options)
    }
}

/// Handler for `transport` tasks. The input_ref names both legs of the
/// transfer, e.g. `legs[0]->legs[1]`.
pub struct TransportHandler {
    trip: Arc<TripSpec>,
    context: ToolContext,
    shared: Arc<SharedResults>,
    provider: Arc<dyn TransportProvider>,
}

impl TransportHandler {
    pub fn new(
        trip: Arc<TripSpec>,
        context: ToolContext,
        shared: Arc<SharedResults>,
        provider: Arc<dyn TransportProvider>,
    ) -> Self {
        Self {
            trip,
            context,
            shared,
            provider,
        }
    }
}

#[async_trait]
impl AgentHandler for TransportHandler {
    async fn handle(&self, task: &PlanTask) -> Result<Value, HandlerError> {
        let (origin_index, destination_index) = transfer_indices(&task.input_ref)?;
        let origin = leg_at(&self.trip, origin_index, &task.input_ref)?;
        let destination = leg_at(&self.trip, destination_index, &task.input_ref)?;
        let departure = destination.date_range.start_date;
        let locale = self.trip.request_context.output_language.clone();
        let query = format!(
            "{} to {} transport options {departure}",
            origin.destination_text, destination.destination_text
        );
        let cache_key = make_cache_key(
            "search",
            &[
                normalize_text(&query).into(),
                locale.as_str().into(),
                TRANSPORT_LIMIT.into(),
            ],
        );

        if let Some(hit) = self.context.cached(&cache_key)? {
            debug!(task_id = %task.task_id, "transport cache hit");
            self.shared.publish(&task.task_id, &hit)?;
            return Ok(hit);
        }

        let options = self
            .provider
            .options(
                &origin.destination_text,
                &destination.destination_text,
                departure,
                TRANSPORT_LIMIT,
            )
            .map_err(|err| HandlerError::Other(err.to_string()))?;
        let confidence = if options.is_empty() { 0.2 } else { 0.61 };
        let warnings: Vec<String> = if options.is_empty() {
            vec!["No transport options found.".to_string()]
        } else {
            vec![TRANSPORT_CAVEAT.to_string()]
        };
        let rows: Vec<Value> = options
            .iter()
            .map(|option| json!({"title": option.title}))
            .collect();
        let payload = json!({
            "data": {
                "origin": origin.destination_text,
                "destination": destination.destination_text,
                "departure_date": departure.to_string(),
                "options": rows,
            },
            "evidence": [evidence_item(
                "transport",
                format!(
                    "Transport {} to {}",
                    origin.destination_text, destination.destination_text
                ),
                format!("{} option(s) departing {departure}.", options.len()),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{manual_stores, trip_fixture};
    use wayfinder_core::{AgentKind, StandardAgentResult};

    fn transfer_task() -> PlanTask {
        PlanTask::new("transport_leg_0_1", AgentKind::Transport, "legs[0]->legs[1]")
    }

    #[test]
    fn test_offline_options_name_both_endpoints() {
        let departure = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        let options = OfflineTransportProvider
            .options("Lisbon", "Porto", departure, 3)
            .unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].title, "Train Lisbon to Porto (approx. 2h 30m)");
        assert_eq!(options[1].title, "Bus Lisbon to Porto (approx. 3h 45m)");
    }

    #[test]
    fn test_handler_builds_transfer_payload() {
        let (stores, _clock) = manual_stores();
        let handler = TransportHandler::new(
            trip_fixture(&["Lisbon", "Porto"]),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(OfflineTransportProvider),
        );

        let payload = tokio_test::block_on(handler.handle(&transfer_task())).unwrap();
        let result = StandardAgentResult::from_value(payload.clone()).unwrap();
        assert_eq!(result.confidence, 0.61);
        assert_eq!(result.warnings, vec![TRANSPORT_CAVEAT.to_string()]);
        assert!(result.cache_key.starts_with("search:"));
        assert_eq!(payload["data"]["origin"], "Lisbon");
        assert_eq!(payload["data"]["destination"], "Porto");
        // departure is the arrival leg's first day
        assert_eq!(payload["data"]["departure_date"], "2026-03-12");
        assert_eq!(payload["data"]["options"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_handler_rejects_single_leg_reference() {
        let (stores, _clock) = manual_stores();
        let handler = TransportHandler::new(
            trip_fixture(&["Lisbon", "Porto"]),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(OfflineTransportProvider),
        );

        let task = PlanTask::new("transport_leg_0_1", AgentKind::Transport, "legs[0]");
        let err = tokio_test::block_on(handler.handle(&task)).unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInputRef(_)));
    }

    #[test]
    fn test_handler_caches_by_normalized_query() {
        let (stores, _clock) = manual_stores();
        let handler = TransportHandler::new(
            trip_fixture(&["Lisbon", "Porto"]),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(OfflineTransportProvider),
        );

        let first = tokio_test::block_on(handler.handle(&transfer_task())).unwrap();
        let second = tokio_test::block_on(handler.handle(&transfer_task())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_options_lower_confidence() {
        struct NoRoutes;
        impl TransportProvider for NoRoutes {
            fn options(
                &self,
                _origin: &str,
                _destination: &str,
                _departure_date: NaiveDate,
                _limit: usize,
            ) -> Result<Vec<TransportOption>, ProviderError> {
                Ok(Vec::new())
            }
        }

        let (stores, _clock) = manual_stores();
        let handler = TransportHandler::new(
            trip_fixture(&["Lisbon", "Porto"]),
            ToolContext::new(Arc::clone(&stores.cache), 60.0),
            Arc::new(SharedResults::default()),
            Arc::new(NoRoutes),
        );

        let payload = tokio_test::block_on(handler.handle(&transfer_task())).unwrap();
        assert_eq!(payload["confidence"], 0.2);
        assert_eq!(payload["warnings"][0], "No transport options found.");
    }
}
