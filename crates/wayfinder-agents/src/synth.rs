//! Synthesis stage marker.
//!
//! The terminal task in every plan. Itinerary assembly itself happens
//! after execution, once all specialist results are known; this handler
//! only records that the gate was reached, with full confidence so it
//! never trips the evaluation thresholds.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use wayfinder_core::{AgentHandler, HandlerError, PlanTask, TripSpec};

use crate::context::{evidence_item, SharedResults};

/// Handler for the `synth` task.
pub struct SynthHandler {
    trip: Arc<TripSpec>,
    shared: Arc<SharedResults>,
}

impl SynthHandler {
    pub fn new(trip: Arc<TripSpec>, shared: Arc<SharedResults>) -> Self {
        Self { trip, shared }
    }
}

#[async_trait]
impl AgentHandler for SynthHandler {
    async fn handle(&self, task: &PlanTask) -> Result<Value, HandlerError> {
        let payload = json!({
            "data": {
                "task_id": task.task_id.as_str(),
                "status": "synthesized",
            },
            "evidence": [evidence_item(
                "synth",
                "Synthesis stage marker".to_string(),
                "Synthesis stage completed.".to_string(),
                self.trip.request_context.now_ts,
            )],
            "confidence": 1.0,
            "warnings": [],
            "cache_key": format!("synth:{}", task.task_id),
        });
        self.shared.publish(&task.task_id, &payload)?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::trip_fixture;
    use wayfinder_core::{AgentKind, StandardAgentResult};

    #[test]
    fn test_marker_parses_with_full_confidence() {
        let shared = Arc::new(SharedResults::default());
        let handler = SynthHandler::new(trip_fixture(&["Lisbon"]), Arc::clone(&shared));
        let task = PlanTask::new("synth_trip", AgentKind::Synth, "trip");

        let payload = tokio_test::block_on(handler.handle(&task)).unwrap();
        let result = StandardAgentResult::from_value(payload).unwrap();
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.cache_key, "synth:synth_trip");
        assert_eq!(result.data.get("status").unwrap(), "synthesized");
        assert_eq!(result.evidence.len(), 1);
        assert_eq!(result.evidence[0].source, "synth");
        assert!(shared.get("synth_trip").unwrap().is_some());
    }
}
