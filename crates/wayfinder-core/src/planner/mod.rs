//! Plan compilation
//!
//! The planner is a pure compiler from a validated TripSpec to a Plan.
//! Task ids follow a fixed scheme (`geo_leg_0`, `transport_leg_0_1`,
//! `synth_trip`) and emission order is deterministic, so downstream
//! scheduling and rendering are reproducible for identical inputs.

use crate::types::{AgentKind, Plan, PlanTask, TaskId, TripSpec};

/// Deterministic TripSpec -> Plan compiler. Cannot fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Compile the task graph for a trip.
    ///
    /// Per leg: a `geo` task when the destination is unresolved, a
    /// bridging `transport` task from the second leg on, then the
    /// `weather`/`poi` enrichment pair. One terminal `synth` task
    /// closes the graph and depends on every enrichment and transport
    /// task.
    pub fn generate(&self, spec: &TripSpec) -> Plan {
        let mut tasks: Vec<PlanTask> = Vec::new();
        let mut transport_ids: Vec<TaskId> = Vec::new();

        for (idx, leg) in spec.legs.iter().enumerate() {
            let geo_id = if leg.geo.is_none() {
                let id = TaskId::from(format!("geo_leg_{idx}"));
                tasks.push(PlanTask::new(
                    id.clone(),
                    AgentKind::Geo,
                    format!("legs[{idx}]"),
                ));
                Some(id)
            } else {
                None
            };

            if idx > 0 {
                let prev = idx - 1;
                let mut deps = vec![
                    TaskId::from(format!("weather_leg_{prev}")),
                    TaskId::from(format!("poi_leg_{prev}")),
                ];
                if let Some(id) = &geo_id {
                    deps.push(id.clone());
                }
                let transport_id = TaskId::from(format!("transport_leg_{prev}_{idx}"));
                tasks.push(
                    PlanTask::new(
                        transport_id.clone(),
                        AgentKind::Transport,
                        format!("legs[{prev}]->legs[{idx}]"),
                    )
                    .with_depends_on(deps)
                    .with_parallel_group(format!("transfer_{prev}_{idx}")),
                );
                transport_ids.push(transport_id);
            }

            let enrichment_deps: Vec<TaskId> = geo_id.iter().cloned().collect();
            tasks.push(
                PlanTask::new(
                    format!("weather_leg_{idx}"),
                    AgentKind::Weather,
                    format!("legs[{idx}]"),
                )
                .with_depends_on(enrichment_deps.clone())
                .with_parallel_group(format!("leg_{idx}_enrichment")),
            );
            tasks.push(
                PlanTask::new(
                    format!("poi_leg_{idx}"),
                    AgentKind::Poi,
                    format!("legs[{idx}]"),
                )
                .with_depends_on(enrichment_deps)
                .with_parallel_group(format!("leg_{idx}_enrichment")),
            );
        }

        let mut synth_deps: Vec<TaskId> = Vec::new();
        for idx in 0..spec.legs.len() {
            synth_deps.push(TaskId::from(format!("weather_leg_{idx}")));
            synth_deps.push(TaskId::from(format!("poi_leg_{idx}")));
        }
        synth_deps.extend(transport_ids);

        tasks.push(
            PlanTask::new("synth_trip", AgentKind::Synth, "trip")
                .with_depends_on(synth_deps)
                .with_stop_condition("validated_inputs_present"),
        );

        Plan::new(tasks)
    }
}
