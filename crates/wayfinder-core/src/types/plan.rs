//! Plan and task type definitions
//!
//! A Plan is the deterministic task graph produced by the planner; a
//! PlanTask is one unit of specialist work inside it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Strongly-typed Task ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&TaskId> for TaskId {
    fn from(value: &TaskId) -> Self {
        value.clone()
    }
}

impl From<TaskId> for String {
    fn from(value: TaskId) -> Self {
        value.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl PartialEq<&str> for TaskId {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Specialist category a task is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Destination resolution (place name -> coordinates and bbox)
    Geo,
    /// Forecast retrieval for a leg's date range
    Weather,
    /// Points-of-interest retrieval for a destination
    Poi,
    /// Inter-leg transport options
    Transport,
    /// Terminal itinerary synthesis
    Synth,
}

impl AgentKind {
    /// Every kind, in dispatch-table order.
    pub const ALL: [AgentKind; 5] = [
        AgentKind::Geo,
        AgentKind::Weather,
        AgentKind::Poi,
        AgentKind::Transport,
        AgentKind::Synth,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Geo => "geo",
            AgentKind::Weather => "weather",
            AgentKind::Poi => "poi",
            AgentKind::Transport => "transport",
            AgentKind::Synth => "synth",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of specialist work in a Plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTask {
    /// Unique identifier for this task (logical ID)
    pub task_id: TaskId,
    /// Specialist that executes this task
    pub agent: AgentKind,
    /// Pointer into the trip spec (e.g. "legs[0]" or "legs[0]->legs[1]")
    pub input_ref: String,
    /// IDs of tasks this task depends on
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    /// Tasks sharing a group label run in the same stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parallel_group: Option<String>,
    /// Gate label checked by the specialist before running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_condition: Option<String>,
}

impl PlanTask {
    /// Create a task with no dependencies and no group.
    pub fn new(task_id: impl Into<TaskId>, agent: AgentKind, input_ref: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            agent,
            input_ref: input_ref.into(),
            depends_on: Vec::new(),
            parallel_group: None,
            stop_condition: None,
        }
    }

    /// Add dependencies
    pub fn with_depends_on(mut self, deps: Vec<TaskId>) -> Self {
        self.depends_on = deps;
        self
    }

    /// Add a parallel group label
    pub fn with_parallel_group(mut self, group: impl Into<String>) -> Self {
        self.parallel_group = Some(group.into());
        self
    }

    /// Add a stop condition label
    pub fn with_stop_condition(mut self, condition: impl Into<String>) -> Self {
        self.stop_condition = Some(condition.into());
        self
    }
}

/// Ordered task graph produced by the planner.
///
/// Task order is meaningful: it is the planner's emission order and is
/// relied on by tests and by plan rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub tasks: Vec<PlanTask>,
}

impl Plan {
    pub fn new(tasks: Vec<PlanTask>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Emission-ordered task IDs.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.task_id.clone()).collect()
    }

    /// Look up a task by ID.
    pub fn get(&self, task_id: &TaskId) -> Option<&PlanTask> {
        self.tasks.iter().find(|t| &t.task_id == task_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_conversions() {
        let id = TaskId::from("geo_leg_0");
        assert_eq!(id, "geo_leg_0");
        assert_eq!(id.as_str(), "geo_leg_0");
        assert_eq!(String::from(id.clone()), "geo_leg_0".to_string());
        assert_eq!(format!("{id}"), "geo_leg_0");
    }

    #[test]
    fn test_agent_kind_serializes_snake_case() {
        let kind: AgentKind = serde_json::from_str("\"weather\"").unwrap();
        assert_eq!(kind, AgentKind::Weather);
        assert_eq!(serde_json::to_string(&AgentKind::Transport).unwrap(), "\"transport\"");
    }

    #[test]
    fn test_plan_lookup_by_id() {
        let plan = Plan::new(vec![
            PlanTask::new("a", AgentKind::Geo, "legs[0]"),
            PlanTask::new("b", AgentKind::Weather, "legs[0]").with_depends_on(vec!["a".into()]),
        ]);
        assert_eq!(plan.len(), 2);
        assert!(plan.get(&TaskId::from("b")).is_some());
        assert!(plan.get(&TaskId::from("missing")).is_none());
    }
}
