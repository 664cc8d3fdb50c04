//! Core type definitions for Wayfinder
//!
//! This module contains the contracts shared across the system:
//! - TripSpec and its nested request types: the validated input document
//! - Plan / PlanTask: the compiled task graph
//! - StandardAgentResult: the uniform specialist envelope
//! - ExecutionOutcome: records, stages, and the escalation descriptor

mod outcome;
mod plan;
mod result;
mod trip;

pub use outcome::{ExecutionOutcome, ExecutionStatus, IssueCode, TaskExecutionRecord, TaskFailure};
pub use plan::{AgentKind, Plan, PlanTask, TaskId};
pub use result::{EvidenceItem, SchemaError, StandardAgentResult};
pub use trip::{
    Budget, BudgetScope, Constraints, DateRange, GeoPoint, Mobility, Pace, Preferences,
    RequestContext, TripLeg, TripSpec, ValidationError,
};
