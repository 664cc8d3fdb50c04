//! # Wayfinder Core
//!
//! Deterministic heart of the trip-planning engine.
//!
//! This crate contains:
//! - The shared contracts: TripSpec, Plan, StandardAgentResult,
//!   ExecutionOutcome
//! - The planner: a pure TripSpec -> Plan compiler
//! - The staged executor: dependency-ordered execution with bounded
//!   retry and clarification escalation
//!
//! This crate does NOT care about:
//! - Where a TripSpec came from (intake lives elsewhere)
//! - What a specialist does internally (handlers are injected)
//! - How an outcome is rendered for a user (synthesis lives elsewhere)

pub mod executor;
pub mod planner;
pub mod types;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::executor::{
        default_critical_agents, AgentHandler, ExecuteError, ExecutionObserver, Executor,
        HandlerError, HandlerRegistry,
    };
    pub use crate::planner::Planner;
    pub use crate::types::{
        AgentKind, Budget, BudgetScope, Constraints, DateRange, EvidenceItem, ExecutionOutcome,
        ExecutionStatus, GeoPoint, IssueCode, Mobility, Pace, Plan, PlanTask, Preferences,
        RequestContext, StandardAgentResult, TaskExecutionRecord, TaskFailure, TaskId, TripLeg,
        TripSpec,
    };
}

// Re-export key types at crate root
pub use executor::{
    default_critical_agents, AgentHandler, ExecuteError, ExecutionObserver, Executor,
    HandlerError, HandlerRegistry,
};
pub use planner::Planner;
pub use types::{
    AgentKind, Budget, BudgetScope, Constraints, DateRange, EvidenceItem, ExecutionOutcome,
    ExecutionStatus, GeoPoint, IssueCode, Mobility, Pace, Plan, PlanTask, Preferences,
    RequestContext, StandardAgentResult, TaskExecutionRecord, TaskFailure, TaskId, TripLeg,
    TripSpec,
};
