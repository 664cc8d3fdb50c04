//! Execution outcome types
//!
//! Per-task records, issue codes, and the terminal outcome one executor
//! run produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::plan::{AgentKind, TaskId};
use super::result::StandardAgentResult;

/// Issue codes attached to a task attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// The handler returned an error instead of a payload
    HandlerException,
    /// The payload failed to parse as a StandardAgentResult
    SchemaInvalid,
    /// The parsed result carried no evidence
    EvidenceEmpty,
    /// Confidence fell below the executor threshold
    ConfidenceLow,
    /// The result's cache_key was empty
    ConsistencyInvalid,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::HandlerException => "handler_exception",
            IssueCode::SchemaInvalid => "schema_invalid",
            IssueCode::EvidenceEmpty => "evidence_empty",
            IssueCode::ConfidenceLow => "confidence_low",
            IssueCode::ConsistencyInvalid => "consistency_invalid",
        }
    }

    /// Whether another immediate attempt could change the outcome.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IssueCode::SchemaInvalid | IssueCode::EvidenceEmpty | IssueCode::ConfidenceLow
        )
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final record for one task, covering all its attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskExecutionRecord {
    pub task_id: TaskId,
    pub agent: AgentKind,
    pub success: bool,
    /// Cumulative attempt count
    pub attempts: u32,
    /// Issues from the final attempt; empty on success
    #[serde(default)]
    pub issues: Vec<IssueCode>,
}

/// Terminal status of an executor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    ClarificationNeeded,
}

/// Structured descriptor of the failure that forced escalation.
///
/// Rendering the user-facing question from this is presentation work
/// and lives outside the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub agent: AgentKind,
    pub issues: Vec<IssueCode>,
}

/// Everything one `execute` call produced. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: ExecutionStatus,
    /// Successful task results only
    pub results: BTreeMap<TaskId, StandardAgentResult>,
    /// All task records in execution order
    pub records: Vec<TaskExecutionRecord>,
    /// One entry per batch that produced at least one success
    pub stages: Vec<Vec<TaskId>>,
    /// Present iff status is ClarificationNeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<TaskFailure>,
}

impl ExecutionOutcome {
    pub fn needs_clarification(&self) -> bool {
        matches!(self.status, ExecutionStatus::ClarificationNeeded)
    }
}
