//! Staged plan execution
//!
//! The executor walks a Plan in dependency order:
//! - ready tasks are batched into deterministically ordered stages
//! - each task gets a bounded number of immediate retries
//! - an exhausted critical task escalates the whole run to a
//!   clarification outcome
//! - observer callbacks fire at stage and task boundaries

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::types::{
    AgentKind, ExecutionOutcome, ExecutionStatus, IssueCode, Plan, PlanTask, StandardAgentResult,
    TaskExecutionRecord, TaskFailure, TaskId,
};

/// Default confidence gate for specialist results.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;
/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Agent kinds whose exhausted failure aborts the whole plan.
pub fn default_critical_agents() -> HashSet<AgentKind> {
    HashSet::from([
        AgentKind::Geo,
        AgentKind::Weather,
        AgentKind::Poi,
        AgentKind::Transport,
    ])
}

/// Error a handler reports instead of a payload.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// input_ref did not match the expected leg reference shape
    #[error("unusable input_ref '{0}'")]
    InvalidInputRef(String),
    /// A tool budget refused the call
    #[error("rate limited; retry in {wait_seconds:.2}s")]
    RateLimited { wait_seconds: f64 },
    /// Cache or other store failure underneath the handler
    #[error("store failure: {0}")]
    Store(String),
    /// Anything else the handler wants to surface
    #[error("{0}")]
    Other(String),
}

/// One specialist implementation.
///
/// `Err` models a raised handler. An `Ok` payload still goes through
/// [`StandardAgentResult`] parsing and the semantic checks, so a
/// handler cannot bypass evaluation by returning arbitrary JSON.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    async fn handle(&self, task: &PlanTask) -> Result<Value, HandlerError>;
}

/// Handler table, total over [`AgentKind`] by construction.
#[derive(Clone)]
pub struct HandlerRegistry {
    geo: Arc<dyn AgentHandler>,
    weather: Arc<dyn AgentHandler>,
    poi: Arc<dyn AgentHandler>,
    transport: Arc<dyn AgentHandler>,
    synth: Arc<dyn AgentHandler>,
}

impl HandlerRegistry {
    pub fn new(
        geo: Arc<dyn AgentHandler>,
        weather: Arc<dyn AgentHandler>,
        poi: Arc<dyn AgentHandler>,
        transport: Arc<dyn AgentHandler>,
        synth: Arc<dyn AgentHandler>,
    ) -> Self {
        Self {
            geo,
            weather,
            poi,
            transport,
            synth,
        }
    }

    /// Look up the handler for an agent kind.
    pub fn handler(&self, kind: AgentKind) -> &Arc<dyn AgentHandler> {
        match kind {
            AgentKind::Geo => &self.geo,
            AgentKind::Weather => &self.weather,
            AgentKind::Poi => &self.poi,
            AgentKind::Transport => &self.transport,
            AgentKind::Synth => &self.synth,
        }
    }
}

/// Callbacks fired at scheduling boundaries.
///
/// All methods default to no-ops so an implementation overrides only
/// what it observes. `stage_index` counts recorded stages; a batch
/// that produced no success never completes and is never counted.
pub trait ExecutionObserver: Send + Sync {
    fn on_stage_started(&self, _stage_index: usize, _task_ids: &[TaskId]) {}
    fn on_task_started(&self, _task: &PlanTask, _attempt: u32) {}
    fn on_task_finished(&self, _record: &TaskExecutionRecord) {}
    fn on_stage_completed(&self, _stage_index: usize, _task_ids: &[TaskId]) {}
    fn on_escalated(&self, _failure: &TaskFailure) {}
}

/// Fatal scheduling error. Never expected from planner-produced plans.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("execution stuck; unresolved dependencies for tasks: {remaining:?}")]
    UnresolvedDependencies { remaining: Vec<String> },
}

struct AttemptOutcome {
    record: TaskExecutionRecord,
    result: Option<StandardAgentResult>,
}

/// Staged, dependency-ordered plan executor.
pub struct Executor {
    registry: HandlerRegistry,
    confidence_threshold: f64,
    max_retries: u32,
    critical_agents: HashSet<AgentKind>,
    observer: Option<Arc<dyn ExecutionObserver>>,
}

impl Executor {
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            registry,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            max_retries: DEFAULT_MAX_RETRIES,
            critical_agents: default_critical_agents(),
            observer: None,
        }
    }

    /// Set the confidence gate applied to parsed results.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the number of retries after the first attempt.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Replace the critical agent set.
    pub fn with_critical_agents(mut self, agents: impl IntoIterator<Item = AgentKind>) -> Self {
        self.critical_agents = agents.into_iter().collect();
        self
    }

    /// Attach an observer for stage/task boundary callbacks.
    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    fn observe<F: Fn(&dyn ExecutionObserver)>(&self, f: F) {
        if let Some(observer) = &self.observer {
            f(observer.as_ref());
        }
    }

    /// Execute a plan to its terminal outcome.
    ///
    /// Scheduling is single-threaded and deterministic: ready groups
    /// run in ascending group-key order, tasks within a group in
    /// ascending task-id order. A group's tasks do not unblock their
    /// dependents until the next scheduling pass.
    pub async fn execute(&self, plan: &Plan) -> Result<ExecutionOutcome, ExecuteError> {
        let mut pending: BTreeMap<TaskId, &PlanTask> = plan
            .tasks
            .iter()
            .map(|task| (task.task_id.clone(), task))
            .collect();
        let mut completed: BTreeSet<TaskId> = BTreeSet::new();
        let mut results: BTreeMap<TaskId, StandardAgentResult> = BTreeMap::new();
        let mut records: Vec<TaskExecutionRecord> = Vec::new();
        let mut stages: Vec<Vec<TaskId>> = Vec::new();

        info!(tasks = plan.len(), "executing plan");

        while !pending.is_empty() {
            let ready: Vec<&PlanTask> = pending
                .values()
                .filter(|task| task.depends_on.iter().all(|dep| completed.contains(dep)))
                .copied()
                .collect();

            if ready.is_empty() {
                let remaining: Vec<String> =
                    pending.keys().map(|id| id.to_string()).collect();
                return Err(ExecuteError::UnresolvedDependencies { remaining });
            }

            let mut groups: BTreeMap<String, Vec<&PlanTask>> = BTreeMap::new();
            for task in ready {
                let key = task
                    .parallel_group
                    .clone()
                    .unwrap_or_else(|| format!("solo:{}", task.task_id));
                groups.entry(key).or_default().push(task);
            }

            for (group_key, mut group) in groups {
                group.sort_by(|a, b| a.task_id.cmp(&b.task_id));
                let group_ids: Vec<TaskId> =
                    group.iter().map(|task| task.task_id.clone()).collect();
                let stage_index = stages.len();
                debug!(stage = stage_index, group = %group_key, tasks = group_ids.len(), "stage ready");
                self.observe(|o| o.on_stage_started(stage_index, &group_ids));

                let mut stage_task_ids: Vec<TaskId> = Vec::new();
                for task in group {
                    let AttemptOutcome { record, result } = self.run_task(task).await;
                    self.observe(|o| o.on_task_finished(&record));
                    let success = record.success;
                    let issues = record.issues.clone();
                    records.push(record);

                    pending.remove(&task.task_id);
                    completed.insert(task.task_id.clone());

                    if success {
                        if let Some(result) = result {
                            results.insert(task.task_id.clone(), result);
                        }
                        stage_task_ids.push(task.task_id.clone());
                    } else if self.critical_agents.contains(&task.agent) {
                        let failure = TaskFailure {
                            task_id: task.task_id.clone(),
                            agent: task.agent,
                            issues,
                        };
                        warn!(
                            task_id = %failure.task_id,
                            agent = %failure.agent,
                            "critical task failed; requesting clarification"
                        );
                        self.observe(|o| o.on_escalated(&failure));
                        return Ok(ExecutionOutcome {
                            status: ExecutionStatus::ClarificationNeeded,
                            results,
                            records,
                            stages,
                            failure: Some(failure),
                        });
                    } else {
                        debug!(
                            task_id = %task.task_id,
                            agent = %task.agent,
                            "non-critical failure absorbed"
                        );
                    }
                }

                if !stage_task_ids.is_empty() {
                    info!(stage = stage_index, completed = stage_task_ids.len(), "stage completed");
                    self.observe(|o| o.on_stage_completed(stage_index, &stage_task_ids));
                    stages.push(stage_task_ids);
                }
            }
        }

        info!(stages = stages.len(), results = results.len(), "plan completed");
        Ok(ExecutionOutcome {
            status: ExecutionStatus::Completed,
            results,
            records,
            stages,
            failure: None,
        })
    }

    /// Run one task through its attempt loop.
    ///
    /// Retries happen immediately, only while attempts remain and the
    /// latest issue set intersects the retryable set. An issue set of
    /// only non-retryable codes stops the loop at once even when
    /// attempts remain.
    async fn run_task(&self, task: &PlanTask) -> AttemptOutcome {
        let handler = self.registry.handler(task.agent);
        let max_attempts = self.max_retries + 1;
        let mut attempts = 0;
        let mut last_issues: Vec<IssueCode> = Vec::new();
        let mut last_result: Option<StandardAgentResult> = None;

        for attempt in 1..=max_attempts {
            attempts = attempt;
            self.observe(|o| o.on_task_started(task, attempt));
            debug!(task_id = %task.task_id, agent = %task.agent, attempt, "running task");

            let (issues, parsed) = match handler.handle(task).await {
                Err(err) => {
                    debug!(task_id = %task.task_id, attempt, error = %err, "handler raised");
                    (vec![IssueCode::HandlerException], None)
                }
                Ok(payload) => match StandardAgentResult::from_value(payload) {
                    Err(err) => {
                        debug!(task_id = %task.task_id, attempt, error = %err, "payload rejected");
                        (vec![IssueCode::SchemaInvalid], None)
                    }
                    Ok(result) => {
                        let mut issues = Vec::new();
                        if result.evidence.is_empty() {
                            issues.push(IssueCode::EvidenceEmpty);
                        }
                        if result.confidence < self.confidence_threshold {
                            issues.push(IssueCode::ConfidenceLow);
                        }
                        if result.cache_key.is_empty() {
                            issues.push(IssueCode::ConsistencyInvalid);
                        }
                        (issues, Some(result))
                    }
                },
            };

            last_result = parsed;
            last_issues = issues;

            if last_issues.is_empty() {
                break;
            }
            warn!(
                task_id = %task.task_id,
                agent = %task.agent,
                attempt,
                issues = ?last_issues,
                "task attempt failed"
            );
            if attempt >= max_attempts || !last_issues.iter().any(|issue| issue.is_retryable()) {
                break;
            }
        }

        let success = last_issues.is_empty();
        AttemptOutcome {
            record: TaskExecutionRecord {
                task_id: task.task_id.clone(),
                agent: task.agent,
                success,
                attempts,
                issues: last_issues,
            },
            result: if success { last_result } else { None },
        }
    }
}
