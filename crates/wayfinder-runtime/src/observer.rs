//! Tracing-backed execution observer.

use tracing::{debug, info, warn};

use wayfinder_core::{ExecutionObserver, PlanTask, TaskExecutionRecord, TaskFailure, TaskId};

/// Forwards executor callbacks into tracing events.
///
/// Stateless; one instance can be shared across runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ExecutionObserver for TracingObserver {
    fn on_stage_started(&self, stage_index: usize, task_ids: &[TaskId]) {
        debug!(stage = stage_index, tasks = task_ids.len(), "stage started");
    }

    fn on_task_started(&self, task: &PlanTask, attempt: u32) {
        debug!(task_id = %task.task_id, agent = %task.agent, attempt, "task started");
    }

    fn on_task_finished(&self, record: &TaskExecutionRecord) {
        if record.success {
            debug!(
                task_id = %record.task_id,
                agent = %record.agent,
                attempts = record.attempts,
                "task finished"
            );
        } else {
            warn!(
                task_id = %record.task_id,
                agent = %record.agent,
                attempts = record.attempts,
                issues = ?record.issues,
                "task failed"
            );
        }
    }

    fn on_stage_completed(&self, stage_index: usize, task_ids: &[TaskId]) {
        info!(stage = stage_index, completed = task_ids.len(), "stage completed");
    }

    fn on_escalated(&self, failure: &TaskFailure) {
        warn!(
            task_id = %failure.task_id,
            agent = %failure.agent,
            issues = ?failure.issues,
            "execution escalated to clarification"
        );
    }
}
