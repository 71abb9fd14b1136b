//! Progress reporting for command executions
//!
//! The processor reports lifecycle events of every execution to an
//! [`ExecutionReporter`], which UI code implements to forward progress to
//! widgets.

use std::time::Duration;

use crate::task::TaskId;

/// Event types that can be reported during task execution
#[derive(Debug, Clone, PartialEq)]
pub enum TaskExecutionEvent {
    /// Execution was handed to the processor
    TaskQueued { task_id: TaskId, task_name: String },
    /// The first step is about to run
    TaskStarted { task_id: TaskId, task_name: String },
    /// A step completed and its partial was handed to the assembler
    StepCompleted {
        task_id: TaskId,
        step: usize,
        has_partial: bool,
    },
    /// Every step completed and the result was assembled
    TaskCompleted {
        task_id: TaskId,
        task_name: String,
        steps: usize,
        duration: Duration,
    },
    /// A step failed
    TaskFailed {
        task_id: TaskId,
        task_name: String,
        error: String,
        duration: Duration,
    },
    /// The worker observed a cancellation
    TaskCancelled {
        task_id: TaskId,
        task_name: String,
        steps_completed: usize,
    },
}

impl TaskExecutionEvent {
    /// The execution the event belongs to
    pub fn task_id(&self) -> TaskId {
        match self {
            TaskExecutionEvent::TaskQueued { task_id, .. }
            | TaskExecutionEvent::TaskStarted { task_id, .. }
            | TaskExecutionEvent::StepCompleted { task_id, .. }
            | TaskExecutionEvent::TaskCompleted { task_id, .. }
            | TaskExecutionEvent::TaskFailed { task_id, .. }
            | TaskExecutionEvent::TaskCancelled { task_id, .. } => *task_id,
        }
    }

    /// Whether this event ends the execution
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskExecutionEvent::TaskCompleted { .. }
                | TaskExecutionEvent::TaskFailed { .. }
                | TaskExecutionEvent::TaskCancelled { .. }
        )
    }
}

/// Trait for reporting task execution progress
pub trait ExecutionReporter: Send {
    /// Report a task execution event
    fn report_event(&mut self, event: TaskExecutionEvent);

    /// Set context for subsequent events
    fn set_context(&mut self, context: String) {
        let _ = context;
    }

    /// Called when the reporter is no longer needed
    fn finish(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default)]
    struct TestReporter {
        events: Arc<Mutex<Vec<TaskExecutionEvent>>>,
    }

    impl ExecutionReporter for TestReporter {
        fn report_event(&mut self, event: TaskExecutionEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn started() -> TaskExecutionEvent {
        TaskExecutionEvent::TaskStarted {
            task_id: TaskId::new(),
            task_name: "fetch XY(z=0, t=0)".to_string(),
        }
    }

    #[test]
    fn test_default_context_and_finish_are_optional() {
        let mut reporter = TestReporter::default();
        let events = reporter.events.clone();
        reporter.set_context("prefetch".to_string());
        reporter.report_event(started());
        reporter.finish();
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_event_helpers() {
        let id = TaskId::new();
        let cancelled = TaskExecutionEvent::TaskCancelled {
            task_id: id,
            task_name: "fetch".to_string(),
            steps_completed: 0,
        };
        assert_eq!(cancelled.task_id(), id);
        assert!(cancelled.is_terminal());
        assert!(!started().is_terminal());
    }
}
