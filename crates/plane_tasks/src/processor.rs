//! Command processor driving tasks to completion
//!
//! [`CommandProcessor::execute`] repeatedly steps a [`Task`], hands each
//! partial result to a [`ResultAssembler`] and publishes the outcome through an
//! [`ExecutionHandle`]. Cancellation is cooperative: it takes effect at the
//! next step boundary and never interrupts a running step.

use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::assembler::ResultAssembler;
use crate::error::{ConfigError, ConfigResult, TaskError};
use crate::reporter::{ExecutionReporter, TaskExecutionEvent};
use crate::task::{Task, TaskId, TaskResult};
use crate::types::{ExecutionMode, ProcessorConfig, ProcessorStats, StatsCounters};

/// Observable state of one execution
#[derive(Debug, Clone)]
pub enum ExecutionState<T, E> {
    /// Handed to the processor, no step has run yet
    Queued,
    /// Stepping
    Running { steps_completed: usize },
    /// Terminal
    Finished(TaskResult<T, E>),
}

impl<T, E> ExecutionState<T, E> {
    pub fn is_finished(&self) -> bool {
        matches!(self, ExecutionState::Finished(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionState::Finished(TaskResult::Cancelled))
    }
}

/// Cancellable, queryable reference to an execution.
///
/// Handles are cheap to clone; every clone observes the same execution.
pub struct ExecutionHandle<T, E> {
    id: TaskId,
    name: Arc<str>,
    state: Arc<watch::Sender<ExecutionState<T, E>>>,
}

impl<T, E> ExecutionHandle<T, E> {
    fn new(name: &str) -> Self {
        let (state, _) = watch::channel(ExecutionState::Queued);
        Self {
            id: TaskId::new(),
            name: Arc::from(name),
            state: Arc::new(state),
        }
    }

    /// A handle that is already resolved with `value`.
    pub fn resolved<S: AsRef<str>>(name: S, value: T) -> Self {
        let handle = Self::new(name.as_ref());
        handle.finish(TaskResult::Success(value));
        handle
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Request cancellation.
    ///
    /// Returns `true` if this call cancelled a live execution. Cancelling a
    /// finished or already cancelled execution is a no-op returning `false`.
    pub fn cancel(&self) -> bool {
        let cancelled = self.state.send_if_modified(|state| {
            if state.is_finished() {
                return false;
            }
            *state = ExecutionState::Finished(TaskResult::Cancelled);
            true
        });
        if cancelled {
            info!(task = %self.name, id = %self.id, "Execution cancelled");
        }
        cancelled
    }

    /// Returns `true` once the execution succeeded, failed or was cancelled.
    pub fn is_done(&self) -> bool {
        self.state.borrow().is_finished()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().is_cancelled()
    }

    /// Moves a queued execution to running. Fails if it was cancelled first.
    fn begin(&self) -> bool {
        self.state.send_if_modified(|state| match state {
            ExecutionState::Queued => {
                *state = ExecutionState::Running { steps_completed: 0 };
                true
            }
            _ => false,
        })
    }

    fn advance(&self, steps_completed: usize) {
        self.state.send_if_modified(|state| match state {
            ExecutionState::Running { .. } => {
                *state = ExecutionState::Running { steps_completed };
                true
            }
            _ => false,
        });
    }

    fn finish(&self, result: TaskResult<T, E>) -> bool {
        self.finish_with(move || result)
    }

    /// Publishes the result produced by `make` unless the execution already
    /// finished. `make` runs under the state lock, so a concurrent `cancel`
    /// either wins before it runs or observes the published result.
    fn finish_with<F>(&self, make: F) -> bool
    where
        F: FnOnce() -> TaskResult<T, E>,
    {
        self.state.send_if_modified(move |state| {
            if state.is_finished() {
                return false;
            }
            *state = ExecutionState::Finished(make());
            true
        })
    }
}

impl<T: Clone, E: Clone> ExecutionHandle<T, E> {
    /// Snapshot of the current state
    pub fn state(&self) -> ExecutionState<T, E> {
        self.state.borrow().clone()
    }

    /// The final result, if the execution finished
    pub fn result(&self) -> Option<TaskResult<T, E>> {
        match &*self.state.borrow() {
            ExecutionState::Finished(result) => Some(result.clone()),
            _ => None,
        }
    }

    /// Wait until the execution finishes.
    pub async fn wait(&self) -> TaskResult<T, E> {
        let mut receiver = self.state.subscribe();
        let finished = receiver.wait_for(ExecutionState::is_finished).await;
        match finished.as_deref() {
            Ok(ExecutionState::Finished(result)) => result.clone(),
            // The sender lives as long as `self`, so waiting cannot fail.
            _ => TaskResult::Cancelled,
        }
    }

    /// Block the current thread until the execution finishes.
    ///
    /// Must not be called from within an async context.
    pub fn blocking_wait(&self) -> TaskResult<T, E> {
        futures::executor::block_on(self.wait())
    }
}

impl<T, E> Clone for ExecutionHandle<T, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T, E> PartialEq for ExecutionHandle<T, E> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T, E> Eq for ExecutionHandle<T, E> {}

impl<T, E> Debug for ExecutionHandle<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("done", &self.is_done())
            .finish()
    }
}

type SharedReporter = Arc<Mutex<Box<dyn ExecutionReporter>>>;
type Canceller = Box<dyn Fn() -> bool + Send + Sync>;

/// Per-execution context handed to the thread driving the task
struct Execution {
    id: TaskId,
    name: Arc<str>,
    report_steps: bool,
    reporter: Option<SharedReporter>,
    stats: Arc<StatsCounters>,
}

impl Execution {
    fn report(&self, event: TaskExecutionEvent) {
        if let Some(reporter) = &self.reporter {
            reporter
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .report_event(event);
        }
    }

    fn cancelled<T, E>(&self, steps_completed: usize) -> TaskResult<T, E> {
        info!(task = %self.name, steps_completed, "Execution stopped at step boundary");
        self.stats.record_cancelled();
        self.report(TaskExecutionEvent::TaskCancelled {
            task_id: self.id,
            task_name: self.name.to_string(),
            steps_completed,
        });
        TaskResult::Cancelled
    }

    /// Publishes a panic that escaped a step as a failure.
    fn panicked<T, E>(
        &self,
        handle: &ExecutionHandle<T, E>,
        message: &str,
        duration: Duration,
    ) -> TaskResult<T, E>
    where
        T: Clone,
        E: Clone,
    {
        let steps = match handle.state() {
            ExecutionState::Running { steps_completed } => steps_completed,
            _ => 0,
        };
        let reason = format!("step panicked: {}", message);
        let error = TaskError::illegal_state(reason.clone());
        if !handle.finish(TaskResult::Error(error.clone())) {
            return self.cancelled(steps);
        }
        warn!(task = %self.name, steps, panic = message, "Execution panicked");
        self.stats.record_failed();
        self.report(TaskExecutionEvent::TaskFailed {
            task_id: self.id,
            task_name: self.name.to_string(),
            error: reason,
            duration,
        });
        TaskResult::Error(error)
    }
}

/// Drives tasks to completion and hands out handles to their outcome
#[derive(Clone)]
pub struct CommandProcessor {
    config: ProcessorConfig,
    runtime: Option<Handle>,
    reporter: Option<SharedReporter>,
    stats: Arc<StatsCounters>,
    active: Arc<DashMap<TaskId, Canceller>>,
}

impl Default for CommandProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandProcessor {
    /// Create a synchronous processor with default configuration
    pub fn new() -> Self {
        Self::build(ProcessorConfig::default(), None)
    }

    /// Create a processor that runs commands on the blocking pool of `runtime`
    pub fn asynchronous(runtime: Handle) -> Self {
        Self::build(
            ProcessorConfig::default().with_mode(ExecutionMode::Asynchronous),
            Some(runtime),
        )
    }

    /// Create a processor with custom configuration.
    ///
    /// Asynchronous mode uses `runtime`, or the runtime of the calling thread
    /// when none is given. The configuration is validated first.
    pub fn with_config(config: ProcessorConfig, runtime: Option<Handle>) -> ConfigResult<Self> {
        config.validate()?;
        let runtime = runtime.or_else(|| Handle::try_current().ok());
        if config.mode == ExecutionMode::Asynchronous && runtime.is_none() {
            return Err(ConfigError::MissingRuntime);
        }
        Ok(Self::build(config, runtime))
    }

    fn build(config: ProcessorConfig, runtime: Option<Handle>) -> Self {
        Self {
            config,
            runtime,
            reporter: None,
            stats: Arc::new(StatsCounters::default()),
            active: Arc::new(DashMap::new()),
        }
    }

    /// Forward execution events to `reporter`
    pub fn with_reporter<R: ExecutionReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporter = Some(Arc::new(Mutex::new(Box::new(reporter))));
        self
    }

    /// Get the current configuration
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Execution counters since the processor was created
    pub fn stats(&self) -> ProcessorStats {
        self.stats.snapshot()
    }

    /// Number of asynchronous executions that have not returned yet
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Cancel every in-flight asynchronous execution.
    ///
    /// Returns how many executions this call cancelled.
    pub fn cancel_all(&self) -> usize {
        self.active.iter().filter(|entry| (entry.value())()).count()
    }

    /// Drive `task` to completion, assembling its partial results.
    pub fn execute<P, E, A>(&self, task: Task<P, E>, assembler: A) -> ExecutionHandle<A::Output, E>
    where
        P: Send + 'static,
        E: Clone + Debug + Send + Sync + 'static,
        A: ResultAssembler<P> + 'static,
        A::Output: Clone + Send + Sync + 'static,
    {
        self.execute_then(task, assembler, |_, _| {})
    }

    /// Like [`execute`](Self::execute), invoking `on_finished` exactly once with
    /// the handle and its final result, from the thread that drove the task.
    ///
    /// In synchronous mode the callback runs before this method returns.
    pub fn execute_then<P, E, A, F>(
        &self,
        task: Task<P, E>,
        assembler: A,
        on_finished: F,
    ) -> ExecutionHandle<A::Output, E>
    where
        P: Send + 'static,
        E: Clone + Debug + Send + Sync + 'static,
        A: ResultAssembler<P> + 'static,
        A::Output: Clone + Send + Sync + 'static,
        F: FnOnce(&ExecutionHandle<A::Output, E>, &TaskResult<A::Output, E>) + Send + 'static,
    {
        let handle = ExecutionHandle::new(&task.name());
        let execution = Execution {
            id: handle.id(),
            name: handle.name.clone(),
            report_steps: self.config.report_steps,
            reporter: self
                .reporter
                .clone()
                .filter(|_| self.config.enable_progress_reporting),
            stats: self.stats.clone(),
        };

        self.stats.record_started();
        execution.report(TaskExecutionEvent::TaskQueued {
            task_id: handle.id(),
            task_name: handle.name().to_string(),
        });
        debug!(
            task = %handle.name(),
            id = %handle.id(),
            mode = ?self.config.mode,
            "Execution queued"
        );

        match (&self.runtime, self.config.mode) {
            (Some(runtime), ExecutionMode::Asynchronous) => {
                let canceller = handle.clone();
                self.active
                    .insert(handle.id(), Box::new(move || canceller.cancel()));

                let active = self.active.clone();
                let worker = handle.clone();
                runtime.spawn_blocking(move || {
                    let outcome = drive_guarded(task, assembler, &worker, &execution);
                    active.remove(&worker.id());
                    on_finished(&worker, &outcome);
                });
            }
            _ => {
                let outcome = drive_guarded(task, assembler, &handle, &execution);
                on_finished(&handle, &outcome);
            }
        }

        handle
    }
}

impl Debug for CommandProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandProcessor")
            .field("config", &self.config)
            .field("has_runtime", &self.runtime.is_some())
            .field("has_reporter", &self.reporter.is_some())
            .field("active", &self.active.len())
            .finish()
    }
}

/// [`drive`], turning a panicking step into a failed execution so the handle
/// always finishes and the completion callback still runs.
fn drive_guarded<P, E, A>(
    task: Task<P, E>,
    assembler: A,
    handle: &ExecutionHandle<A::Output, E>,
    execution: &Execution,
) -> TaskResult<A::Output, E>
where
    E: Clone + Debug,
    A: ResultAssembler<P>,
    A::Output: Clone,
{
    let started_at = Instant::now();
    match panic::catch_unwind(AssertUnwindSafe(|| drive(task, assembler, handle, execution))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            execution.panicked(handle, panic_message(&*payload), started_at.elapsed())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Steps `task` until it is done, then assembles and publishes the result.
fn drive<P, E, A>(
    mut task: Task<P, E>,
    mut assembler: A,
    handle: &ExecutionHandle<A::Output, E>,
    execution: &Execution,
) -> TaskResult<A::Output, E>
where
    E: Clone + Debug,
    A: ResultAssembler<P>,
    A::Output: Clone,
{
    let started_at = Instant::now();
    if !handle.begin() {
        return execution.cancelled(0);
    }
    execution.report(TaskExecutionEvent::TaskStarted {
        task_id: execution.id,
        task_name: execution.name.to_string(),
    });

    let mut steps = 0;
    loop {
        // Only a cancellation can finish the handle while we are stepping.
        if handle.is_done() {
            return execution.cancelled(steps);
        }
        if task.is_done() {
            break;
        }

        match task.do_step() {
            Ok(partial) => {
                if handle.is_done() {
                    return execution.cancelled(steps);
                }
                let has_partial = partial.is_some();
                assembler.add(partial);
                steps += 1;
                handle.advance(steps);

                debug!(task = %execution.name, step = steps, has_partial, "Step completed");
                if execution.report_steps {
                    execution.report(TaskExecutionEvent::StepCompleted {
                        task_id: execution.id,
                        step: steps,
                        has_partial,
                    });
                }
            }
            Err(err) => {
                if !handle.finish(TaskResult::Error(err.clone())) {
                    return execution.cancelled(steps);
                }
                warn!(task = %execution.name, error = ?err, steps, "Execution failed");
                execution.stats.record_failed();
                execution.report(TaskExecutionEvent::TaskFailed {
                    task_id: execution.id,
                    task_name: execution.name.to_string(),
                    error: format!("{:?}", err),
                    duration: started_at.elapsed(),
                });
                return TaskResult::Error(err);
            }
        }
    }

    if !handle.finish_with(move || TaskResult::Success(assembler.assemble())) {
        return execution.cancelled(steps);
    }

    let duration = started_at.elapsed();
    debug!(task = %execution.name, steps, ?duration, "Execution completed");
    execution.stats.record_succeeded();
    execution.report(TaskExecutionEvent::TaskCompleted {
        task_id: execution.id,
        task_name: execution.name.to_string(),
        steps,
        duration,
    });
    handle.result().unwrap_or(TaskResult::Cancelled)
}
