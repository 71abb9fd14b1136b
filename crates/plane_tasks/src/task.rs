//! Core task abstractions
//!
//! A [`Task`] is driven from the outside: the processor calls
//! [`Task::do_step`] until [`Task::is_done`] reports completion, feeding every
//! step's partial result to a [`ResultAssembler`](crate::ResultAssembler).

use std::collections::VecDeque;
use std::fmt::{Debug, Display};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{StepResult, TaskError};

/// Unique identifier for a task execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new unique task ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Final outcome of driving a task
#[derive(Debug, Clone)]
pub enum TaskResult<T, E> {
    /// Every step completed and the assembler produced a value
    Success(T),
    /// A step failed; the assembler was bypassed
    Error(TaskError<E>),
    /// Execution was cancelled; the assembler was bypassed
    Cancelled,
}

impl<T, E> TaskResult<T, E> {
    /// Convert to a standard Result, treating cancellation as an error
    pub fn into_result(self) -> Result<T, TaskError<E>> {
        match self {
            TaskResult::Success(output) => Ok(output),
            TaskResult::Error(err) => Err(err),
            TaskResult::Cancelled => Err(TaskError::Cancelled),
        }
    }

    /// Check if the result is successful
    pub fn is_success(&self) -> bool {
        matches!(self, TaskResult::Success(_))
    }

    /// Check if the result is an error
    pub fn is_error(&self) -> bool {
        matches!(self, TaskResult::Error(_))
    }

    /// Check if the result is cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskResult::Cancelled)
    }

    /// Borrow the successful output, if any.
    pub fn output(&self) -> Option<&T> {
        match self {
            TaskResult::Success(output) => Some(output),
            _ => None,
        }
    }
}

/// A computation decomposed into an externally driven sequence of steps.
///
/// Implementors decide what a step is. The processor never calls
/// [`do_step`](Self::do_step) once [`is_done`](Self::is_done) returns `true`.
pub trait MultiStepTask<P, E>: Send {
    /// Returns `true` once there is no more work to do.
    fn is_done(&self) -> bool;

    /// Performs one unit of work, optionally producing a partial result.
    fn do_step(&mut self) -> Result<Option<P>, E>;

    /// Get a human-readable name for this task (used for logging and reporting)
    fn name(&self) -> String {
        "multi-step".to_string()
    }
}

type Action<P, E> = Box<dyn FnOnce() -> Result<Option<P>, E> + Send>;

/// A plain action run as a single step.
///
/// The first `do_step` runs the action; afterwards the task is done and any
/// further `do_step` is a no-op that yields nothing.
pub struct LeafTask<P, E> {
    name: String,
    action: Option<Action<P, E>>,
}

impl<P, E> LeafTask<P, E> {
    pub fn new<S, F>(name: S, action: F) -> Self
    where
        S: Into<String>,
        F: FnOnce() -> Result<Option<P>, E> + Send + 'static,
    {
        Self {
            name: name.into(),
            action: Some(Box::new(action)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_done(&self) -> bool {
        self.action.is_none()
    }

    pub fn do_step(&mut self) -> StepResult<P, E> {
        match self.action.take() {
            Some(action) => action().map_err(TaskError::Execution),
            None => Ok(None),
        }
    }
}

/// Lifecycle of a [`CompositeTask`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompositeState {
    /// Children may still be appended and stepped
    Adding,
    /// Terminal; `add` and `do_step` fail
    Done,
}

/// An ordered group of child tasks, executed one at a time in FIFO order.
pub struct CompositeTask<P, E> {
    name: String,
    children: VecDeque<Task<P, E>>,
    state: CompositeState,
}

impl<P, E> CompositeTask<P, E> {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            children: VecDeque::new(),
            state: CompositeState::Adding,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CompositeState {
        self.state
    }

    /// Number of children that have not finished yet.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Append a child task.
    pub fn add(&mut self, child: Task<P, E>) -> Result<(), TaskError<E>> {
        if self.state == CompositeState::Done {
            return Err(TaskError::illegal_state(format!(
                "cannot add `{}` to finished composite `{}`",
                child.name(),
                self.name
            )));
        }
        self.children.push_back(child);
        Ok(())
    }

    /// Reports completion.
    ///
    /// A composite that never received a child becomes `Done` the first time
    /// it is queried, not at construction. Children with nothing left to do
    /// are dropped first, so a composite holding only such children is done
    /// as well.
    pub fn is_done(&mut self) -> bool {
        if self.state == CompositeState::Adding {
            self.skip_finished();
        }
        match self.state {
            CompositeState::Done => true,
            CompositeState::Adding if self.children.is_empty() => {
                self.state = CompositeState::Done;
                true
            }
            CompositeState::Adding => false,
        }
    }

    /// Executes one unit of work of the current child.
    pub fn do_step(&mut self) -> StepResult<P, E> {
        if self.state == CompositeState::Done {
            return Err(TaskError::illegal_state(format!(
                "cannot step finished composite `{}`",
                self.name
            )));
        }

        self.skip_finished();
        let Some(current) = self.children.front_mut() else {
            self.state = CompositeState::Done;
            return Ok(None);
        };

        let partial = current.do_step()?;
        if current.is_done() {
            self.children.pop_front();
            self.skip_finished();
            if self.children.is_empty() {
                tracing::debug!(composite = %self.name, "Composite task finished");
                self.state = CompositeState::Done;
            }
        }
        Ok(partial)
    }

    /// Drops leading children that have nothing left to do.
    fn skip_finished(&mut self) {
        while let Some(front) = self.children.front_mut() {
            if !front.is_done() {
                break;
            }
            self.children.pop_front();
        }
    }
}

/// A unit of work exposing the step contract.
pub enum Task<P, E> {
    Leaf(LeafTask<P, E>),
    MultiStep(Box<dyn MultiStepTask<P, E>>),
    Composite(CompositeTask<P, E>),
}

impl<P, E> Task<P, E> {
    /// Wrap a single action
    pub fn leaf<S, F>(name: S, action: F) -> Self
    where
        S: Into<String>,
        F: FnOnce() -> Result<Option<P>, E> + Send + 'static,
    {
        Task::Leaf(LeafTask::new(name, action))
    }

    /// Wrap a multi-step computation
    pub fn multi_step<M>(task: M) -> Self
    where
        M: MultiStepTask<P, E> + 'static,
    {
        Task::MultiStep(Box::new(task))
    }

    /// Create an empty composite
    pub fn composite<S: Into<String>>(name: S) -> Self {
        Task::Composite(CompositeTask::new(name))
    }

    pub fn name(&self) -> String {
        match self {
            Task::Leaf(leaf) => leaf.name().to_string(),
            Task::MultiStep(task) => task.name(),
            Task::Composite(composite) => composite.name().to_string(),
        }
    }

    pub fn is_done(&mut self) -> bool {
        match self {
            Task::Leaf(leaf) => leaf.is_done(),
            Task::MultiStep(task) => task.is_done(),
            Task::Composite(composite) => composite.is_done(),
        }
    }

    pub fn do_step(&mut self) -> StepResult<P, E> {
        match self {
            Task::Leaf(leaf) => leaf.do_step(),
            Task::MultiStep(task) => task.do_step().map_err(TaskError::Execution),
            Task::Composite(composite) => composite.do_step(),
        }
    }
}

impl<P, E> Debug for Task<P, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Leaf(leaf) => f.debug_tuple("Leaf").field(&leaf.name).finish(),
            Task::MultiStep(task) => f.debug_tuple("MultiStep").field(&task.name()).finish(),
            Task::Composite(composite) => f
                .debug_struct("Composite")
                .field("name", &composite.name)
                .field("state", &composite.state)
                .field("children", &composite.children)
                .finish(),
        }
    }
}

impl<P, E> From<LeafTask<P, E>> for Task<P, E> {
    fn from(leaf: LeafTask<P, E>) -> Self {
        Task::Leaf(leaf)
    }
}

impl<P, E> From<CompositeTask<P, E>> for Task<P, E> {
    fn from(composite: CompositeTask<P, E>) -> Self {
        Task::Composite(composite)
    }
}
