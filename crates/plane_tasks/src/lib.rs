//! Plane Tasks - step-driven command execution
//!
//! Commands issued by the image viewer are decomposed into tasks that are
//! driven one step at a time, either on the calling thread or on a worker,
//! while their partial results are assembled into one final value.
//!
//! # Overview
//!
//! - A [`Task`] is a closed set of variants: a single action ([`LeafTask`]),
//!   an externally stepped computation ([`MultiStepTask`]) or an ordered group
//!   of children ([`CompositeTask`])
//! - A [`ResultAssembler`] receives every step's partial result in order
//! - The [`CommandProcessor`] drives a task and returns an [`ExecutionHandle`]
//!   that can be polled, awaited or cancelled at step boundaries
//!
//! # Example
//!
//! ```rust
//! use plane_tasks::{CommandProcessor, CompositeTask, ListAssembler, Task};
//!
//! let mut composite = CompositeTask::new("rows");
//! composite.add(Task::leaf("row 0", || Ok::<_, String>(Some(vec![0u8; 4])))).unwrap();
//! composite.add(Task::leaf("row 1", || Ok(Some(vec![1u8; 4])))).unwrap();
//!
//! let processor = CommandProcessor::new();
//! let handle = processor.execute(Task::Composite(composite), ListAssembler::new());
//!
//! let rows = handle.result().unwrap().into_result().unwrap();
//! assert_eq!(rows.len(), 2);
//! ```

pub mod assembler;
pub mod error;
pub mod processor;
pub mod reporter;
pub mod task;
pub mod types;

pub use assembler::{FnAssembler, LastValueAssembler, ListAssembler, ResultAssembler};
pub use error::{ConfigError, ConfigResult, StepResult, TaskError};
pub use processor::{CommandProcessor, ExecutionHandle, ExecutionState};
pub use reporter::{ExecutionReporter, TaskExecutionEvent};
pub use task::{CompositeState, CompositeTask, LeafTask, MultiStepTask, Task, TaskId, TaskResult};
pub use types::{ExecutionMode, ProcessorConfig, ProcessorStats};
