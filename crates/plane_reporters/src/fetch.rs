use std::{collections::HashMap, time::Duration};

use indexmap::IndexMap;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use plane_tasks::{ExecutionReporter, TaskExecutionEvent, TaskId};
use tracing::warn;

/// A reporter that renders a spinner per running plane fetch.
pub struct FetchProgress {
    /// The multi-progress bar. Usually, this is the global multi-progress bar.
    multi_progress: MultiProgress,
    /// The progress bar that is used as an anchor for placing other progress.
    anchor: ProgressBar,
    /// Spinners of running executions, in start order.
    bars: IndexMap<TaskId, ProgressBar>,
    /// Names of queued and running executions
    names: HashMap<TaskId, String>,
    /// Prefix shown in front of every spinner
    prefix: String,
    completed: usize,
    failed: usize,
}

impl FetchProgress {
    /// Creates a new fetch reporter.
    pub fn new(multi_progress: MultiProgress, anchor: ProgressBar) -> Self {
        Self {
            multi_progress,
            anchor,
            bars: Default::default(),
            names: Default::default(),
            prefix: String::from("fetching planes"),
            completed: 0,
            failed: 0,
        }
    }

    /// A spinner followed by a fixed-width prefix and the plane being fetched.
    pub fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("  {spinner:.green} {prefix:30!} {wide_msg:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Returns the progress bar at the bottom
    pub fn last_progress_bar(&self) -> Option<&ProgressBar> {
        self.bars.last().map(|(_, pb)| pb)
    }

    /// Number of spinners currently shown
    pub fn active(&self) -> usize {
        self.bars.len()
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    fn name(&self, task_id: TaskId, fallback: &str) -> String {
        self.names
            .get(&task_id)
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }

    fn on_start(&mut self, task_id: TaskId, task_name: &str) {
        let pb = self.multi_progress.insert_after(
            self.last_progress_bar().unwrap_or(&self.anchor),
            ProgressBar::hidden(),
        );
        pb.set_style(FetchProgress::spinner_style());
        pb.set_prefix(self.prefix.clone());
        pb.set_message(task_name.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        self.bars.insert(task_id, pb);
    }

    fn on_finished(&mut self, task_id: TaskId) {
        self.names.remove(&task_id);
        if let Some(pb) = self.bars.shift_remove(&task_id) {
            pb.finish_and_clear();
        }
    }
}

impl ExecutionReporter for FetchProgress {
    fn report_event(&mut self, event: TaskExecutionEvent) {
        match event {
            TaskExecutionEvent::TaskQueued { task_id, task_name } => {
                self.names.insert(task_id, task_name);
            }
            TaskExecutionEvent::TaskStarted { task_id, task_name } => {
                self.on_start(task_id, &task_name);
            }
            TaskExecutionEvent::StepCompleted { task_id, step, .. } => {
                let name = self.name(task_id, "fetch");
                if let Some(pb) = self.bars.get(&task_id) {
                    pb.set_message(format!("{} (step {})", name, step));
                }
            }
            TaskExecutionEvent::TaskCompleted { task_id, .. } => {
                self.completed += 1;
                self.on_finished(task_id);
            }
            TaskExecutionEvent::TaskFailed {
                task_id,
                task_name,
                error,
                ..
            } => {
                self.failed += 1;
                self.on_finished(task_id);
                let line = format!("  ✗ {} failed: {}", task_name, error);
                if let Err(err) = self.multi_progress.println(&line) {
                    warn!(error = %err, "Could not print fetch failure");
                }
            }
            TaskExecutionEvent::TaskCancelled { task_id, .. } => {
                self.on_finished(task_id);
            }
        }
    }

    fn set_context(&mut self, context: String) {
        self.prefix = context;
    }

    fn finish(&mut self) {
        for (_, pb) in self.bars.drain(..) {
            pb.finish_and_clear();
        }
        self.names.clear();
    }
}
