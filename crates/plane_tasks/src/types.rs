//! Common types and configuration for the command processor

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Where a command is driven
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// On the calling thread; `execute` returns an already finished handle
    #[default]
    Synchronous,
    /// On the runtime's blocking pool; `execute` returns immediately
    Asynchronous,
}

/// Configuration for the command processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// How commands are driven
    pub mode: ExecutionMode,

    /// Forward execution events to the configured reporter
    pub enable_progress_reporting: bool,

    /// Also report every completed step, not only lifecycle events
    pub report_steps: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Synchronous,
            enable_progress_reporting: true,
            report_steps: false,
        }
    }
}

impl ProcessorConfig {
    /// Create a new processor configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution mode
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Enable or disable progress reporting
    pub fn with_progress_reporting(mut self, enabled: bool) -> Self {
        self.enable_progress_reporting = enabled;
        self
    }

    /// Enable or disable per-step events
    pub fn with_step_reporting(mut self, enabled: bool) -> Self {
        self.report_steps = enabled;
        self
    }

    /// Reject combinations the processor cannot honour
    pub fn validate(&self) -> ConfigResult<()> {
        if self.report_steps && !self.enable_progress_reporting {
            return Err(ConfigError::unsupported_feature(
                "step reporting requires progress reporting",
            ));
        }
        Ok(())
    }

    /// Create a configuration optimized for testing
    pub fn for_testing() -> Self {
        Self {
            mode: ExecutionMode::Synchronous,
            enable_progress_reporting: false,
            report_steps: false,
        }
    }

    /// Configuration used by the viewer: background fetches, lifecycle events only
    pub fn for_viewer() -> Self {
        Self {
            mode: ExecutionMode::Asynchronous,
            enable_progress_reporting: true,
            report_steps: false,
        }
    }
}

/// Execution counters of a processor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorStats {
    /// Executions handed to the processor
    pub started: u64,
    /// Executions whose assembler produced a result
    pub succeeded: u64,
    /// Executions aborted by a failing step
    pub failed: u64,
    /// Executions that observed a cancellation
    pub cancelled: u64,
}

impl ProcessorStats {
    /// Executions that reached a terminal outcome
    pub fn finished(&self) -> u64 {
        self.succeeded + self.failed + self.cancelled
    }
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    started: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_started(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ProcessorStats {
        ProcessorStats {
            started: self.started.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}
