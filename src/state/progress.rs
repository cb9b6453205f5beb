//! In-memory execution position.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Layout;
use crate::steps::StepId;

/// Whether the orchestrator is still driving steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Stopped,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Position and statistics of a run.
///
/// `completed` always equals the number of steps before `current`; the
/// controller is the only writer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionProgress {
    pub current: StepId,
    pub completed: u32,
    pub total: u32,
    pub status: ExecutionStatus,
    pub last_updated: DateTime<Utc>,
}

impl ExecutionProgress {
    /// A run that has not started.
    pub fn fresh(layout: &Layout) -> Self {
        Self {
            current: StepId::first(),
            completed: 0,
            total: layout.total(),
            status: ExecutionStatus::Running,
            last_updated: Utc::now(),
        }
    }

    /// Record the completion of `current` and move the cursor on.
    pub fn advance(&mut self, layout: &Layout) {
        self.completed += 1;
        self.current = layout.next(self.current);
        self.last_updated = Utc::now();
    }

    /// Whether every step has completed.
    pub fn is_finished(&self, layout: &Layout) -> bool {
        self.current == layout.end()
    }

    /// Completion percentage; informational only.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.completed) / f64::from(self.total) * 100.0
    }

    /// Check the restored position against the layout it will drive.
    pub fn check(&self, layout: &Layout) -> Result<(), String> {
        if self.total != layout.total() {
            return Err(format!(
                "total steps {} does not match layout total {}",
                self.total,
                layout.total()
            ));
        }
        if !layout.is_position(self.current) {
            return Err(format!("{} is outside the layout", self.current));
        }
        let expected = layout.ordinal(self.current);
        if self.completed != expected {
            return Err(format!(
                "{} completed steps recorded but {} precede {}",
                self.completed, expected, self.current
            ));
        }
        Ok(())
    }
}
