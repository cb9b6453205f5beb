//! Step action providers.
//!
//! A provider performs the work of one step. The orchestrator treats it as
//! opaque: it only sees the returned [`StepOutcome`].

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::config::StepEntry;
use crate::error::Result;
use crate::shell::CommandRunner;
use crate::workspace::{secs, Workspace};

use super::catalog::{StepCatalog, StepDescriptions};
use super::StepId;

/// Result of one attempt at a step's action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub succeeded: bool,
    pub message: String,
    /// Changed resource identifiers, in the order they changed.
    pub changed: Vec<String>,
}

impl StepOutcome {
    pub fn success(message: impl Into<String>, changed: Vec<String>) -> Self {
        Self {
            succeeded: true,
            message: message.into(),
            changed,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            message: message.into(),
            changed: Vec::new(),
        }
    }
}

/// Performs the work for a step.
///
/// Returning `Err` is treated exactly like a failed outcome.
pub trait StepAction: Send + Sync {
    fn perform(&self, id: StepId) -> Result<StepOutcome>;
}

/// Stand-in for steps that have no real action: waits, then succeeds.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAction {
    delay: Duration,
}

impl SimulatedAction {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl StepAction for SimulatedAction {
    fn perform(&self, id: StepId) -> Result<StepOutcome> {
        info!("Executing {} (simulated)", id);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(StepOutcome::success(
            format!("{} completed (simulated)", id),
            Vec::new(),
        ))
    }
}

/// Runs the commands and writes the files a catalog entry declares.
///
/// Steps without a script are delegated to the simulated action.
pub struct ScriptedAction {
    workspace: Workspace,
    catalog: Arc<StepCatalog>,
    runner: Arc<dyn CommandRunner>,
    unscripted: SimulatedAction,
}

impl ScriptedAction {
    pub fn new(
        workspace: Workspace,
        catalog: Arc<StepCatalog>,
        runner: Arc<dyn CommandRunner>,
        unscripted: SimulatedAction,
    ) -> Self {
        Self {
            workspace,
            catalog,
            runner,
            unscripted,
        }
    }

    fn run_script(&self, id: StepId, entry: &StepEntry) -> Result<StepOutcome> {
        info!("Executing {}: {}", id, self.catalog.describe(id));

        for script in &entry.run {
            let command = self.workspace.render(&script.command, Some(id))?;
            let cwd = if script.in_workspace {
                self.workspace.dir()
            } else {
                self.workspace.root()
            };
            let timeout = secs(script.timeout.unwrap_or(self.workspace.timeouts().action));

            let result = self.runner.run(&command, timeout, cwd);
            if result.success {
                continue;
            }

            let Some(fallback) = &script.fallback else {
                return Ok(StepOutcome::failure(format!(
                    "Command '{}' failed: {}",
                    command,
                    result.stderr.trim()
                )));
            };

            let fallback = self.workspace.render(fallback, Some(id))?;
            warn!("'{}' failed, trying fallback '{}'", command, fallback);
            let retry = self.runner.run(&fallback, timeout, cwd);
            if !retry.success {
                return Ok(StepOutcome::failure(format!(
                    "Command '{}' and fallback '{}' failed: {}",
                    command,
                    fallback,
                    retry.stderr.trim()
                )));
            }
        }

        let mut written = Vec::new();
        for file in &entry.files {
            let path = self.workspace.dir().join(&file.path);
            let write = path
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|_| fs::write(&path, &file.contents));
            if let Err(e) = write {
                return Ok(StepOutcome::failure(format!(
                    "Failed to write {}: {}",
                    path.display(),
                    e
                )));
            }
            written.push(file.path.clone());
        }

        let changed = if entry.changed.is_empty() {
            written
        } else {
            entry.changed.clone()
        };

        Ok(StepOutcome::success(
            format!("{} completed", self.catalog.describe(id)),
            changed,
        ))
    }
}

impl StepAction for ScriptedAction {
    fn perform(&self, id: StepId) -> Result<StepOutcome> {
        match self.catalog.entry(id).filter(|e| e.is_scripted()) {
            Some(entry) => self.run_script(id, entry),
            None => self.unscripted.perform(id),
        }
    }
}
