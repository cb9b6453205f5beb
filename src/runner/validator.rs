//! Post-action checks that decide whether a step really happened.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::Layout;
use crate::shell::{CommandResult, CommandRunner};
use crate::steps::{StepCatalog, StepId};
use crate::workspace::{secs, Workspace};

/// Verdict of a validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Passed,
    Failed(String),
}

/// Decides whether the workspace is in the state a completed step implies.
pub trait StepValidator: Send + Sync {
    fn validate(&self, id: StepId) -> Validation;
}

/// Checks the workspace with the configured build and status commands.
///
/// Order matters: the first failing check wins and later commands are not
/// run. A missing workspace fails before any command is spawned.
pub struct WorkspaceValidator {
    workspace: Workspace,
    catalog: Arc<StepCatalog>,
    runner: Arc<dyn CommandRunner>,
    layout: Layout,
    early_steps: u32,
}

impl WorkspaceValidator {
    pub fn new(
        workspace: Workspace,
        catalog: Arc<StepCatalog>,
        runner: Arc<dyn CommandRunner>,
        layout: Layout,
        early_steps: u32,
    ) -> Self {
        Self {
            workspace,
            catalog,
            runner,
            layout,
            early_steps,
        }
    }

    fn check(&self, id: StepId) -> Result<(), String> {
        let dir = self.workspace.dir();
        if !dir.is_dir() {
            return Err(format!("Workspace {} does not exist", dir.display()));
        }

        if let Some(entry) = self.catalog.entry(id) {
            for expected in &entry.expect {
                if !dir.join(expected).exists() {
                    return Err(format!("Expected {} is missing", expected.display()));
                }
            }
        }

        let status_timeout = secs(self.workspace.timeouts().status);

        if self.layout.ordinal(id) < self.early_steps {
            let vcs = self.workspace.vcs_dir();
            if !vcs.exists() {
                return Err(format!(
                    "Version control not initialized ({} missing)",
                    vcs.display()
                ));
            }
            self.run_check("Version control", &self.workspace.commands().vcs_status, status_timeout)?;
        }

        if let Some(descriptor) = self.workspace.build_descriptor() {
            match &self.workspace.commands().build {
                Some(build) => {
                    let timeout = secs(self.workspace.timeouts().build);
                    self.run_check("Build", build, timeout)?;
                }
                None => debug!(
                    "{} present but no build command configured",
                    descriptor.display()
                ),
            }
        }

        self.run_check("Version control health", &self.workspace.commands().vcs_status, status_timeout)
    }

    fn run_check(&self, what: &str, template: &str, timeout: Duration) -> Result<(), String> {
        let command = self
            .workspace
            .render(template, None)
            .map_err(|e| format!("{} check: {}", what, e))?;
        let result = self.runner.run(&command, timeout, self.workspace.dir());
        if result.success {
            return Ok(());
        }
        log_failure(&command, &result);
        Err(format!("{} check failed: {}", what, summarize(&result)))
    }
}

impl StepValidator for WorkspaceValidator {
    fn validate(&self, id: StepId) -> Validation {
        match self.check(id) {
            Ok(()) => {
                info!("Validation passed for {}", id);
                Validation::Passed
            }
            Err(reason) => {
                error!("Validation failed for {}: {}", id, reason);
                Validation::Failed(reason)
            }
        }
    }
}

fn log_failure(command: &str, result: &CommandResult) {
    error!("Command: {}", command);
    if !result.stdout.trim().is_empty() {
        error!("Stdout: {}", result.stdout.trim());
    }
    if !result.stderr.trim().is_empty() {
        error!("Stderr: {}", result.stderr.trim());
    }
}

fn summarize(result: &CommandResult) -> String {
    let stderr = result.stderr.trim();
    if !stderr.is_empty() {
        return stderr.lines().last().unwrap_or(stderr).to_string();
    }
    match result.exit_code {
        Some(code) => format!("exit code {}", code),
        None => "terminated".to_string(),
    }
}
