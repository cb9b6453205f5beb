//! Best-effort cleanup between failed attempts.
//!
//! Recovery never fails a step by itself: every command here is allowed to
//! fail and is only logged.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::shell::CommandRunner;
use crate::steps::StepId;
use crate::workspace::{secs, Workspace};

/// Restores the workspace to a state from which a step can be re-attempted.
pub trait RecoveryPolicy: Send + Sync {
    /// Called after `attempt` (1-based) of `id` failed and before the next.
    fn recover(&self, id: StepId, attempt: u32);
}

/// Cache clearing, hard reset and clean build, driven by configured commands.
pub struct WorkspaceRecovery {
    workspace: Workspace,
    runner: Arc<dyn CommandRunner>,
}

impl WorkspaceRecovery {
    pub fn new(workspace: Workspace, runner: Arc<dyn CommandRunner>) -> Self {
        Self { workspace, runner }
    }

    fn attempt(&self, what: &str, template: &str, timeout: Duration) {
        let command = match self.workspace.render(template, None) {
            Ok(command) => command,
            Err(e) => {
                warn!("Skipping {}: {}", what, e);
                return;
            }
        };
        let cwd = if self.workspace.dir().is_dir() {
            self.workspace.dir()
        } else {
            self.workspace.root()
        };
        let result = self.runner.run(&command, timeout, cwd);
        if result.success {
            debug!("{} completed", what);
        } else {
            warn!("{} failed: {}", what, result.stderr.trim());
        }
    }
}

impl RecoveryPolicy for WorkspaceRecovery {
    fn recover(&self, id: StepId, attempt: u32) {
        info!("Attempting recovery for {} (after attempt {})", id, attempt);
        let commands = self.workspace.commands();
        let timeouts = self.workspace.timeouts();

        match &commands.clear_caches {
            Some(clear) => self.attempt("Cache clearing", clear, secs(timeouts.caches)),
            None => debug!("No cache clearing command configured"),
        }

        if attempt > 1 && self.workspace.dir().is_dir() {
            self.attempt("Workspace reset", &commands.vcs_reset, secs(timeouts.reset));
        }

        if self.workspace.build_descriptor().is_some() {
            if let Some(clean) = &commands.clean_build {
                self.attempt("Clean build", clean, secs(timeouts.clean));
            }
        }
    }
}
