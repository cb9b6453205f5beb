//! Resolved locations and command templates for one orchestrated root.
//!
//! A [`Workspace`] is built once from configuration and handed to every
//! collaborator, so nothing reads process-wide state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{
    resolve_string, CommandSettings, InterpolationContext, NightshiftConfig, Timeouts,
};
use crate::error::Result;
use crate::steps::StepId;

/// File names inside the state directory.
pub const PROGRESS_FILE: &str = "progress.json";
pub const CONTEXT_FILE: &str = "execution_context.json";
pub const LOG_FILE: &str = "execution.log";
pub const MESSAGE_FILE: &str = "COMMIT_MSG";

/// Paths and command templates for a root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    dir: PathBuf,
    state_dir: PathBuf,
    descriptor: Option<PathBuf>,
    vcs_dir: PathBuf,
    commands: CommandSettings,
    timeouts: Timeouts,
}

impl Workspace {
    /// Resolve configured paths against `root`.
    pub fn from_config(root: &Path, config: &NightshiftConfig) -> Self {
        let dir = root.join(&config.workspace.dir);
        let descriptor = config
            .workspace
            .build_descriptor
            .as_ref()
            .map(|d| dir.join(d));

        Self {
            root: root.to_path_buf(),
            state_dir: root.join(&config.workspace.state_dir),
            vcs_dir: dir.join(&config.workspace.vcs_dir),
            dir,
            descriptor,
            commands: config.commands.clone(),
            timeouts: config.timeouts.clone(),
        }
    }

    /// The orchestrated root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The working area steps produce and mutate.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn progress_file(&self) -> PathBuf {
        self.state_dir.join(PROGRESS_FILE)
    }

    pub fn context_file(&self) -> PathBuf {
        self.state_dir.join(CONTEXT_FILE)
    }

    pub fn log_file(&self) -> PathBuf {
        self.state_dir.join(LOG_FILE)
    }

    /// Temporary location for audit messages, outside the workspace so it
    /// is never staged.
    pub fn message_file(&self) -> PathBuf {
        self.state_dir.join(MESSAGE_FILE)
    }

    /// Version-control metadata directory inside the workspace.
    pub fn vcs_dir(&self) -> &Path {
        &self.vcs_dir
    }

    /// The build artifact descriptor, when configured and present on disk.
    pub fn build_descriptor(&self) -> Option<&Path> {
        self.descriptor.as_deref().filter(|d| d.exists())
    }

    pub fn commands(&self) -> &CommandSettings {
        &self.commands
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// Variables available to templates, optionally scoped to a step.
    pub fn context(&self, step: Option<StepId>) -> InterpolationContext {
        let mut ctx = InterpolationContext::new()
            .with("root", self.root.display().to_string())
            .with("workspace", self.dir.display().to_string())
            .with("state_dir", self.state_dir.display().to_string())
            .with("message_file", self.message_file().display().to_string())
            .with(
                "descriptor",
                self.descriptor
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
            );
        if let Some(id) = step {
            ctx.set("phase", id.phase.to_string());
            ctx.set("step", id.step.to_string());
        }
        ctx
    }

    /// Resolve a command template for an optional step.
    pub fn render(&self, template: &str, step: Option<StepId>) -> Result<String> {
        resolve_string(template, &self.context(step))
    }
}

/// Seconds from configuration to a [`Duration`].
pub fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}
