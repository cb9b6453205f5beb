//! Run command implementation.
//!
//! The `nightshift run` command drives (or resumes) the step sequence for a
//! root until it completes, is stopped, or aborts.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::load_config;
use crate::error::Result;
use crate::runner::{Controller, RunOutcome, StopSignal};
use crate::workspace::Workspace;

use super::dispatcher::{Command, CommandResult};

/// The run command implementation.
pub struct RunCommand {
    root: PathBuf,
    config: Option<PathBuf>,
}

impl RunCommand {
    /// Create a new run command.
    pub fn new(root: &Path, config: Option<&Path>) -> Self {
        Self {
            root: root.to_path_buf(),
            config: config.map(Path::to_path_buf),
        }
    }

    /// Where this run's log file goes, if its configuration loads.
    pub fn log_file(&self) -> Option<PathBuf> {
        let config = load_config(&self.root, self.config.as_deref()).ok()?;
        Some(Workspace::from_config(&self.root, &config).log_file())
    }
}

impl Command for RunCommand {
    fn execute(&self) -> Result<CommandResult> {
        let config = load_config(&self.root, self.config.as_deref())?;
        info!("Mission: {}", config.mission.statement);

        let mut controller = Controller::builder(&self.root, config)
            .stop_signal(StopSignal::with_process_signals())
            .build()?;

        let outcome = controller.run();
        if let RunOutcome::Completed(summary) = &outcome {
            info!("{} of {} steps ran in this session", summary.executed, summary.total);
        }

        Ok(match outcome.exit_code() {
            0 => CommandResult::success(),
            code => CommandResult::failure(code),
        })
    }
}
