//! Status command implementation.
//!
//! The `nightshift status` command reads the progress snapshot without
//! touching it.

use std::path::{Path, PathBuf};

use console::style;

use crate::cli::args::StatusArgs;
use crate::config::load_config;
use crate::error::Result;
use crate::state::{ExecutionStatus, ProgressSnapshot};
use crate::workspace::Workspace;

use super::dispatcher::{Command, CommandResult};

/// The status command implementation.
pub struct StatusCommand {
    root: PathBuf,
    config: Option<PathBuf>,
    args: StatusArgs,
}

impl StatusCommand {
    /// Create a new status command.
    pub fn new(root: &Path, config: Option<&Path>, args: StatusArgs) -> Self {
        Self {
            root: root.to_path_buf(),
            config: config.map(Path::to_path_buf),
            args,
        }
    }

    /// Render the human-readable report.
    fn report(&self, snapshot: &ProgressSnapshot) -> String {
        let status = match snapshot.execution_status {
            ExecutionStatus::Running => style(snapshot.execution_status.to_string()).yellow(),
            ExecutionStatus::Stopped => style(snapshot.execution_status.to_string()).dim(),
        };
        let next = if snapshot.completed_steps >= snapshot.total_steps {
            style(snapshot.next_description.clone()).green().to_string()
        } else {
            format!(
                "Phase {}.{} {} ({})",
                snapshot.next_phase,
                snapshot.next_step,
                snapshot.next_description,
                snapshot.next_phase_description
            )
        };

        let mut lines = vec![
            style(format!("Nightshift - {}", self.root.display()))
                .bold()
                .to_string(),
            format!("  Mission:   {}", snapshot.mission),
            format!(
                "  Completed: {}/{} ({:.1}%)",
                snapshot.completed_steps, snapshot.total_steps, snapshot.progress_percent
            ),
            format!("  Status:    {}", status),
            format!("  Next:      {}", next),
            format!(
                "  Updated:   {}",
                snapshot.last_updated.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        ];
        if let Some(target) = &snapshot.target {
            lines.insert(2, format!("  Target:    {}", target));
        }
        lines.join("\n")
    }
}

impl Command for StatusCommand {
    fn execute(&self) -> Result<CommandResult> {
        let config = load_config(&self.root, self.config.as_deref())?;
        let path = Workspace::from_config(&self.root, &config).progress_file();

        let Some(snapshot) = ProgressSnapshot::read(&path)? else {
            println!("No progress recorded at {}", path.display());
            return Ok(CommandResult::success());
        };

        if self.args.json {
            let json = serde_json::to_string_pretty(&snapshot).map_err(anyhow::Error::from)?;
            println!("{}", json);
        } else {
            println!("{}", self.report(&snapshot));
        }
        Ok(CommandResult::success())
    }
}
