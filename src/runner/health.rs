//! Environment probes run at start and on a fixed step cadence.

use std::sync::Arc;

use regex::Regex;
use tracing::{info, warn};

use crate::error::{NightshiftError, Result};
use crate::shell::CommandRunner;
use crate::workspace::{secs, Workspace};

/// Disk usage at or above this percentage is logged as a warning.
const DISK_WARN_PERCENT: u32 = 95;

/// What the probe observed. Only the version-control check is fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub disk_used_percent: Option<u32>,
    pub memory_mb: Option<u64>,
}

pub struct HealthProbe {
    workspace: Workspace,
    runner: Arc<dyn CommandRunner>,
}

impl HealthProbe {
    pub fn new(workspace: Workspace, runner: Arc<dyn CommandRunner>) -> Self {
        Self { workspace, runner }
    }

    /// Check version control, then log disk and memory usage.
    ///
    /// A root that is not yet under version control is fine; any other
    /// status failure is not.
    pub fn check(&self) -> Result<HealthReport> {
        let timeout = secs(self.workspace.timeouts().health);
        let root = self.workspace.root();

        let status = self.workspace.render(&self.workspace.commands().vcs_status, None)?;
        let result = self.runner.run(&status, timeout, root);
        if result.success {
            info!("Version control status OK");
        } else if result.stderr.contains("not a git repository") {
            info!("Not a version-controlled root yet (expected before initialization)");
        } else {
            return Err(NightshiftError::HealthCheckFailed {
                message: format!("'{}' failed: {}", status, result.stderr.trim()),
            });
        }

        let mut report = HealthReport::default();

        let disk = self.runner.run("df -h . | tail -1", timeout, root);
        if disk.success {
            info!("Disk usage: {}", disk.stdout.trim());
            report.disk_used_percent = parse_used_percent(&disk.stdout);
            if let Some(used) = report.disk_used_percent {
                if used >= DISK_WARN_PERCENT {
                    warn!("Disk is {}% full", used);
                }
            }
        }

        let memory = self
            .runner
            .run(&format!("ps -o rss= -p {}", std::process::id()), timeout, root);
        if memory.success {
            report.memory_mb = memory.stdout.trim().parse::<u64>().ok().map(|kb| kb / 1024);
            if let Some(mb) = report.memory_mb {
                info!("Memory usage: {} MB", mb);
            }
        }

        Ok(report)
    }
}

/// Extract the `Use%` column from a `df` line.
fn parse_used_percent(line: &str) -> Option<u32> {
    let re = Regex::new(r"(\d{1,3})%").ok()?;
    re.captures(line)?.get(1)?.as_str().parse().ok()
}
