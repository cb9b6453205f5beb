//! Durable progress snapshots.
//!
//! The snapshot is a JSON document carrying the cursor plus enough
//! descriptive context (mission, phase table, next step label) for a fresh
//! process, or an operator, to know exactly what remains.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Layout, Mission};
use crate::error::{NightshiftError, Result};
use crate::steps::{StepDescriptions, StepId};

use super::progress::{ExecutionProgress, ExecutionStatus};

/// On-disk form of [`ExecutionProgress`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub current_phase: u32,
    pub current_step: u32,
    pub completed_steps: u32,
    pub total_steps: u32,
    /// Derived; ignored on load.
    pub progress_percent: f64,
    pub last_updated: DateTime<Utc>,
    pub execution_status: ExecutionStatus,

    pub next_phase: u32,
    pub next_step: u32,
    pub next_description: String,
    pub next_phase_description: String,

    pub mission: String,
    pub architecture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub phase_descriptions: BTreeMap<u32, String>,
}

impl ProgressSnapshot {
    /// The cursor and statistics this snapshot records.
    pub fn progress(&self) -> ExecutionProgress {
        ExecutionProgress {
            current: StepId::new(self.current_phase, self.current_step),
            completed: self.completed_steps,
            total: self.total_steps,
            status: self.execution_status,
            last_updated: self.last_updated,
        }
    }

    /// Read a snapshot file without validating it against a layout.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    pub fn read(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| NightshiftError::SnapshotParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

/// Saves and restores [`ExecutionProgress`].
///
/// The store never merges: each save replaces the previous snapshot.
pub struct ProgressStore {
    path: PathBuf,
    layout: Layout,
    mission: Mission,
    phases: BTreeMap<u32, String>,
    descriptions: Arc<dyn StepDescriptions>,
}

impl ProgressStore {
    pub fn new(
        path: PathBuf,
        layout: Layout,
        mission: Mission,
        phases: BTreeMap<u32, String>,
        descriptions: Arc<dyn StepDescriptions>,
    ) -> Self {
        Self {
            path,
            layout,
            mission,
            phases,
            descriptions,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Build the snapshot for `progress`.
    pub fn snapshot(&self, progress: &ExecutionProgress) -> ProgressSnapshot {
        let next = progress.current;
        let (next_description, next_phase_description) = if next == self.layout.end() {
            ("All steps complete".to_string(), "Run complete".to_string())
        } else {
            (
                self.descriptions.describe(next),
                self.descriptions.phase_name(next.phase),
            )
        };

        ProgressSnapshot {
            current_phase: progress.current.phase,
            current_step: progress.current.step,
            completed_steps: progress.completed,
            total_steps: progress.total,
            progress_percent: progress.percent(),
            last_updated: Utc::now(),
            execution_status: progress.status,
            next_phase: next.phase,
            next_step: next.step,
            next_description,
            next_phase_description,
            mission: self.mission.statement.clone(),
            architecture: self.mission.architecture.clone(),
            target: self.mission.target.clone(),
            phase_descriptions: self.phases.clone(),
        }
    }

    /// Write a snapshot atomically (temp file, then rename).
    pub fn save(&self, progress: &ExecutionProgress) -> Result<()> {
        let snapshot = self.snapshot(progress);
        let persistence = |message: String| NightshiftError::PersistenceFailed {
            path: self.path.clone(),
            message,
        };

        let content =
            serde_json::to_string_pretty(&snapshot).map_err(|e| persistence(e.to_string()))?;
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| persistence(e.to_string()))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| persistence(e.to_string()))?;
        fs::rename(&temp_path, &self.path).map_err(|e| persistence(e.to_string()))?;

        info!(
            "Progress saved: {}/{} steps ({:.1}%)",
            progress.completed,
            progress.total,
            progress.percent()
        );
        Ok(())
    }

    /// Restore the last snapshot.
    ///
    /// A missing file means a fresh start. A snapshot that cannot be parsed
    /// or does not fit the layout is moved aside and also treated as a
    /// fresh start; it is never partially applied.
    pub fn load(&self) -> Option<ExecutionProgress> {
        let snapshot = match ProgressSnapshot::read(&self.path) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                warn!("Discarding unreadable progress snapshot: {}", e);
                self.quarantine();
                return None;
            }
        };

        let progress = snapshot.progress();
        if let Err(reason) = progress.check(&self.layout) {
            warn!("Discarding inconsistent progress snapshot: {}", reason);
            self.quarantine();
            return None;
        }

        info!(
            "Resumed from {} ({}/{} completed)",
            progress.current, progress.completed, progress.total
        );
        info!("Mission: {}", snapshot.mission);
        info!("Architecture: {}", snapshot.architecture);
        Some(progress)
    }

    fn quarantine(&self) {
        let aside = self.path.with_extension("json.corrupt");
        if let Err(e) = fs::rename(&self.path, &aside) {
            warn!("Could not move {} aside: {}", self.path.display(), e);
        }
    }
}
