//! Configuration schema definitions for Nightshift.
//!
//! This module contains all the struct definitions that map to
//! the YAML configuration file format.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Root configuration structure for `.nightshift/config.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NightshiftConfig {
    /// Descriptive context echoed into every snapshot.
    pub mission: Mission,

    /// Shape of the step sequence.
    pub layout: Layout,

    /// Retry, checkpoint and health cadence.
    pub execution: ExecutionSettings,

    /// Where the work happens.
    pub workspace: WorkspaceSettings,

    /// Commands used by validation, recovery, audit and health probes.
    pub commands: CommandSettings,

    /// Per call-site command timeouts, in seconds.
    pub timeouts: Timeouts,

    /// Phase number to human-readable label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub phases: BTreeMap<u32, String>,

    /// Step catalog: labels plus optional scripted actions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<StepEntry>,
}

/// Mission context preserved for operators and fresh processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Mission {
    /// One-line statement of what the run builds.
    pub statement: String,

    /// Architecture summary.
    pub architecture: String,

    /// Target outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Free-form extra context.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, String>,
}

impl Default for Mission {
    fn default() -> Self {
        Self {
            statement: "Complete the configured step sequence".to_string(),
            architecture: "unspecified".to_string(),
            target: None,
            context: BTreeMap::new(),
        }
    }
}

/// Number of phases and steps per phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub phases: u32,
    pub steps_per_phase: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            phases: 20,
            steps_per_phase: 20,
        }
    }
}

/// Execution cadence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionSettings {
    /// Attempts per step, including the first.
    pub max_retries: u32,

    /// Persist progress every K completed steps.
    pub checkpoint_every: u32,

    /// Run the health probe every M completed steps (M > K).
    pub health_check_every: u32,

    /// Steps with an ordinal below this also verify workspace initialization.
    pub early_steps: u32,

    /// Delay used by the simulated action for unscripted steps.
    pub simulated_delay_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            checkpoint_every: 10,
            health_check_every: 50,
            early_steps: 2,
            simulated_delay_ms: 1000,
        }
    }
}

/// Workspace locations, relative to the root unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceSettings {
    /// Directory the steps produce and mutate.
    pub dir: PathBuf,

    /// Build artifact descriptor inside the workspace; enables build probes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_descriptor: Option<PathBuf>,

    /// Directory holding the snapshot, context file and log.
    pub state_dir: PathBuf,

    /// Marker inside the workspace proving version control was initialized.
    pub vcs_dir: PathBuf,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("app"),
            build_descriptor: None,
            state_dir: PathBuf::from(".nightshift"),
            vcs_dir: PathBuf::from(".git"),
        }
    }
}

/// Command templates. All run with the workspace as working directory
/// except `clear_caches`, which runs from the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    pub vcs_status: String,
    pub vcs_reset: String,
    pub stage: String,
    pub commit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_caches: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean_build: Option<String>,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            vcs_status: "git status".to_string(),
            vcs_reset: "git reset --hard HEAD".to_string(),
            stage: "git add -A".to_string(),
            commit: "git commit --allow-empty -F \"${message_file}\"".to_string(),
            clear_caches: None,
            build: None,
            clean_build: None,
        }
    }
}

/// Per call-site timeouts in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub status: u64,
    pub build: u64,
    pub clean: u64,
    pub caches: u64,
    pub reset: u64,
    pub commit: u64,
    pub action: u64,
    pub health: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            status: 30,
            build: 600,
            clean: 120,
            caches: 60,
            reset: 30,
            commit: 120,
            action: 300,
            health: 30,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepEntry {
    pub phase: u32,
    pub step: u32,

    /// Human-readable label.
    pub description: String,

    /// Commands to run, in order. Empty means the step is simulated.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub run: Vec<ScriptCommand>,

    /// Files to write, relative to the workspace.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileSpec>,

    /// Resources reported as changed; defaults to the written files.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changed: Vec<String>,

    /// Paths, relative to the workspace, that must exist after the step.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expect: Vec<PathBuf>,
}

impl StepEntry {
    /// Whether this entry carries any work beyond its label.
    pub fn is_scripted(&self) -> bool {
        !self.run.is_empty() || !self.files.is_empty()
    }
}

/// A command inside a step script.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptCommand {
    pub command: String,

    /// Overrides `timeouts.action`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Run inside the workspace instead of the root.
    #[serde(skip_serializing_if = "is_false")]
    pub in_workspace: bool,

    /// Tried when `command` fails; the step fails only if this fails too.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

/// A file written by a scripted step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSpec {
    pub path: String,
    pub contents: String,
}

fn is_false(v: &bool) -> bool {
    !v
}
