//! Mission context file.
//!
//! Written once at controller start so an operator, or a fresh process with
//! no other context, can read what the run is for and how it is shaped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::config::{Layout, Mission, NightshiftConfig};
use crate::error::Result;

/// Contents of `execution_context.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub mission: String,
    pub architecture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    pub total_phases: u32,
    pub steps_per_phase: u32,
    pub total_steps: u32,
    #[serde(default)]
    pub phase_descriptions: BTreeMap<u32, String>,
    pub autonomous_execution: bool,
    pub context_preservation: bool,
    pub last_updated: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn from_config(config: &NightshiftConfig) -> Self {
        let Mission {
            statement,
            architecture,
            target,
            context,
        } = config.mission.clone();
        let Layout {
            phases,
            steps_per_phase,
        } = config.layout;

        Self {
            mission: statement,
            architecture,
            target,
            context,
            total_phases: phases,
            steps_per_phase,
            total_steps: config.layout.total(),
            phase_descriptions: config.phases.clone(),
            autonomous_execution: true,
            context_preservation: true,
            last_updated: Utc::now(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(anyhow::Error::from)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_mission_and_layout() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state/execution_context.json");
        let mut config = NightshiftConfig::default();
        config.mission.statement = "Ship it".to_string();
        config.phases.insert(1, "Foundation".to_string());

        ExecutionContext::from_config(&config).write(&path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["mission"], "Ship it");
        assert_eq!(value["totalSteps"], 400);
        assert_eq!(value["phaseDescriptions"]["1"], "Foundation");
        assert_eq!(value["contextPreservation"], true);
    }
}
