//! Step description registry.
//!
//! Labels are informational only: they show up in logs, audit entries and
//! snapshots but never change control flow.

use std::collections::{BTreeMap, HashMap};

use crate::config::{NightshiftConfig, StepEntry};

use super::StepId;

/// Read-only lookup of human-readable labels.
pub trait StepDescriptions: Send + Sync {
    /// Label for a step; falls back to a generated one.
    fn describe(&self, id: StepId) -> String;

    /// Label for a phase; falls back to "Unknown Phase".
    fn phase_name(&self, phase: u32) -> String;
}

/// Catalog loaded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StepCatalog {
    phases: BTreeMap<u32, String>,
    entries: HashMap<StepId, StepEntry>,
}

impl StepCatalog {
    pub fn from_config(config: &NightshiftConfig) -> Self {
        let entries = config
            .steps
            .iter()
            .map(|e| (StepId::new(e.phase, e.step), e.clone()))
            .collect();

        Self {
            phases: config.phases.clone(),
            entries,
        }
    }

    /// The full catalog entry, if one is configured.
    pub fn entry(&self, id: StepId) -> Option<&StepEntry> {
        self.entries.get(&id)
    }
}

impl StepDescriptions for StepCatalog {
    fn describe(&self, id: StepId) -> String {
        self.entries
            .get(&id)
            .map(|e| e.description.trim())
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Phase {} Step {} implementation", id.phase, id.step))
    }

    fn phase_name(&self, phase: u32) -> String {
        self.phases
            .get(&phase)
            .cloned()
            .unwrap_or_else(|| "Unknown Phase".to_string())
    }
}
