//! Configuration validation rules.
//!
//! Checks run before any step executes:
//! - Layout, retry and cadence values are usable
//! - Catalog entries sit inside the layout and are unique
//! - Command templates only reference known variables

use crate::config::interpolation::{extract_variables, KNOWN_VARIABLES};
use crate::config::schema::NightshiftConfig;
use crate::error::{NightshiftError, Result};
use std::collections::HashSet;

/// Validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Rule identifier
    pub rule: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    fn new(rule: &str, message: impl Into<String>) -> Self {
        Self {
            rule: rule.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a configuration and return all errors.
pub fn validate_config(config: &NightshiftConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    errors.extend(validate_cadence(config));
    errors.extend(validate_catalog(config));
    errors.extend(validate_templates(config));

    errors
}

/// Validate and fold all errors into one.
pub fn validate(config: &NightshiftConfig) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        return Ok(());
    }

    let message = errors
        .iter()
        .map(|e| format!("[{}] {}", e.rule, e.message))
        .collect::<Vec<_>>()
        .join("; ");
    Err(NightshiftError::ConfigValidationError { message })
}

fn validate_cadence(config: &NightshiftConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let layout = config.layout;
    let exec = &config.execution;

    if layout.phases == 0 || layout.steps_per_phase == 0 {
        errors.push(ValidationError::new(
            "empty-layout",
            "layout.phases and layout.steps_per_phase must be at least 1",
        ));
    }
    if layout.phases.checked_mul(layout.steps_per_phase).is_none() || layout.phases == u32::MAX {
        errors.push(ValidationError::new(
            "layout-too-large",
            format!(
                "layout of {} phases x {} steps exceeds the addressable step count",
                layout.phases, layout.steps_per_phase
            ),
        ));
    }
    if exec.max_retries == 0 {
        errors.push(ValidationError::new(
            "no-attempts",
            "execution.max_retries must be at least 1",
        ));
    }
    if exec.checkpoint_every == 0 {
        errors.push(ValidationError::new(
            "checkpoint-cadence",
            "execution.checkpoint_every must be at least 1",
        ));
    }
    if exec.health_check_every <= exec.checkpoint_every {
        errors.push(ValidationError::new(
            "health-cadence",
            format!(
                "execution.health_check_every ({}) must exceed checkpoint_every ({})",
                exec.health_check_every, exec.checkpoint_every
            ),
        ));
    }

    errors
}

fn validate_catalog(config: &NightshiftConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let layout = config.layout;
    let mut seen = HashSet::new();

    for phase in config.phases.keys() {
        if *phase == 0 || *phase > layout.phases {
            errors.push(ValidationError::new(
                "phase-out-of-range",
                format!("Phase {} label is outside the layout", phase),
            ));
        }
    }

    for entry in &config.steps {
        let in_range = (1..=layout.phases).contains(&entry.phase)
            && (1..=layout.steps_per_phase).contains(&entry.step);
        if !in_range {
            errors.push(ValidationError::new(
                "step-out-of-range",
                format!(
                    "Step {}.{} is outside the {}x{} layout",
                    entry.phase, entry.step, layout.phases, layout.steps_per_phase
                ),
            ));
        }
        if !seen.insert((entry.phase, entry.step)) {
            errors.push(ValidationError::new(
                "duplicate-step",
                format!("Step {}.{} is defined more than once", entry.phase, entry.step),
            ));
        }
        for command in &entry.run {
            if command.command.trim().is_empty() {
                errors.push(ValidationError::new(
                    "empty-command",
                    format!("Step {}.{} has an empty command", entry.phase, entry.step),
                ));
            }
        }
    }

    errors
}

fn validate_templates(config: &NightshiftConfig) -> Vec<ValidationError> {
    let commands = &config.commands;
    let mut templates: Vec<&str> = vec![
        commands.vcs_status.as_str(),
        commands.vcs_reset.as_str(),
        commands.stage.as_str(),
        commands.commit.as_str(),
    ];
    templates.extend(commands.clear_caches.as_deref());
    templates.extend(commands.build.as_deref());
    templates.extend(commands.clean_build.as_deref());
    for entry in &config.steps {
        for command in &entry.run {
            templates.push(command.command.as_str());
            templates.extend(command.fallback.as_deref());
        }
    }

    let mut errors = Vec::new();
    for template in templates {
        for name in extract_variables(template) {
            if !KNOWN_VARIABLES.contains(&name.as_str()) {
                errors.push(ValidationError::new(
                    "unknown-variable",
                    format!("Unknown variable '${{{}}}' in '{}'", name, template),
                ));
            }
        }
    }

    errors
}
