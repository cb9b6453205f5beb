//! The per-step state machine.
//!
//! ```text
//! Attempting(n) --ok--> Validating(n) --passed--> Recording --ok--> done
//!      |                     |                        |
//!      | failed              | failed                 | failed
//!      v                     v                        v
//!  Recovering(n) <-- n < max_retries             AuditFailed (no retry)
//!      |
//!      v
//!  Attempting(n + 1)
//! ```
//!
//! An action and its validation share one attempt. Recovery only runs when
//! another attempt will follow.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::steps::{StepAction, StepDescriptions, StepId, StepOutcome};

use super::audit::{AuditEntry, AuditRecorder};
use super::recovery::RecoveryPolicy;
use super::signal::StopSignal;
use super::validator::{StepValidator, Validation};

/// Why a step ended without completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Every attempt's action reported failure (or errored).
    ActionFailed,
    /// The last attempt's action succeeded but validation rejected it.
    ValidationFailed,
    /// Validated work could not be recorded.
    AuditFailed,
    /// A stop was requested between attempts.
    Interrupted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::ActionFailed => "action failed",
            FailureKind::ValidationFailed => "validation failed",
            FailureKind::AuditFailed => "audit failed",
            FailureKind::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Terminal failure of one step.
#[derive(Debug, Clone, Error)]
#[error("{step} {kind} after {attempts} attempt(s): {message}")]
pub struct StepFailure {
    pub step: StepId,
    pub kind: FailureKind,
    pub attempts: u32,
    pub message: String,
}

/// One try at a step, kept only long enough to decide the next state.
#[derive(Debug)]
struct AttemptRecord {
    attempt: u32,
    kind: FailureKind,
    message: String,
}

#[derive(Debug)]
enum State {
    Attempting(u32),
    Validating(u32, StepOutcome),
    Recording(u32, StepOutcome),
    Recovering(AttemptRecord),
}

/// Drives a single step through attempt, validation, recovery and audit.
pub struct StepMachine {
    action: Arc<dyn StepAction>,
    validator: Arc<dyn StepValidator>,
    recovery: Arc<dyn RecoveryPolicy>,
    recorder: Arc<dyn AuditRecorder>,
    descriptions: Arc<dyn StepDescriptions>,
    max_retries: u32,
    stop: StopSignal,
}

impl StepMachine {
    pub fn new(
        action: Arc<dyn StepAction>,
        validator: Arc<dyn StepValidator>,
        recovery: Arc<dyn RecoveryPolicy>,
        recorder: Arc<dyn AuditRecorder>,
        descriptions: Arc<dyn StepDescriptions>,
        max_retries: u32,
        stop: StopSignal,
    ) -> Self {
        Self {
            action,
            validator,
            recovery,
            recorder,
            descriptions,
            max_retries: max_retries.max(1),
            stop,
        }
    }

    /// Run `id` to completion or terminal failure.
    ///
    /// On `Ok`, the step's audit entry has been recorded.
    pub fn run_step(&self, id: StepId) -> Result<(), StepFailure> {
        let mut state = State::Attempting(1);
        loop {
            debug!("{}: {:?}", id, state);
            state = match state {
                State::Attempting(attempt) => {
                    if attempt > 1 && self.stop.is_requested() {
                        return Err(StepFailure {
                            step: id,
                            kind: FailureKind::Interrupted,
                            attempts: attempt - 1,
                            message: "stop requested between attempts".to_string(),
                        });
                    }
                    info!("{} attempt {}/{}", id, attempt, self.max_retries);
                    let outcome = match self.action.perform(id) {
                        Ok(outcome) => outcome,
                        Err(e) => StepOutcome::failure(e.to_string()),
                    };
                    if outcome.succeeded {
                        State::Validating(attempt, outcome)
                    } else {
                        warn!("{} attempt {} failed: {}", id, attempt, outcome.message);
                        self.after_failure(id, attempt, FailureKind::ActionFailed, outcome.message)?
                    }
                }
                State::Validating(attempt, outcome) => match self.validator.validate(id) {
                    Validation::Passed => State::Recording(attempt, outcome),
                    Validation::Failed(reason) => {
                        self.after_failure(id, attempt, FailureKind::ValidationFailed, reason)?
                    }
                },
                State::Recording(attempt, outcome) => {
                    let entry = AuditEntry::new(
                        id,
                        self.descriptions.describe(id),
                        outcome.message,
                        outcome.changed,
                    );
                    return self.recorder.record(&entry).map_err(|e| StepFailure {
                        step: id,
                        kind: FailureKind::AuditFailed,
                        attempts: attempt,
                        message: e.to_string(),
                    });
                }
                State::Recovering(record) => {
                    info!(
                        "Recovering {} after {} on attempt {}: {}",
                        id, record.kind, record.attempt, record.message
                    );
                    self.recovery.recover(id, record.attempt);
                    State::Attempting(record.attempt + 1)
                }
            };
        }
    }

    fn after_failure(
        &self,
        id: StepId,
        attempt: u32,
        kind: FailureKind,
        message: String,
    ) -> Result<State, StepFailure> {
        if attempt < self.max_retries {
            return Ok(State::Recovering(AttemptRecord {
                attempt,
                kind,
                message,
            }));
        }
        error!("{} failed after {} attempts", id, attempt);
        Err(StepFailure {
            step: id,
            kind,
            attempts: attempt,
            message,
        })
    }
}
