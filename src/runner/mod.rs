//! Step execution orchestration.
//!
//! - [`Controller`] - Drives the whole layout, persists progress, probes health
//! - [`StepMachine`] - Attempt, validate, recover and audit one step
//! - [`StepValidator`] / [`RecoveryPolicy`] / [`AuditRecorder`] - The
//!   collaborators the machine calls between attempts
//! - [`StopSignal`] - Cooperative stop requests

pub mod audit;
pub mod controller;
pub mod health;
pub mod machine;
pub mod recovery;
pub mod signal;
pub mod validator;

pub use audit::{AuditEntry, AuditRecorder, GitRecorder};
pub use controller::{Controller, ControllerBuilder, RunOutcome, RunSummary};
pub use health::{HealthProbe, HealthReport};
pub use machine::{FailureKind, StepFailure, StepMachine};
pub use recovery::{RecoveryPolicy, WorkspaceRecovery};
pub use signal::StopSignal;
pub use validator::{StepValidator, Validation, WorkspaceValidator};
