//! Run controller.
//!
//! Iterates the step machine over the whole layout, owns the single
//! in-memory [`ExecutionProgress`], and decides when it is persisted:
//! every `checkpoint_every` completions and unconditionally on every way
//! out of [`Controller::run`].

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::config::{validate, ExecutionSettings, Layout, NightshiftConfig};
use crate::error::Result;
use crate::shell::{CommandRunner, ShellRunner};
use crate::state::{ExecutionContext, ExecutionProgress, ExecutionStatus, ProgressStore};
use crate::steps::{ScriptedAction, SimulatedAction, StepAction, StepCatalog, StepDescriptions, StepId};
use crate::workspace::Workspace;

use super::audit::{AuditRecorder, GitRecorder};
use super::health::HealthProbe;
use super::machine::{FailureKind, StepFailure, StepMachine};
use super::recovery::{RecoveryPolicy, WorkspaceRecovery};
use super::signal::StopSignal;
use super::validator::{StepValidator, Validation, WorkspaceValidator};

/// Counters reported when a run ends.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub completed: u32,
    pub total: u32,
    /// Steps completed by this process, excluding those restored.
    pub executed: u32,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.completed) / f64::from(self.total) * 100.0
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Every step completed.
    Completed(RunSummary),
    /// A stop was requested and honored at a step boundary.
    Interrupted(RunSummary),
    /// A step failed terminally, a health check failed, or the run panicked.
    Aborted { summary: RunSummary, reason: String },
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            RunOutcome::Completed(s) | RunOutcome::Interrupted(s) => s,
            RunOutcome::Aborted { summary, .. } => summary,
        }
    }

    /// Process exit code: a graceful stop is not a failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunOutcome::Completed(_) | RunOutcome::Interrupted(_) => 0,
            RunOutcome::Aborted { .. } => 1,
        }
    }
}

/// Overrides for the default collaborators.
pub struct ControllerBuilder {
    root: PathBuf,
    config: NightshiftConfig,
    runner: Option<Arc<dyn CommandRunner>>,
    action: Option<Arc<dyn StepAction>>,
    validator: Option<Arc<dyn StepValidator>>,
    recovery: Option<Arc<dyn RecoveryPolicy>>,
    recorder: Option<Arc<dyn AuditRecorder>>,
    stop: StopSignal,
}

impl ControllerBuilder {
    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn action(mut self, action: Arc<dyn StepAction>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn validator(mut self, validator: Arc<dyn StepValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn recovery(mut self, recovery: Arc<dyn RecoveryPolicy>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    pub fn recorder(mut self, recorder: Arc<dyn AuditRecorder>) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// Validate the configuration and wire the collaborators.
    pub fn build(self) -> Result<Controller> {
        validate(&self.config)?;

        let config = self.config;
        let workspace = Workspace::from_config(&self.root, &config);
        let catalog = Arc::new(StepCatalog::from_config(&config));
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(ShellRunner::new()));

        let action = self.action.unwrap_or_else(|| {
            let simulated =
                SimulatedAction::new(Duration::from_millis(config.execution.simulated_delay_ms));
            Arc::new(ScriptedAction::new(
                workspace.clone(),
                catalog.clone(),
                runner.clone(),
                simulated,
            ))
        });
        let validator = self.validator.unwrap_or_else(|| {
            Arc::new(WorkspaceValidator::new(
                workspace.clone(),
                catalog.clone(),
                runner.clone(),
                config.layout,
                config.execution.early_steps,
            ))
        });
        let recovery = self
            .recovery
            .unwrap_or_else(|| Arc::new(WorkspaceRecovery::new(workspace.clone(), runner.clone())));
        let recorder = self
            .recorder
            .unwrap_or_else(|| Arc::new(GitRecorder::new(workspace.clone(), runner.clone())));

        let descriptions: Arc<dyn StepDescriptions> = catalog.clone();
        let machine = StepMachine::new(
            action,
            validator.clone(),
            recovery,
            recorder,
            descriptions.clone(),
            config.execution.max_retries,
            self.stop.clone(),
        );
        let store = ProgressStore::new(
            workspace.progress_file(),
            config.layout,
            config.mission.clone(),
            config.phases.clone(),
            descriptions.clone(),
        );

        Ok(Controller {
            layout: config.layout,
            execution: config.execution.clone(),
            context: ExecutionContext::from_config(&config),
            progress: ExecutionProgress::fresh(&config.layout),
            health: HealthProbe::new(workspace.clone(), runner),
            workspace,
            store,
            machine,
            validator,
            descriptions,
            stop: self.stop,
        })
    }
}

/// Drives a whole run for one root.
pub struct Controller {
    layout: Layout,
    execution: ExecutionSettings,
    context: ExecutionContext,
    workspace: Workspace,
    store: ProgressStore,
    machine: StepMachine,
    validator: Arc<dyn StepValidator>,
    health: HealthProbe,
    descriptions: Arc<dyn StepDescriptions>,
    progress: ExecutionProgress,
    stop: StopSignal,
}

enum Halt {
    Interrupted,
    Aborted(String),
}

impl Controller {
    /// A controller for `root` with the default collaborators.
    pub fn builder(root: &Path, config: NightshiftConfig) -> ControllerBuilder {
        ControllerBuilder {
            root: root.to_path_buf(),
            config,
            runner: None,
            action: None,
            validator: None,
            recovery: None,
            recorder: None,
            stop: StopSignal::new(),
        }
    }

    pub fn progress(&self) -> &ExecutionProgress {
        &self.progress
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// A handle that stops the run at the next boundary.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Replace the in-memory position with the last snapshot, if any.
    pub fn restore(&mut self) {
        match self.store.load() {
            Some(progress) => {
                self.progress = progress;
                self.progress.status = ExecutionStatus::Running;
            }
            None => {
                info!("Starting fresh at {}", StepId::first());
                self.progress = ExecutionProgress::fresh(&self.layout);
            }
        }
    }

    /// Persist the current position. Failures are logged only.
    pub fn checkpoint(&mut self) {
        if let Err(e) = self.store.save(&self.progress) {
            error!("{}", e);
        }
    }

    /// Run the current step and, on success, move the cursor on.
    ///
    /// Returns the step that completed.
    pub fn advance(&mut self) -> std::result::Result<StepId, StepFailure> {
        let id = self.progress.current;
        self.machine.run_step(id)?;
        self.progress.advance(&self.layout);
        if self.progress.completed % self.execution.checkpoint_every == 0 {
            self.checkpoint();
        }
        Ok(id)
    }

    /// Restore, then drive every remaining step.
    pub fn run(&mut self) -> RunOutcome {
        let started = Instant::now();
        info!(
            "Starting run of {} steps in {}",
            self.layout.total(),
            self.workspace.root().display()
        );

        if let Err(e) = self.context.write(&self.workspace.context_file()) {
            warn!("Could not write execution context: {}", e);
        }
        self.restore();
        let restored = self.progress.completed;

        let halt = panic::catch_unwind(AssertUnwindSafe(|| self.drive()))
            .unwrap_or_else(|cause| {
                let reason = cause
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| cause.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Unexpected failure: {}", reason);
                Err(Halt::Aborted(reason))
            });

        self.progress.status = ExecutionStatus::Stopped;
        self.checkpoint();

        let summary = RunSummary {
            completed: self.progress.completed,
            total: self.progress.total,
            executed: self.progress.completed.saturating_sub(restored),
            elapsed: started.elapsed(),
        };
        info!(
            "Total runtime: {:.2} hours",
            summary.elapsed.as_secs_f64() / 3600.0
        );
        info!("Steps completed: {}/{}", summary.completed, summary.total);
        info!("Success rate: {:.1}%", summary.success_rate());

        match halt {
            Ok(()) => {
                info!("All steps completed");
                RunOutcome::Completed(summary)
            }
            Err(Halt::Interrupted) => {
                info!("Stopped at {}; progress saved", self.progress.current);
                RunOutcome::Interrupted(summary)
            }
            Err(Halt::Aborted(reason)) => {
                error!("Run aborted: {}", reason);
                RunOutcome::Aborted { summary, reason }
            }
        }
    }

    fn drive(&mut self) -> std::result::Result<(), Halt> {
        self.health_check()?;

        let mut announced = None;
        while !self.progress.is_finished(&self.layout) {
            if self.stop.is_requested() {
                info!("Stop requested");
                return Err(Halt::Interrupted);
            }

            let phase = self.progress.current.phase;
            if announced != Some(phase) {
                info!(
                    "=== PHASE {}: {} ===",
                    phase,
                    self.descriptions.phase_name(phase)
                );
                announced = Some(phase);
            }

            match self.advance() {
                Ok(id) => info!("{} completed", id),
                Err(failure) if failure.kind == FailureKind::Interrupted => {
                    info!("{}", failure);
                    return Err(Halt::Interrupted);
                }
                Err(failure) => {
                    error!("CRITICAL: {}", failure);
                    return Err(Halt::Aborted(failure.to_string()));
                }
            }

            if self.progress.completed % self.execution.health_check_every == 0 {
                self.health_check()?;
            }
        }

        let last = self.layout.last();
        info!("Final validation of {}", last);
        match self.validator.validate(last) {
            Validation::Passed => Ok(()),
            Validation::Failed(reason) => {
                Err(Halt::Aborted(format!("final validation failed: {}", reason)))
            }
        }
    }

    fn health_check(&self) -> std::result::Result<(), Halt> {
        self.health.check().map(|_| ()).map_err(|e| {
            error!("{}", e);
            Halt::Aborted(e.to_string())
        })
    }
}
