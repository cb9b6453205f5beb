//! Integration tests for the run controller, using recording fakes for
//! every collaborator.

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nightshift::config::{Layout, NightshiftConfig};
use nightshift::runner::{
    AuditEntry, AuditRecorder, Controller, RecoveryPolicy, RunOutcome, StepValidator, StopSignal,
    Validation,
};
use nightshift::shell::{CommandResult, CommandRunner};
use nightshift::state::{ExecutionStatus, ProgressSnapshot};
use nightshift::steps::{StepAction, StepId, StepOutcome};
use nightshift::{NightshiftError, Result};
use tempfile::TempDir;

struct HealthyRunner {
    status_error: Option<&'static str>,
}

impl CommandRunner for HealthyRunner {
    fn run(&self, command: &str, _timeout: Duration, _cwd: &Path) -> CommandResult {
        match self.status_error {
            Some(err) if command.starts_with("git status") => {
                CommandResult::failure(Some(128), String::new(), err.to_string(), Duration::ZERO)
            }
            _ => CommandResult::success(String::new(), String::new(), Duration::ZERO),
        }
    }
}

/// Counts version-control status probes; optionally fails the n-th one.
#[derive(Default)]
struct CountingRunner {
    status_calls: AtomicU32,
    fail_status_call: Option<u32>,
}

impl CommandRunner for CountingRunner {
    fn run(&self, command: &str, _timeout: Duration, _cwd: &Path) -> CommandResult {
        if command.starts_with("git status") {
            let n = self.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_status_call == Some(n) {
                return CommandResult::failure(
                    Some(128),
                    String::new(),
                    "fatal: index file corrupt".to_string(),
                    Duration::ZERO,
                );
            }
        }
        CommandResult::success(String::new(), String::new(), Duration::ZERO)
    }
}

#[derive(Default)]
struct RecordingAction {
    calls: Mutex<Vec<StepId>>,
    stop_after: Option<(u32, StopSignal)>,
    panic_on: Option<StepId>,
}

impl RecordingAction {
    fn calls(&self) -> Vec<StepId> {
        self.calls.lock().unwrap().clone()
    }
}

impl StepAction for RecordingAction {
    fn perform(&self, id: StepId) -> Result<StepOutcome> {
        if self.panic_on == Some(id) {
            panic!("action blew up at {}", id);
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push(id);
        if let Some((n, stop)) = &self.stop_after {
            if calls.len() as u32 == *n {
                stop.request();
            }
        }
        Ok(StepOutcome::success(format!("did {}", id), vec![]))
    }
}

#[derive(Default)]
struct SelectiveValidator {
    reject: Option<StepId>,
}

impl StepValidator for SelectiveValidator {
    fn validate(&self, id: StepId) -> Validation {
        if self.reject == Some(id) {
            Validation::Failed(format!("{} left the build broken", id))
        } else {
            Validation::Passed
        }
    }
}

#[derive(Default)]
struct CountingRecovery {
    calls: AtomicU32,
}

impl RecoveryPolicy for CountingRecovery {
    fn recover(&self, _id: StepId, _attempt: u32) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct MemoryRecorder {
    steps: Mutex<Vec<StepId>>,
    fail_on: Option<StepId>,
}

impl AuditRecorder for MemoryRecorder {
    fn record(&self, entry: &AuditEntry) -> Result<()> {
        if self.fail_on == Some(entry.step) {
            return Err(NightshiftError::AuditFailed {
                step: entry.step.to_string(),
                message: "index.lock exists".to_string(),
            });
        }
        self.steps.lock().unwrap().push(entry.step);
        Ok(())
    }
}

fn config(phases: u32, steps_per_phase: u32, checkpoint_every: u32) -> NightshiftConfig {
    let mut config = NightshiftConfig::default();
    config.steps.clear();
    config.layout = Layout {
        phases,
        steps_per_phase,
    };
    config.execution.checkpoint_every = checkpoint_every;
    config.execution.health_check_every = checkpoint_every + 1;
    config.execution.simulated_delay_ms = 0;
    config
}

struct Harness {
    action: Arc<RecordingAction>,
    recovery: Arc<CountingRecovery>,
    recorder: Arc<MemoryRecorder>,
    controller: Controller,
}

fn harness(
    root: &Path,
    config: NightshiftConfig,
    action: RecordingAction,
    validator: SelectiveValidator,
    recorder: MemoryRecorder,
    stop: StopSignal,
) -> Harness {
    let action = Arc::new(action);
    let recovery = Arc::new(CountingRecovery::default());
    let recorder = Arc::new(recorder);
    let controller = Controller::builder(root, config)
        .runner(Arc::new(HealthyRunner { status_error: None }))
        .action(action.clone())
        .validator(Arc::new(validator))
        .recovery(recovery.clone())
        .recorder(recorder.clone())
        .stop_signal(stop)
        .build()
        .unwrap();
    Harness {
        action,
        recovery,
        recorder,
        controller,
    }
}

fn snapshot(root: &Path) -> ProgressSnapshot {
    ProgressSnapshot::read(&root.join(".nightshift/progress.json"))
        .unwrap()
        .expect("snapshot should exist")
}

#[test]
fn full_run_completes_every_step_in_order() {
    let temp = TempDir::new().unwrap();
    let mut h = harness(
        temp.path(),
        config(2, 3, 2),
        RecordingAction::default(),
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        StopSignal::new(),
    );

    let outcome = h.controller.run();

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.summary().completed, 6);
    let expected: Vec<StepId> = (1..=2)
        .flat_map(|phase| (1..=3).map(move |step| StepId::new(phase, step)))
        .collect();
    assert_eq!(h.action.calls(), expected);
    assert_eq!(*h.recorder.steps.lock().unwrap(), expected);

    let snap = snapshot(temp.path());
    assert_eq!(snap.completed_steps, 6);
    assert_eq!((snap.current_phase, snap.current_step), (3, 1));
    assert_eq!(snap.execution_status, ExecutionStatus::Stopped);
    assert!(temp.path().join(".nightshift/execution_context.json").exists());
}

#[test]
fn first_step_checkpoint_points_at_second_step() {
    let temp = TempDir::new().unwrap();
    let mut h = harness(
        temp.path(),
        config(2, 2, 1),
        RecordingAction::default(),
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        StopSignal::new(),
    );

    h.controller.restore();
    let done = h.controller.advance().unwrap();

    assert_eq!(done, StepId::first());
    let snap = snapshot(temp.path());
    assert_eq!(snap.current_phase, 1);
    assert_eq!(snap.current_step, 2);
    assert_eq!(snap.completed_steps, 1);
    assert_eq!(snap.execution_status, ExecutionStatus::Running);
}

#[test]
fn interrupted_run_resumes_where_it_stopped() {
    let temp = TempDir::new().unwrap();
    let stop = StopSignal::new();
    let action = RecordingAction {
        stop_after: Some((3, stop.clone())),
        ..Default::default()
    };
    let mut first = harness(
        temp.path(),
        config(2, 3, 5),
        action,
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        stop,
    );

    let outcome = first.controller.run();
    assert!(matches!(outcome, RunOutcome::Interrupted(_)));
    assert_eq!(outcome.exit_code(), 0);

    let snap = snapshot(temp.path());
    assert_eq!((snap.current_phase, snap.current_step), (2, 1));
    assert_eq!(snap.completed_steps, 3);
    assert_eq!(snap.execution_status, ExecutionStatus::Stopped);

    let mut second = harness(
        temp.path(),
        config(2, 3, 5),
        RecordingAction::default(),
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        StopSignal::new(),
    );
    let outcome = second.controller.run();

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.summary().executed, 3);
    assert_eq!(
        second.action.calls(),
        vec![StepId::new(2, 1), StepId::new(2, 2), StepId::new(2, 3)]
    );
    assert_eq!(snapshot(temp.path()).completed_steps, 6);
}

#[test]
fn finished_run_does_not_repeat_steps() {
    let temp = TempDir::new().unwrap();
    let mut first = harness(
        temp.path(),
        config(1, 2, 1),
        RecordingAction::default(),
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        StopSignal::new(),
    );
    first.controller.run();

    let mut again = harness(
        temp.path(),
        config(1, 2, 1),
        RecordingAction::default(),
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        StopSignal::new(),
    );
    let outcome = again.controller.run();

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert!(again.action.calls().is_empty());
}

#[test]
fn exhausted_retries_abort_without_advancing() {
    let temp = TempDir::new().unwrap();
    let mut h = harness(
        temp.path(),
        config(1, 3, 5),
        RecordingAction::default(),
        SelectiveValidator {
            reject: Some(StepId::new(1, 2)),
        },
        MemoryRecorder::default(),
        StopSignal::new(),
    );

    let outcome = h.controller.run();

    match &outcome {
        RunOutcome::Aborted { reason, .. } => assert!(reason.contains("left the build broken")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(outcome.exit_code(), 1);

    let attempts = h
        .action
        .calls()
        .iter()
        .filter(|id| **id == StepId::new(1, 2))
        .count();
    assert_eq!(attempts, 3);
    assert_eq!(h.recovery.calls.load(Ordering::SeqCst), 2);

    let snap = snapshot(temp.path());
    assert_eq!((snap.current_phase, snap.current_step), (1, 2));
    assert_eq!(snap.completed_steps, 1);
    assert_eq!(snap.execution_status, ExecutionStatus::Stopped);
}

#[test]
fn audit_failure_aborts_immediately() {
    let temp = TempDir::new().unwrap();
    let mut h = harness(
        temp.path(),
        config(1, 3, 5),
        RecordingAction::default(),
        SelectiveValidator::default(),
        MemoryRecorder {
            fail_on: Some(StepId::first()),
            ..Default::default()
        },
        StopSignal::new(),
    );

    let outcome = h.controller.run();

    assert!(matches!(outcome, RunOutcome::Aborted { .. }));
    assert_eq!(h.action.calls(), vec![StepId::first()]);
    assert_eq!(h.recovery.calls.load(Ordering::SeqCst), 0);
    assert_eq!(snapshot(temp.path()).completed_steps, 0);
}

#[test]
fn unhealthy_environment_aborts_before_first_step() {
    let temp = TempDir::new().unwrap();
    let action = Arc::new(RecordingAction::default());
    let mut controller = Controller::builder(temp.path(), config(1, 2, 1))
        .runner(Arc::new(HealthyRunner {
            status_error: Some("fatal: bad object HEAD"),
        }))
        .action(action.clone())
        .validator(Arc::new(SelectiveValidator::default()))
        .recorder(Arc::new(MemoryRecorder::default()))
        .build()
        .unwrap();

    let outcome = controller.run();

    assert_eq!(outcome.exit_code(), 1);
    assert!(action.calls().is_empty());
    assert_eq!(
        snapshot(temp.path()).execution_status,
        ExecutionStatus::Stopped
    );
}

#[test]
fn panic_in_step_still_persists_progress() {
    let temp = TempDir::new().unwrap();
    let action = RecordingAction {
        panic_on: Some(StepId::new(1, 2)),
        ..Default::default()
    };
    let mut h = harness(
        temp.path(),
        config(1, 3, 5),
        action,
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        StopSignal::new(),
    );

    let outcome = h.controller.run();

    match &outcome {
        RunOutcome::Aborted { reason, .. } => assert!(reason.contains("action blew up")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    let snap = snapshot(temp.path());
    assert_eq!(snap.completed_steps, 1);
    assert_eq!(snap.execution_status, ExecutionStatus::Stopped);
}

#[test]
fn invalid_configuration_is_rejected_before_running() {
    let temp = TempDir::new().unwrap();
    let mut bad = config(1, 2, 3);
    bad.execution.health_check_every = 3;

    let err = Controller::builder(temp.path(), bad).build().err().unwrap();
    assert!(matches!(err, NightshiftError::ConfigValidationError { .. }));
    assert!(!temp.path().join(".nightshift").exists());
}

fn counting_controller(root: &Path, runner: Arc<CountingRunner>) -> (Controller, Arc<RecordingAction>) {
    let mut config = config(2, 3, 1);
    config.execution.health_check_every = 2;
    let action = Arc::new(RecordingAction::default());
    let controller = Controller::builder(root, config)
        .runner(runner)
        .action(action.clone())
        .validator(Arc::new(SelectiveValidator::default()))
        .recovery(Arc::new(CountingRecovery::default()))
        .recorder(Arc::new(MemoryRecorder::default()))
        .build()
        .unwrap();
    (controller, action)
}

#[test]
fn health_probe_runs_before_start_and_every_m_completions() {
    let temp = TempDir::new().unwrap();
    let runner = Arc::new(CountingRunner::default());
    let (mut controller, action) = counting_controller(temp.path(), runner.clone());

    let outcome = controller.run();

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(action.calls().len(), 6);
    // Once up front, then after completions 2, 4 and 6.
    assert_eq!(runner.status_calls.load(Ordering::SeqCst), 4);
}

#[test]
fn failed_health_probe_at_cadence_aborts_with_progress_saved() {
    let temp = TempDir::new().unwrap();
    let runner = Arc::new(CountingRunner {
        fail_status_call: Some(2),
        ..Default::default()
    });
    let (mut controller, action) = counting_controller(temp.path(), runner.clone());

    let outcome = controller.run();

    match &outcome {
        RunOutcome::Aborted { reason, .. } => assert!(reason.contains("index file corrupt")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(action.calls().len(), 2);
    assert_eq!(runner.status_calls.load(Ordering::SeqCst), 2);

    let snap = snapshot(temp.path());
    assert_eq!(snap.completed_steps, 2);
    assert_eq!((snap.current_phase, snap.current_step), (1, 3));
    assert_eq!(snap.execution_status, ExecutionStatus::Stopped);
}

#[test]
fn unwritable_snapshot_does_not_stop_the_run() {
    let temp = TempDir::new().unwrap();
    // A directory where the temp snapshot goes makes every save fail,
    // regardless of the user the tests run as.
    std::fs::create_dir_all(temp.path().join(".nightshift/progress.json.tmp")).unwrap();
    let mut h = harness(
        temp.path(),
        config(1, 3, 1),
        RecordingAction::default(),
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        StopSignal::new(),
    );

    let outcome = h.controller.run();

    assert!(matches!(outcome, RunOutcome::Completed(_)));
    assert_eq!(outcome.summary().completed, 3);
    assert_eq!(h.action.calls().len(), 3);
    assert!(!temp.path().join(".nightshift/progress.json").exists());
}

#[test]
fn restore_resumes_a_stopped_snapshot_as_running() {
    let temp = TempDir::new().unwrap();
    let stop = StopSignal::new();
    let mut first = harness(
        temp.path(),
        config(1, 3, 1),
        RecordingAction {
            stop_after: Some((1, stop.clone())),
            ..Default::default()
        },
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        stop,
    );
    first.controller.run();
    assert_eq!(snapshot(temp.path()).execution_status, ExecutionStatus::Stopped);

    let mut second = harness(
        temp.path(),
        config(1, 3, 1),
        RecordingAction::default(),
        SelectiveValidator::default(),
        MemoryRecorder::default(),
        StopSignal::new(),
    );
    second.controller.restore();

    assert_eq!(second.controller.progress().current, StepId::new(1, 2));
    assert_eq!(second.controller.progress().status, ExecutionStatus::Running);
}
