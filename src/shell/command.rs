//! Bounded-time shell command execution.
//!
//! Every invocation carries a timeout. A timeout, a spawn failure and a
//! non-zero exit are all reported the same way: as an unsuccessful
//! [`CommandResult`], never as an error.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};
use wait_timeout::ChildExt;

/// Result of executing a shell command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal, timed out, or never started).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error, or a synthetic message for timeouts and spawn errors.
    pub stderr: String,

    /// Execution duration.
    pub duration: Duration,

    /// Whether command succeeded (exit code 0).
    pub success: bool,

    /// Whether the timeout expired.
    pub timed_out: bool,
}

impl CommandResult {
    /// Create a success result.
    pub fn success(stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            exit_code: Some(0),
            stdout,
            stderr,
            duration,
            success: true,
            timed_out: false,
        }
    }

    /// Create a failure result.
    pub fn failure(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            duration,
            success: false,
            timed_out: false,
        }
    }

    /// Create a timeout result.
    pub fn timeout(timeout: Duration, stdout: String, duration: Duration) -> Self {
        Self {
            exit_code: None,
            stdout,
            stderr: format!("Command timed out after {}s", timeout.as_secs()),
            duration,
            success: false,
            timed_out: true,
        }
    }
}

/// Executes external commands on behalf of the orchestrator.
///
/// Implementations must not panic and must honor the timeout; the
/// orchestrator treats every outcome as data.
pub trait CommandRunner: Send + Sync {
    /// Run `command` through the shell in `cwd`, giving up after `timeout`.
    fn run(&self, command: &str, timeout: Duration, cwd: &Path) -> CommandResult;
}

/// Runs commands through the platform shell.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, timeout: Duration, cwd: &Path) -> CommandResult {
        info!("Executing: {}", command);
        let result = execute(command, timeout, cwd);

        if result.success {
            info!("Command succeeded: {}", command);
        } else if result.timed_out {
            error!("Command timed out after {}s: {}", timeout.as_secs(), command);
        } else {
            error!("Command failed: {}", command);
            error!("Error output: {}", result.stderr.trim_end());
        }

        result
    }
}

/// Execute a shell command, killing it when `timeout` expires.
pub fn execute(command: &str, timeout: Duration, cwd: &Path) -> CommandResult {
    let start = Instant::now();

    let mut cmd = shell_command(command);
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    isolate(&mut cmd);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return CommandResult::failure(None, String::new(), e.to_string(), start.elapsed());
        }
    };

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => Some(status),
        Ok(None) => {
            warn!("Command timed out, killing process group: {}", command);
            terminate(&mut child);
            None
        }
        Err(e) => {
            debug!("Failed to wait for '{}': {}", command, e);
            terminate(&mut child);
            let stdout = stdout.join().unwrap_or_default();
            return CommandResult::failure(None, stdout, e.to_string(), start.elapsed());
        }
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();
    let duration = start.elapsed();

    match status {
        Some(status) if status.success() => CommandResult::success(stdout, stderr, duration),
        Some(status) => CommandResult::failure(status.code(), stdout, stderr, duration),
        None => CommandResult::timeout(timeout, stdout, duration),
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn shell_command(command: &str) -> Command {
    if cfg!(target_os = "windows") {
        let shell = std::env::var("COMSPEC").unwrap_or_else(|_| "cmd.exe".to_string());
        let mut cmd = Command::new(shell);
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("/bin/sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

/// Put the child in its own process group so a timeout can kill the
/// whole pipeline, not just the shell.
#[cfg(unix)]
fn isolate(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn isolate(_cmd: &mut Command) {}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    if let Ok(pid) = i32::try_from(child.id()) {
        // SAFETY: signalling a process group we created; no memory is touched.
        unsafe {
            libc::kill(-pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
