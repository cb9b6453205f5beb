//! Shell command execution with per-call timeouts.

pub mod command;

pub use command::{execute, CommandResult, CommandRunner, ShellRunner};
