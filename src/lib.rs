//! Nightshift - Resumable, unattended step orchestration.
//!
//! Nightshift drives a fixed grid of phases and steps against a workspace.
//! Each step is attempted, validated, recovered between attempts, and
//! recorded as a version-control commit. Progress is checkpointed so an
//! interrupted run resumes exactly where it stopped.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - Configuration loading, parsing, and validation
//! - [`error`] - Error types and result aliases
//! - [`runner`] - The step machine, its collaborators, and the run controller
//! - [`shell`] - Bounded-time shell command execution
//! - [`state`] - Execution progress, snapshots, and the context file
//! - [`steps`] - Step identifiers, labels, and actions
//! - [`workspace`] - Resolved paths and command templates for a root
//!
//! # Example
//!
//! ```
//! use nightshift::config::Layout;
//! use nightshift::steps::StepId;
//!
//! let layout = Layout { phases: 2, steps_per_phase: 3 };
//! assert_eq!(layout.next(StepId::new(1, 3)), StepId::new(2, 1));
//! assert_eq!(layout.total(), 6);
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod shell;
pub mod state;
pub mod steps;
pub mod workspace;

pub use error::{NightshiftError, Result};
