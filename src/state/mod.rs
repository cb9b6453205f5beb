//! Durable execution state.
//!
//! This module provides the progress snapshot that lets a run resume
//! exactly where it stopped, and the mission context file written beside it.

pub mod context;
pub mod progress;
pub mod store;

pub use context::ExecutionContext;
pub use progress::{ExecutionProgress, ExecutionStatus};
pub use store::{ProgressSnapshot, ProgressStore};
