//! Error types for Nightshift operations.
//!
//! This module defines [`NightshiftError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! Step-level failures are a separate type, [`crate::runner::StepFailure`],
//! because they carry a retry classification rather than an I/O cause.
//!
//! # Error Handling Strategy
//!
//! - Use `NightshiftError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `NightshiftError::Other`) for unexpected errors
//! - Persistence errors are logged by the caller, never escalated past a
//!   step that already succeeded

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Nightshift operations.
#[derive(Debug, Error)]
pub enum NightshiftError {
    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// Invalid configuration structure or values.
    #[error("Invalid configuration: {message}")]
    ConfigValidationError { message: String },

    /// A `${var}` reference that the interpolation context cannot satisfy.
    #[error("Unknown variable '{name}' in '{template}'")]
    UnknownVariable { name: String, template: String },

    /// The audit entry for a validated step could not be written.
    #[error("Audit record for {step} failed: {message}")]
    AuditFailed { step: String, message: String },

    /// A saved progress snapshot is not valid JSON of the expected shape.
    #[error("Failed to parse progress snapshot at {path}: {message}")]
    SnapshotParseError { path: PathBuf, message: String },

    /// The progress snapshot could not be written.
    #[error("Failed to persist progress to {path}: {message}")]
    PersistenceFailed { path: PathBuf, message: String },

    /// The periodic health probe found the environment unusable.
    #[error("Health check failed: {message}")]
    HealthCheckFailed { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Nightshift operations.
pub type Result<T> = std::result::Result<T, NightshiftError>;
