//! Configuration loading, parsing, and validation for Nightshift.
//!
//! - Schema definitions in [`schema`]
//! - File discovery and loading in [`loader`]
//! - Validation in [`validator`]
//! - Variable interpolation in [`interpolation`]
//!
//! # Example
//!
//! ```
//! use nightshift::config::{load_config, validate};
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let dir = temp.path().join(".nightshift");
//! fs::create_dir_all(&dir).unwrap();
//! fs::write(dir.join("config.yml"), "layout:\n  phases: 2\n  steps_per_phase: 5\n").unwrap();
//!
//! let config = load_config(temp.path(), None).unwrap();
//! validate(&config).unwrap();
//! assert_eq!(config.layout.steps_per_phase, 5);
//! ```

pub mod interpolation;
pub mod loader;
pub mod schema;
pub mod validator;

pub use interpolation::{resolve_string, InterpolationContext, KNOWN_VARIABLES};
pub use loader::{default_config, load_config, parse_config, ConfigPaths, CONFIG_DIR};
pub use schema::{
    CommandSettings, ExecutionSettings, FileSpec, Layout, Mission, NightshiftConfig,
    ScriptCommand, StepEntry, Timeouts, WorkspaceSettings,
};
pub use validator::{validate, validate_config, ValidationError};
