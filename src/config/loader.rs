//! Configuration file discovery and loading.
//!
//! A root may carry `.nightshift/config.yml` and an uncommitted
//! `.nightshift/config.local.yml` overlay. Without a project config the
//! embedded default is used.

use crate::config::schema::NightshiftConfig;
use crate::error::{NightshiftError, Result};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration embedded in the binary.
pub const DEFAULT_CONFIG: &str = include_str!("default.yml");

/// Name of the per-root configuration directory.
pub const CONFIG_DIR: &str = ".nightshift";

/// Paths to configuration files in merge order (later overrides earlier).
#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Project config: .nightshift/config.yml
    pub project: Option<PathBuf>,

    /// Local overrides: .nightshift/config.local.yml
    pub project_local: Option<PathBuf>,
}

impl ConfigPaths {
    /// Discover config files for the given root.
    pub fn discover(root: &Path) -> Self {
        let existing = |name: &str| {
            let path = root.join(CONFIG_DIR).join(name);
            path.exists().then_some(path)
        };

        Self {
            project: existing("config.yml"),
            project_local: existing("config.local.yml"),
        }
    }

    /// Returns all existing config paths in merge order.
    pub fn all_existing(&self) -> Vec<&PathBuf> {
        self.project.iter().chain(self.project_local.iter()).collect()
    }
}

/// Deep merge two YAML values.
///
/// Mappings merge recursively, sequences and scalars are replaced, and a
/// null in the overlay deletes the key.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            let mut result = base_map.clone();
            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    result.remove(key);
                } else if let Some(base_value) = base_map.get(key) {
                    result.insert(key.clone(), deep_merge(base_value, overlay_value));
                } else {
                    result.insert(key.clone(), overlay_value.clone());
                }
            }
            Value::Mapping(result)
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Parse YAML content into a config.
pub fn parse_config(content: &str, source_path: &Path) -> Result<NightshiftConfig> {
    serde_yaml::from_str(content).map_err(|e| NightshiftError::ConfigParseError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// The embedded default configuration.
pub fn default_config() -> Result<NightshiftConfig> {
    parse_config(DEFAULT_CONFIG, Path::new("<builtin>"))
}

fn load_config_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            NightshiftError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            NightshiftError::Io(e)
        }
    })?;

    serde_yaml::from_str(&content).map_err(|e| NightshiftError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load configuration for a root.
///
/// With `config_override`, only that file is read (it must exist).
/// Otherwise the project config and local overlay are merged; with neither
/// present, the embedded default is returned.
pub fn load_config(root: &Path, config_override: Option<&Path>) -> Result<NightshiftConfig> {
    if let Some(path) = config_override {
        let value = load_config_value(path)?;
        return from_value(value, path);
    }

    let paths = ConfigPaths::discover(root);
    if paths.project.is_none() && paths.project_local.is_none() {
        tracing::debug!("No config under {}, using built-in default", root.display());
        return default_config();
    }

    // A lone local overlay applies on top of the built-in default.
    let mut merged = if paths.project.is_none() {
        serde_yaml::from_str(DEFAULT_CONFIG).map_err(|e| NightshiftError::ConfigParseError {
            path: PathBuf::from("<builtin>"),
            message: e.to_string(),
        })?
    } else {
        Value::Mapping(Default::default())
    };

    for path in paths.all_existing() {
        merged = deep_merge(&merged, &load_config_value(path)?);
    }

    from_value(merged, &root.join(CONFIG_DIR).join("config.yml"))
}

fn from_value(value: Value, path: &Path) -> Result<NightshiftConfig> {
    // An empty file parses as null.
    let value = if value.is_null() {
        Value::Mapping(Default::default())
    } else {
        value
    };
    serde_yaml::from_value(value).map_err(|e| NightshiftError::ConfigParseError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
