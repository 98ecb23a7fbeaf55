//! # Environment Configuration
//!
//! Loads one YAML document per environment (`qa.yaml`, `uat.yaml`, ...) into
//! an immutable value tree and answers dot-separated key-path lookups
//! (`api.base_url`). Missing paths fall back to caller-supplied defaults;
//! a missing file fails fast.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};

/// Read-only view over the configuration of a single environment.
#[derive(Debug, Clone)]
pub struct Config {
    environment: String,
    root: Value,
}

impl Config {
    /// Load `<dir>/<environment>.yaml`, parsed exactly once.
    pub fn load(dir: impl AsRef<Path>, environment: &str) -> Result<Self> {
        let path = dir.as_ref().join(format!("{environment}.yaml"));
        Self::load_file(&path, environment)
    }

    pub fn load_file(path: &Path, environment: &str) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|_| Error::ConfigMissing {
            path: PathBuf::from(path),
        })?;
        let root: Value =
            serde_yaml::from_str(&text).map_err(|err| Error::ConfigInvalid {
                context: path.display().to_string(),
                reason: err.to_string(),
            })?;
        Ok(Self {
            environment: environment.to_string(),
            root,
        })
    }

    /// Build a view directly from an in-memory tree. Used by tests and by
    /// harnesses that assemble configuration programmatically.
    pub fn from_value(environment: &str, root: Value) -> Self {
        Self {
            environment: environment.to_string(),
            root,
        }
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Walk a dot-separated path through nested mappings. Returns `None`
    /// when any segment is absent or the walk hits a non-mapping.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, path: &str, default: &str) -> String {
        self.get(path)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    }

    pub fn get_u64(&self, path: &str, default: u64) -> u64 {
        self.get(path).and_then(Value::as_u64).unwrap_or(default)
    }

    pub fn get_f64(&self, path: &str, default: f64) -> f64 {
        self.get(path).and_then(Value::as_f64).unwrap_or(default)
    }

    pub fn get_bool(&self, path: &str, default: bool) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(default)
    }

    /// Flatten a mapping of scalars into string pairs (default headers).
    /// Non-string scalars are rendered through their JSON form.
    pub fn get_string_map(&self, path: &str) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(object) = self.get(path).and_then(Value::as_object) {
            for (key, value) in object {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                map.insert(key.clone(), rendered);
            }
        }
        map
    }
}
