//! Read-only settings tree, addressed by dot-separated key paths.
//!
//! The tree is loaded once and handed by reference to whatever needs it;
//! there is no process-global cache. Tests construct one directly from a
//! YAML string.

use std::path::Path;

use serde_yaml::Value;

/// Error loading or parsing the settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings file not found at {0}")]
    NotFound(String),

    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// An immutable nested key-value tree.
#[derive(Debug, Clone)]
pub struct Settings {
    root: Value,
}

impl Settings {
    /// Load from a YAML file on disk.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Err(SettingsError::NotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parse from a YAML string. Also the test-only override point.
    pub fn from_yaml(text: &str) -> Result<Self, SettingsError> {
        let root: Value = serde_yaml::from_str(text)?;
        Ok(Self { root })
    }

    /// An empty tree; every lookup misses.
    pub fn empty() -> Self {
        Self { root: Value::Null }
    }

    /// Resolve a dot-separated path through the tree.
    pub fn get(&self, dotted_key: &str) -> Option<&Value> {
        let mut node = &self.root;
        for part in dotted_key.split('.') {
            node = node.get(part)?;
        }
        Some(node)
    }

    /// Resolve a path to a string value.
    pub fn get_str(&self, dotted_key: &str) -> Option<&str> {
        self.get(dotted_key).and_then(Value::as_str)
    }

    /// Resolve a path to a string, falling back to a default.
    pub fn str_or(&self, dotted_key: &str, default: &str) -> String {
        self.get_str(dotted_key).unwrap_or(default).to_string()
    }
}
