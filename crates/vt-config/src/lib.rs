//! vt-config: on-disk configuration document for variable trees.
//!
//! A configuration is a flat mapping of dotted variable paths to
//! display-form values, e.g. `prbsTx.txSize: "1000"`. Keeping values in
//! display form means a file can be written and edited by hand with the same
//! text an operator would type into a control surface; the tree applies each
//! entry through the variable's own codec on load.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat map of dotted variable paths to display-form values.
///
/// `BTreeMap` keeps serialization deterministic and the apply order stable
/// (lexicographic over dotted paths, which groups each device's variables
/// together, parents before their subtrees).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDoc {
    values: BTreeMap<String, String>,
}

impl ConfigDoc {
    /// Empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display-form value for a dotted path.
    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<String>) {
        self.values.insert(path.into(), value.into());
    }

    /// Display-form value for a dotted path.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.values.get(path).map(String::as_str)
    }

    /// Path/value pairs in lexicographic path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(p, v)| (p.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the document is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub fn load_yaml(path: &Path) -> ConfigResult<ConfigDoc> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

pub fn save_yaml(path: &Path, doc: &ConfigDoc) -> ConfigResult<()> {
    let content = serde_yaml::to_string(doc)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ConfigResult<ConfigDoc> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_json(path: &Path, doc: &ConfigDoc) -> ConfigResult<()> {
    let content = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigDoc {
        let mut doc = ConfigDoc::new();
        doc.insert("prbsTx.txSize", "1000");
        doc.insert("prbsTx.txEnable", "True");
        doc.insert("runControl.runRate", "10 Hz");
        doc
    }

    #[test]
    fn iteration_is_path_ordered() {
        let doc = sample();
        let paths: Vec<_> = doc.iter().map(|(p, _)| p).collect();
        assert_eq!(
            paths,
            ["prbsTx.txEnable", "prbsTx.txSize", "runControl.runRate"]
        );
    }

    #[test]
    fn yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yml");
        let doc = sample();
        save_yaml(&path, &doc).unwrap();
        assert_eq!(load_yaml(&path).unwrap(), doc);
    }

    #[test]
    fn json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let doc = sample();
        save_json(&path, &doc).unwrap();
        assert_eq!(load_json(&path).unwrap(), doc);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_yaml(Path::new("/nonexistent/settings.yml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
