//! Hierarchical key/value configuration store.

use std::path::Path;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    #[error("no value at {0}")]
    NotFound(String),
    #[error("value at {path} is not {expected}")]
    WrongType { path: String, expected: &'static str },
}

/// Lookup by dot-separated path, e.g. `cameras.west.streams.wide.hz`.
pub trait ParamStore {
    /// Names of the entries under `path`, or `None` if `path` does not exist
    /// or holds a plain value.
    fn subkeys(&self, path: &str) -> Option<Vec<String>>;

    fn num_subkeys(&self, path: &str) -> usize {
        self.subkeys(path).map(|keys| keys.len()).unwrap_or(0)
    }

    fn get_int(&self, path: &str) -> Result<i64, ParamError>;

    fn get_str(&self, path: &str) -> Result<String, ParamError>;
}

/// Store backed by a JSON document. Key order follows the document.
pub struct JsonParam {
    root: Value,
}

impl JsonParam {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::from_value(serde_json::from_str(&text)?))
    }

    fn lookup(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.root);
        }
        path.split('.')
            .try_fold(&self.root, |value, key| value.as_object()?.get(key))
    }
}

impl ParamStore for JsonParam {
    fn subkeys(&self, path: &str) -> Option<Vec<String>> {
        let object = self.lookup(path)?.as_object()?;
        Some(object.keys().cloned().collect())
    }

    fn get_int(&self, path: &str) -> Result<i64, ParamError> {
        let value = self
            .lookup(path)
            .ok_or_else(|| ParamError::NotFound(path.to_string()))?;
        value.as_i64().ok_or_else(|| ParamError::WrongType {
            path: path.to_string(),
            expected: "an integer",
        })
    }

    fn get_str(&self, path: &str) -> Result<String, ParamError> {
        let value = self
            .lookup(path)
            .ok_or_else(|| ParamError::NotFound(path.to_string()))?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ParamError::WrongType {
                path: path.to_string(),
                expected: "a string",
            })
    }
}
