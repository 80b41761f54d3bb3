use crate::error::{ConvertError, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A parsed JSON sidecar. Only its top-level keys are addressable.
#[derive(Debug, Clone)]
pub struct Document {
    path: PathBuf,
    root: Map<String, Value>,
}

impl Document {
    /// Read and parse the JSON file at `path`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::file("read", path, e))?;
        debug!(path = %path.display(), bytes = text.len(), "read input document");
        Self::parse(path, &text)
    }

    /// Parse `text` as the contents of `path`
    pub fn parse<P: AsRef<Path>>(path: P, text: &str) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let value: Value = serde_json::from_str(text).map_err(|e| ConvertError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;

        match value {
            Value::Object(root) => Ok(Document { path, root }),
            other => Err(ConvertError::Parse {
                path,
                message: format!("top level is {}, expected an object", kind_name(&other)),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// Look up a top-level key. A missing key is always an error.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.root.get(key).ok_or_else(|| self.missing(key))
    }

    /// Remove and return the value under a top-level key
    pub fn take(mut self, key: &str) -> Result<Value> {
        match self.root.remove(key) {
            Some(value) => {
                debug!(key, kind = kind_name(&value), "extracted value");
                Ok(value)
            }
            None => Err(self.missing(key)),
        }
    }

    fn missing(&self, key: &str) -> ConvertError {
        ConvertError::KeyNotFound {
            key: key.to_string(),
            path: self.path.clone(),
        }
    }
}

pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
