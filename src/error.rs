use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a conversion. Every variant is fatal.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("cannot {action} {}: {source}", path.display())]
    File {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("key '{key}' not found in {}", path.display())]
    KeyNotFound { key: String, path: PathBuf },

    #[error("format error: {0}")]
    Format(String),

    #[error("usage error: {0}")]
    Usage(String),
}

impl ConvertError {
    pub fn file(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::File {
            action,
            path: path.into(),
            source,
        }
    }

    pub fn format(message: impl Into<String>) -> Self {
        ConvertError::Format(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
