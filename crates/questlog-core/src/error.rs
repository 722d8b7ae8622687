//! Error types for Questlog
//!
//! The progression engine itself is total. These errors only surface at the
//! edges: config files, persisted snapshots and key parsing.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("snapshot error: {path} - {message}")]
    SnapshotError { path: String, message: String },

    #[error("unknown branch: {0}")]
    UnknownBranch(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn snapshot(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SnapshotError {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }
}
