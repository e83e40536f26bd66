use std::path::{Path, PathBuf};

/// Shared error type used across all tierguard crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A state file exists but cannot be read or does not match its schema.
    #[error("storage {}: {message}", .path.display())]
    Storage { path: PathBuf, message: String },

    #[error("unknown tier/operation: {0}")]
    UnknownCounter(String),

    #[error("unknown switch: {0}")]
    UnknownSwitch(String),

    #[error("lock: {0}")]
    Lock(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn storage(path: &Path, message: impl Into<String>) -> Self {
        Self::Storage {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// True for errors that mean "the persisted state is corrupt", as opposed
    /// to "the filesystem refused us".
    pub fn is_corrupt_state(&self) -> bool {
        matches!(self, Self::Storage { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
