use std::path::PathBuf;

use pem_core::PemError;
use pem_core::config::EngineConfigError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("engine config: {0}")]
    EngineConfig(#[from] EngineConfigError),

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("required path does not exist: {path}")]
    MissingPath { path: PathBuf },

    #[error("refusing to overwrite existing file: {path}")]
    AlreadyExists { path: PathBuf },

    #[error(transparent)]
    Engine(#[from] PemError),
}

impl StoreError {
    #[must_use]
    pub fn parse(path: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            line,
            message: message.into(),
        }
    }

    /// The engine error inside, if any.
    #[must_use]
    pub fn engine(&self) -> Option<&PemError> {
        match self {
            Self::Engine(error) => Some(error),
            _ => None,
        }
    }
}
