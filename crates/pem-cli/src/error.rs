use pem_core::PemError;
use pem_store::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIGURATION: i32 = 2;
pub const EXIT_ALIGNMENT: i32 = 3;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] PemError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("logging setup failed: {message}")]
    Logging { message: String },
}

impl CliError {
    /// Configuration and matrix errors exit 2, alignment errors 3, the rest 1.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        let engine = match self {
            Self::Engine(error) => Some(error),
            Self::Store(error) => error.engine(),
            Self::InvalidArgument { .. } => return EXIT_CONFIGURATION,
            _ => None,
        };
        match engine {
            Some(error) if error.is_alignment() => EXIT_ALIGNMENT,
            Some(error) if error.is_configuration() => EXIT_CONFIGURATION,
            _ => EXIT_FAILURE,
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Short machine-readable class for JSON error output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.exit_code() {
            EXIT_CONFIGURATION => "configuration",
            EXIT_ALIGNMENT => "alignment",
            _ => "failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pem_core::PemError;
    use pem_store::StoreError;

    use super::{CliError, EXIT_ALIGNMENT, EXIT_CONFIGURATION, EXIT_FAILURE};

    #[test]
    fn engine_errors_map_to_their_exit_codes() {
        let matrix = CliError::from(PemError::matrix("not square"));
        assert_eq!(matrix.exit_code(), EXIT_CONFIGURATION);
        assert_eq!(matrix.kind(), "configuration");

        let nested = CliError::from(StoreError::from(PemError::alignment("depth", "crs")));
        assert_eq!(nested.exit_code(), EXIT_ALIGNMENT);
    }

    #[test]
    fn plain_failures_exit_one() {
        let missing = CliError::from(StoreError::MissingPath {
            path: PathBuf::from("inputs/reference.asc"),
        });
        assert_eq!(missing.exit_code(), EXIT_FAILURE);
        assert_eq!(CliError::invalid("bad flag").exit_code(), EXIT_CONFIGURATION);
    }
}
