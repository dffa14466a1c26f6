//! Conflict matrix tables on disk.

use std::path::Path;

use pem_core::{ConflictMatrix, load_and_validate_matrix};
use tracing::info;

use crate::error::{Result, StoreError};
use crate::util::{read_string, write_string};

/// Load the table at `path` and check it against the scenario's users.
pub fn read_matrix<S: AsRef<str>>(path: &Path, expected: &[S]) -> Result<ConflictMatrix> {
    let text = read_string(path)?;
    Ok(load_and_validate_matrix(&text, expected)?)
}

/// Write `matrix` as a table. An existing file is only replaced with `force`.
pub fn write_matrix(path: &Path, matrix: &ConflictMatrix, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(StoreError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    write_string(path, &matrix.to_table_string())?;
    info!(path = %path.display(), actors = matrix.len(), "wrote conflict matrix");
    Ok(())
}
