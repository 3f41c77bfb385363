//! Recursive directory removal.

use std::fs;
use std::path::{Path, PathBuf};

use crate::OperationError;

/// Recursively remove a directory.
///
/// Returns `false` when there was nothing to remove.
pub async fn remove_dir(path: &Path) -> Result<bool, OperationError> {
    let target: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || match fs::remove_dir_all(&target) {
        Ok(()) => {
            tracing::debug!(target: "aiverify::ops", path = %target.display(), "directory removed");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(OperationError::new(&target, format!("Failed to remove: {e}"))),
    })
    .await
    .map_err(|e| OperationError::new(path, format!("Task failed: {e}")))?
}
