//! Moving a staged plugin directory into place.

use std::fs;
use std::path::{Path, PathBuf};

use crate::OperationError;

/// Options for move operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveOptions {
    /// Replace an existing destination instead of failing.
    pub overwrite: bool,
}

/// How the move was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveStrategy {
    /// Same-filesystem rename.
    Renamed,
    /// Recursive copy followed by removal of the source.
    Copied,
}

/// Result of a completed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub strategy: MoveStrategy,
    pub bytes: u64,
}

/// Move `source` to exactly `destination`.
///
/// Tries a rename first and falls back to copy plus delete when the rename
/// fails (for example across filesystems). The destination's parent is
/// created if needed.
pub async fn move_dir(
    source: &Path,
    destination: &Path,
    options: MoveOptions,
) -> Result<MoveOutcome, OperationError> {
    if destination.starts_with(source) {
        return Err(OperationError::new(destination, "Destination is inside the source directory"));
    }

    let source_owned = source.to_path_buf();
    let dest_owned = destination.to_path_buf();
    tokio::task::spawn_blocking(move || move_blocking(&source_owned, &dest_owned, options))
        .await
        .map_err(|e| OperationError::new(source, format!("Task failed: {e}")))?
}

fn move_blocking(source: &Path, dest: &Path, options: MoveOptions) -> Result<MoveOutcome, OperationError> {
    if !source.is_dir() {
        return Err(OperationError::new(source, "Source is not a directory"));
    }

    if dest.exists() {
        if same_file(source, dest) {
            return Err(OperationError::new(dest, "Source and destination are the same"));
        }
        if !options.overwrite {
            return Err(OperationError::new(dest, "Destination already exists"));
        }
        let removed = if dest.is_dir() {
            fs::remove_dir_all(dest)
        } else {
            fs::remove_file(dest)
        };
        removed.map_err(|e| OperationError::new(dest, format!("Failed to replace existing: {e}")))?;
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| OperationError::new(parent, format!("Failed to create destination: {e}")))?;
    }

    let bytes = dir_size(source);

    // Fast path for same filesystem.
    if fs::rename(source, dest).is_ok() {
        return Ok(MoveOutcome {
            strategy: MoveStrategy::Renamed,
            bytes,
        });
    }

    copy_dir_recursive(source, dest)?;
    fs::remove_dir_all(source)
        .map_err(|e| OperationError::new(source, format!("Failed to remove source: {e}")))?;
    Ok(MoveOutcome {
        strategy: MoveStrategy::Copied,
        bytes,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn dir_size(dir: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                size += dir_size(&path);
            } else if let Ok(metadata) = fs::metadata(&path) {
                size += metadata.len();
            }
        }
    }
    size
}

/// Recursively copy a directory.
pub(crate) fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<(), OperationError> {
    fs::create_dir_all(dest).map_err(|e| OperationError::new(dest, format!("Failed to create directory: {e}")))?;

    let entries = fs::read_dir(source).map_err(|e| OperationError::new(source, format!("Failed to read directory: {e}")))?;
    for entry in entries {
        let entry = entry.map_err(|e| OperationError::new(source, format!("Failed to read entry: {e}")))?;
        let path: PathBuf = entry.path();
        let dest_path = dest.join(entry.file_name());

        if path.is_dir() {
            copy_dir_recursive(&path, &dest_path)?;
        } else {
            fs::copy(&path, &dest_path).map_err(|e| OperationError::new(&path, format!("Failed to copy file: {e}")))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn staged(root: &Path) -> PathBuf {
        let dir = root.join("staging/plugin");
        fs::create_dir_all(dir.join("widgets")).unwrap();
        fs::write(dir.join("plugin.meta.json"), "{}").unwrap();
        fs::write(dir.join("widgets/a.mdx"), "# A").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_move_dir_renames() {
        let temp = TempDir::new().unwrap();
        let source = staged(temp.path());
        let dest = temp.path().join("plugins/my.plugin");

        let outcome = move_dir(&source, &dest, MoveOptions::default()).await.unwrap();
        assert_eq!(outcome.strategy, MoveStrategy::Renamed);
        assert_eq!(outcome.bytes, 5);
        assert!(!source.exists());
        assert_eq!(fs::read_to_string(dest.join("widgets/a.mdx")).unwrap(), "# A");
    }

    #[tokio::test]
    async fn test_move_dir_respects_overwrite() {
        let temp = TempDir::new().unwrap();
        let source = staged(temp.path());
        let dest = temp.path().join("plugins/my.plugin");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), "old").unwrap();

        assert!(move_dir(&source, &dest, MoveOptions::default()).await.is_err());
        assert!(source.exists());

        move_dir(&source, &dest, MoveOptions { overwrite: true }).await.unwrap();
        assert!(!dest.join("stale.txt").exists());
        assert!(dest.join("plugin.meta.json").exists());
    }

    #[tokio::test]
    async fn test_move_into_itself_rejected() {
        let temp = TempDir::new().unwrap();
        let source = staged(temp.path());
        let err = move_dir(&source, &source.join("nested"), MoveOptions::default())
            .await
            .unwrap_err();
        assert!(err.message.contains("inside the source"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_move_onto_itself_keeps_source() {
        let temp = TempDir::new().unwrap();
        let source = staged(temp.path());
        let alias = temp.path().join("alias");
        std::os::unix::fs::symlink(&source, &alias).unwrap();

        let err = move_dir(&source, &alias, MoveOptions { overwrite: true })
            .await
            .unwrap_err();
        assert!(err.message.contains("same"));
        assert!(source.join("plugin.meta.json").exists());
    }

    #[test]
    fn test_copy_dir_recursive() {
        let temp = TempDir::new().unwrap();
        let source = staged(temp.path());
        let dest = temp.path().join("copy");

        copy_dir_recursive(&source, &dest).unwrap();
        assert!(source.exists());
        assert_eq!(fs::read_to_string(dest.join("widgets/a.mdx")).unwrap(), "# A");
    }
}
