//! Path containment checks.

use std::path::{Component, Path, PathBuf};

use aiverify_core::ValidationError;

/// Lexically normalize a path: drop `.` and resolve `..` against earlier components.
///
/// Does not touch the filesystem, so symlinks are not followed.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Check that `path` stays inside `root` after normalization.
pub fn is_within(root: &Path, path: &Path) -> bool {
    normalize(path).starts_with(normalize(root))
}

/// Join `relative` onto `root`, rejecting absolute paths and escapes.
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf, ValidationError> {
    let rel = Path::new(relative);
    let traversal = || ValidationError::PathTraversal {
        path: PathBuf::from(relative),
    };

    if rel.is_absolute() || rel.has_root() {
        return Err(traversal());
    }
    let joined = normalize(&root.join(rel));
    if !joined.starts_with(normalize(root)) {
        return Err(traversal());
    }
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_resolve_within() {
        let root = Path::new("/plugins/p");
        assert_eq!(
            resolve_within(root, "widgets/data/sample.json").unwrap(),
            PathBuf::from("/plugins/p/widgets/data/sample.json")
        );
        assert_eq!(
            resolve_within(root, "widgets/../sample.json").unwrap(),
            PathBuf::from("/plugins/p/sample.json")
        );

        let err = resolve_within(root, "../../etc/passwd").unwrap_err();
        assert_eq!(err.to_string(), "Invalid data path: ../../etc/passwd");
        assert!(resolve_within(root, "/etc/passwd").is_err());
        assert!(resolve_within(root, "a/../../p2/x.json").is_err());
    }

    #[test]
    fn test_is_within() {
        let root = Path::new("/plugins");
        assert!(is_within(root, Path::new("/plugins/aiverify.stock.x")));
        assert!(!is_within(root, Path::new("/plugins/../etc")));
        assert!(!is_within(root, Path::new("/plugins-other/x")));
    }
}
