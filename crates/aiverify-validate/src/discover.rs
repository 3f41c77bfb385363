//! Discovery of component metadata files inside a plugin directory.

use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

use aiverify_core::manifest::META_SUFFIX;
use aiverify_core::ComponentKind;

/// Metadata files of one component kind, sorted by path.
///
/// Widgets, input blocks and templates keep their metadata directly in the
/// kind directory; algorithms keep one subdirectory per algorithm. A missing
/// kind directory yields no files.
pub fn component_manifests(plugin_dir: &Path, kind: ComponentKind) -> std::io::Result<Vec<PathBuf>> {
    let root = plugin_dir.join(kind.dir_name());
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let depth = match kind {
        ComponentKind::Algorithm => 2,
        _ => 1,
    };

    let walker = WalkDir::new(&root)
        .parallelism(Parallelism::Serial)
        .skip_hidden(true)
        .follow_links(false)
        .sort(true)
        .min_depth(depth)
        .max_depth(depth);

    let mut manifests = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|err| {
            let path = err.path().map(|p| p.display().to_string()).unwrap_or_default();
            std::io::Error::other(format!("{path}: {err}"))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(META_SUFFIX) {
            manifests.push(entry.path());
        }
    }
    manifests.sort();
    Ok(manifests)
}

/// Immediate subdirectories of the plugins root, sorted.
pub fn plugin_dirs(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() && !entry.file_name().to_string_lossy().starts_with('.') {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
