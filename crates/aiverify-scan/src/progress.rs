//! Scan progress reporting.

use std::path::PathBuf;
use std::time::Duration;

use aiverify_core::ComponentKind;

/// Progress information during a plugin scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Plugin being scanned.
    pub plugin_gid: String,
    /// Components turned into records so far.
    pub components_scanned: u64,
    /// Kind of the component just scanned.
    pub kind: Option<ComponentKind>,
    /// Metadata file just scanned.
    pub current_path: PathBuf,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Create initial progress state for a plugin.
    pub fn new(plugin_gid: impl Into<String>) -> Self {
        Self {
            plugin_gid: plugin_gid.into(),
            components_scanned: 0,
            kind: None,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
        }
    }

    /// Components per second.
    pub fn components_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.components_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }
}
