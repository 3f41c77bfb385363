//! Outcome of a full plugin directory sweep.

use std::path::PathBuf;

use serde::Serialize;

/// A plugin directory the sweep could not register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepFailure {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-directory results of a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Gids registered, in directory order.
    pub installed: Vec<String>,
    pub failed: Vec<SweepFailure>,
}

impl SweepReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub(crate) fn fail(&mut self, path: impl Into<PathBuf>, reason: impl ToString) {
        self.failed.push(SweepFailure {
            path: path.into(),
            reason: reason.to_string(),
        });
    }
}
