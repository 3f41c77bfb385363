//! Per-gid serialization of lifecycle operations.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Named async mutexes keyed by plugin gid.
///
/// Holding the guard for a gid excludes every other install, delete or
/// sweep of that gid. Different gids never contend.
#[derive(Debug, Default)]
pub struct GidLocks {
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GidLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `gid`.
    pub async fn acquire(&self, gid: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            // Entries only referenced by the map are idle.
            inflight.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(
                inflight
                    .entry(gid.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Number of gids currently tracked.
    pub async fn tracked(&self) -> usize {
        self.inflight.lock().await.len()
    }
}
