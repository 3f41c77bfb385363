//! Plugin lifecycle manager for the AI Verify plugin registry.
//!
//! [`PluginManager`] is the only writer of the registry. It moves plugins
//! through their states:
//!
//! ```text
//! absent -> staged -> validated -> installed -> (updated)* -> deleted
//! ```
//!
//! - **install** validates a staged directory, moves it under the plugins
//!   root, scans it into the registry and announces its algorithms on the
//!   `algo.install` / `algo.update` channels,
//! - **delete** removes a plugin's records as one batch, its project
//!   templates and its directory, announcing `algo.delete`,
//! - **get_all** reads the whole registry and derives widget dependency
//!   status from that snapshot,
//! - **sweep** registers every plugin directory already on disk and reports
//!   per-directory failures.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use aiverify_core::PortalConfig;
//! use aiverify_plugin::PluginManager;
//! use aiverify_store::{MemoryPublisher, MemoryStore};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), aiverify_core::PluginError> {
//! let config = PortalConfig::new("/srv/aiverify/plugins");
//! let manager = PluginManager::from_config(
//!     config,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(MemoryPublisher::new()),
//!     CancellationToken::new(),
//! )?;
//!
//! let plugin = manager.install("/tmp/staging/my-plugin".as_ref()).await?;
//! let registry = manager.get_all(true).await?;
//! println!("{} installed, {} plugins total", plugin.gid(), registry.plugins.len());
//! # Ok(())
//! # }
//! ```

mod locks;
mod manager;
mod sweep;

pub use locks::GidLocks;
pub use manager::{PluginManager, RegistryEntry};
pub use sweep::{SweepFailure, SweepReport};
