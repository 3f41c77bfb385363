//! Directory scanner for the AI Verify plugin registry.
//!
//! `aiverify-scan` turns a plugin directory that already passed validation
//! into registry records:
//!
//! - one hash record per component, keyed `{kind}:{pluginGid}:{cid}`,
//! - one index record per plugin, keyed `plugin:list:{gid}`,
//! - one project template document per template component, persisted
//!   through a [`ProjectTemplateService`].
//!
//! All registry writes of one plugin go out as a single atomic batch.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use aiverify_core::PluginMeta;
//! use aiverify_scan::{DirectoryScanner, StoreTemplateService};
//! use aiverify_store::MemoryStore;
//!
//! # async fn run() -> Result<(), aiverify_core::ScanError> {
//! let store = Arc::new(MemoryStore::new());
//! let templates = Arc::new(StoreTemplateService::new(store.clone()));
//! let scanner = DirectoryScanner::new(store, templates);
//!
//! let meta = PluginMeta::new("my.plugin", "My Plugin");
//! let plugin = scanner.scan("/srv/plugins/my.plugin".as_ref(), &meta).await?;
//! println!("{} components registered", plugin.component_ids.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use aiverify_scan::{DirectoryScanner, MemoryTemplateService};
//! # use aiverify_store::MemoryStore;
//! let scanner = DirectoryScanner::new(Arc::new(MemoryStore::new()), Arc::new(MemoryTemplateService::new()));
//! let mut progress_rx = scanner.subscribe();
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("{}: {} components", progress.plugin_gid, progress.components_scanned);
//!     }
//! });
//! ```

mod progress;
mod scanner;
mod template_service;

pub use progress::ScanProgress;
pub use scanner::DirectoryScanner;
pub use template_service::{MemoryTemplateService, ProjectTemplateService, StoreTemplateService};

// Re-export core types for convenience
pub use aiverify_core::{Plugin, PluginMeta, ScanError, TemplateDocument};
