//! Plugin lifecycle: install, update, delete and registry reads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use strum::IntoEnumIterator;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use aiverify_core::{
    satisfies, Component, ComponentKind, Plugin, PluginError, PluginMeta, PortalConfig,
    RegistryKey, Registry, ReportWidget, WidgetStatus,
};
use aiverify_ops::{move_dir, remove_dir, MoveOptions, OperationError};
use aiverify_scan::{DirectoryScanner, ProjectTemplateService, StoreTemplateService};
use aiverify_store::record::{self, MTIME};
use aiverify_store::{AlgoEvent, Notification, Publisher, RegistryStore, StoreBatch};
use aiverify_validate::discover;
use aiverify_validate::paths::normalize;
use aiverify_validate::PluginValidator;

use crate::locks::GidLocks;
use crate::sweep::SweepReport;

/// Result of a lookup by gid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RegistryEntry {
    Plugin(Plugin),
    Component(Component),
}

/// Owns every write to the plugin registry.
///
/// Installs and deletes of the same gid are serialized; different gids
/// proceed concurrently.
pub struct PluginManager {
    config: PortalConfig,
    store: Arc<dyn RegistryStore>,
    publisher: Arc<dyn Publisher>,
    templates: Arc<dyn ProjectTemplateService>,
    validator: PluginValidator,
    scanner: DirectoryScanner,
    locks: GidLocks,
    init: Mutex<()>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager")
            .field("plugin_root", &self.config.plugin_root)
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

fn fs_error(err: OperationError) -> PluginError {
    PluginError::Filesystem {
        path: err.path,
        message: err.message,
    }
}

impl PluginManager {
    /// Create a manager from explicit collaborators.
    pub fn new(
        config: PortalConfig,
        store: Arc<dyn RegistryStore>,
        publisher: Arc<dyn Publisher>,
        templates: Arc<dyn ProjectTemplateService>,
        validator: PluginValidator,
    ) -> Self {
        let scanner = DirectoryScanner::new(Arc::clone(&store), Arc::clone(&templates));
        Self {
            config,
            store,
            publisher,
            templates,
            validator,
            scanner,
            locks: GidLocks::new(),
            init: Mutex::new(()),
        }
    }

    /// Create a manager whose validators and template service follow `config`.
    ///
    /// `cancel` aborts running content checks.
    pub fn from_config(
        config: PortalConfig,
        store: Arc<dyn RegistryStore>,
        publisher: Arc<dyn Publisher>,
        cancel: CancellationToken,
    ) -> Result<Self, PluginError> {
        let validator = PluginValidator::from_config(&config, cancel)?;
        let templates: Arc<dyn ProjectTemplateService> = Arc::new(StoreTemplateService::new(Arc::clone(&store)));
        Ok(Self::new(config, store, publisher, templates, validator))
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Subscribe to progress of the scans this manager runs.
    pub fn scanner(&self) -> &DirectoryScanner {
        &self.scanner
    }

    /// Install directory of `gid`.
    ///
    /// Rejects gids that do not name a single directory directly under the
    /// plugins root.
    pub fn plugin_path(&self, gid: &str) -> Result<PathBuf, PluginError> {
        let invalid = || PluginError::InvalidGid { gid: gid.to_string() };
        let root = normalize(&self.config.plugin_root);
        let target = normalize(&root.join(gid));

        if gid.is_empty() || target.parent() != Some(root.as_path()) {
            return Err(invalid());
        }
        Ok(target)
    }

    /// Validate a plugin directory without touching the registry.
    pub async fn validate(&self, dir: &Path) -> Result<PluginMeta, PluginError> {
        Ok(self.validator.validate(dir).await?)
    }

    /// Install or update the plugin staged at `staging`.
    ///
    /// An existing plugin with the same gid is superseded: its records are
    /// removed without delete notifications, and every algorithm of the new
    /// version is announced as `algo.update` if the old version had it,
    /// `algo.install` otherwise. Algorithms the new version dropped are
    /// announced as `algo.delete`.
    pub async fn install(&self, staging: &Path) -> Result<Plugin, PluginError> {
        let meta = self.validator.validate(staging).await?;
        let target = self.plugin_path(&meta.gid)?;
        let _guard = self.locks.acquire(&meta.gid).await;

        let in_place = same_dir(staging, &target).await;
        let previous = record::fetch_index(self.store.as_ref(), &meta.gid).await?;
        if let Some(previous) = &previous {
            tracing::info!(
                target: "aiverify::lifecycle",
                gid = %meta.gid,
                from = %previous.meta.version,
                to = %meta.version,
                "updating plugin"
            );
            self.remove_records(previous, false).await?;
            if !in_place {
                remove_dir(&target).await.map_err(fs_error)?;
            }
        }

        if !in_place {
            let moved = move_dir(staging, &target, MoveOptions { overwrite: true })
                .await
                .map_err(fs_error)?;
            tracing::debug!(
                target: "aiverify::lifecycle",
                gid = %meta.gid,
                strategy = ?moved.strategy,
                bytes = moved.bytes,
                "plugin directory moved into place"
            );
        }

        let mut plugin = match self.scanner.scan(&target, &meta).await {
            Ok(plugin) => plugin,
            Err(e) => {
                if !in_place {
                    if let Err(cleanup) = remove_dir(&target).await {
                        tracing::warn!(target: "aiverify::lifecycle", gid = %meta.gid, error = %cleanup, "failed to remove plugin directory after scan failure");
                    }
                }
                return Err(e.into());
            }
        };
        plugin.is_stock = self.config.is_stock(&meta.gid);

        let previous_algos = previous
            .as_ref()
            .map(|p| p.component_ids.algorithms.clone())
            .unwrap_or_default();
        for cid in &plugin.component_ids.algorithms {
            let event = if previous_algos.contains(cid) {
                AlgoEvent::Update
            } else {
                AlgoEvent::Install
            };
            self.notify(event, &meta.gid, cid).await;
        }
        for cid in previous_algos
            .iter()
            .filter(|cid| !plugin.component_ids.algorithms.contains(*cid))
        {
            self.notify(AlgoEvent::Delete, &meta.gid, cid).await;
        }

        tracing::info!(
            target: "aiverify::lifecycle",
            gid = %meta.gid,
            version = %meta.version,
            components = plugin.component_ids.len(),
            "plugin installed"
        );
        Ok(plugin)
    }

    /// Delete a plugin, its component records and its directory.
    ///
    /// With `publish` set, an `algo.delete` notification goes out per
    /// algorithm. A failure to remove the directory is logged; the registry
    /// stays authoritative.
    pub async fn delete(&self, gid: &str, publish: bool) -> Result<Plugin, PluginError> {
        let target = self.plugin_path(gid)?;
        let _guard = self.locks.acquire(gid).await;

        let plugin = record::fetch_index(self.store.as_ref(), gid)
            .await?
            .ok_or_else(|| PluginError::InvalidGid { gid: gid.to_string() })?;
        self.remove_records(&plugin, publish).await?;

        if let Err(e) = remove_dir(&target).await {
            tracing::warn!(target: "aiverify::lifecycle", gid = %gid, error = %e, "plugin records removed but directory remains");
        }
        tracing::info!(target: "aiverify::lifecycle", gid = %gid, "plugin deleted");
        Ok(plugin)
    }

    /// Remove a plugin's component records and index in one batch, then its
    /// project templates.
    ///
    /// Only the batch can fail the call. Template removal failures are
    /// logged and the notifications still go out.
    async fn remove_records(&self, plugin: &Plugin, publish: bool) -> Result<(), PluginError> {
        let gid = plugin.gid();
        let mut template_ids = Vec::new();
        for cid in &plugin.component_ids.templates {
            let key = RegistryKey::component(ComponentKind::Template, gid, cid).to_string();
            if let Some(id) = self.store.hash_get(&key, record::TEMPLATE_ID).await? {
                template_ids.push(id);
            }
        }

        let mut batch = StoreBatch::new();
        for kind in ComponentKind::iter() {
            for cid in plugin.component_ids.get(kind) {
                batch.delete(&RegistryKey::component(kind, gid, cid));
            }
        }
        batch.delete(&RegistryKey::plugin_index(gid));
        self.store.execute(batch).await?;

        // The registry no longer references these templates, so a failed
        // delete only leaves an orphaned document behind.
        for id in &template_ids {
            if let Err(e) = self.templates.delete(id).await {
                tracing::warn!(target: "aiverify::lifecycle", gid = %gid, template = %id, error = %e, "failed to remove project template");
            }
        }
        if publish {
            for cid in &plugin.component_ids.algorithms {
                self.notify(AlgoEvent::Delete, gid, cid).await;
            }
        }
        Ok(())
    }

    async fn notify(&self, event: AlgoEvent, plugin_gid: &str, cid: &str) {
        let key = RegistryKey::component(ComponentKind::Algorithm, plugin_gid, cid).to_string();
        let notification = Notification::new(event, key);
        if let Err(e) = self.publisher.publish(&notification).await {
            tracing::warn!(target: "aiverify::lifecycle", channel = %event, key = %notification.key, error = %e, "notification not published");
        }
    }

    /// Read the whole registry.
    ///
    /// Runs first-time initialization if needed. With `populate`, every
    /// listed component is fetched and widget dependency status is derived
    /// from this snapshot.
    pub async fn get_all(&self, populate: bool) -> Result<Registry, PluginError> {
        self.ensure_initialized().await?;

        let gids = record::plugin_gids(self.store.as_ref()).await?;
        let loaded = try_join_all(gids.iter().map(|gid| self.load_plugin(gid, populate))).await?;
        let plugins = loaded.into_iter().flatten().collect();
        Ok(Registry::from_plugins(plugins, self.config.stock_plugins.clone()))
    }

    /// Look up a plugin or a component by gid.
    ///
    /// Widget dependency status is derived from the current registry.
    pub async fn get_by_gid(&self, gid: &str) -> Result<Option<RegistryEntry>, PluginError> {
        if let Some(mut plugin) = self.load_plugin(gid, true).await? {
            for widget in &mut plugin.report_widgets {
                self.resolve_widget(widget).await?;
            }
            return Ok(Some(RegistryEntry::Plugin(plugin)));
        }
        match record::find_component(self.store.as_ref(), gid).await? {
            Some(Component::ReportWidget(mut widget)) => {
                self.resolve_widget(&mut widget).await?;
                Ok(Some(RegistryEntry::Component(Component::ReportWidget(widget))))
            }
            Some(component) => Ok(Some(RegistryEntry::Component(component))),
            None => Ok(None),
        }
    }

    /// Look up an installed plugin by gid.
    pub async fn get_plugin(&self, gid: &str, populate: bool) -> Result<Option<Plugin>, PluginError> {
        self.load_plugin(gid, populate).await
    }

    async fn load_plugin(&self, gid: &str, populate: bool) -> Result<Option<Plugin>, PluginError> {
        let Some(mut plugin) = record::fetch_index(self.store.as_ref(), gid).await? else {
            return Ok(None);
        };
        plugin.is_stock = self.config.is_stock(gid);
        if populate {
            record::populate(self.store.as_ref(), &mut plugin).await?;
        }
        Ok(Some(plugin))
    }

    async fn resolve_widget(&self, widget: &mut ReportWidget) -> Result<(), PluginError> {
        let mut all_valid = true;
        for dep in &mut widget.dependencies {
            let target = record::find_component(self.store.as_ref(), &dep.gid).await?;
            dep.valid = target.is_some_and(|c| satisfies(&c.base().version, dep.version.as_deref()));
            all_valid &= dep.valid;
        }
        widget.status = if all_valid {
            WidgetStatus::Ok
        } else {
            WidgetStatus::MissingDependencies
        };
        Ok(())
    }

    /// Prepare the registry on first use.
    ///
    /// A missing plugins root means a fresh installation: the registry is
    /// cleared and the root created. Otherwise, if no sweep has been
    /// recorded yet, every plugin directory is registered.
    pub async fn ensure_initialized(&self) -> Result<(), PluginError> {
        let _guard = self.init.lock().await;
        let root = &self.config.plugin_root;

        let exists = tokio::fs::try_exists(root)
            .await
            .map_err(|e| fs_error(OperationError::new(root, format!("Failed to inspect plugins root: {e}"))))?;
        if !exists {
            let removed = record::clear_registry(self.store.as_ref()).await?;
            tokio::fs::create_dir_all(root)
                .await
                .map_err(|e| fs_error(OperationError::new(root, e.to_string())))?;
            self.mark_swept().await?;
            tracing::info!(target: "aiverify::lifecycle", root = %root.display(), removed, "initialized empty plugin registry");
            return Ok(());
        }

        let marker = self
            .store
            .hash_get(&RegistryKey::LastModified.to_string(), MTIME)
            .await?;
        if marker.is_none() {
            let report = self.sweep_locked().await?;
            for failure in &report.failed {
                tracing::warn!(target: "aiverify::lifecycle", path = %failure.path.display(), reason = %failure.reason, "skipped plugin directory");
            }
        }
        Ok(())
    }

    /// Validate and register every plugin directory under the plugins root.
    ///
    /// Failures are collected per directory and never abort the sweep. No
    /// notifications are published.
    pub async fn sweep(&self) -> Result<SweepReport, PluginError> {
        let _guard = self.init.lock().await;
        self.sweep_locked().await
    }

    async fn sweep_locked(&self) -> Result<SweepReport, PluginError> {
        let root = &self.config.plugin_root;
        tokio::fs::create_dir_all(root)
            .await
            .map_err(|e| fs_error(OperationError::new(root, e.to_string())))?;
        let dirs = discover::plugin_dirs(root).map_err(|e| fs_error(OperationError::new(root, e.to_string())))?;

        let mut report = SweepReport::default();
        for dir in dirs {
            match self.register_dir(&dir).await {
                Ok(gid) => report.installed.push(gid),
                Err(e) => report.fail(&dir, e),
            }
        }
        self.mark_swept().await?;

        tracing::info!(
            target: "aiverify::lifecycle",
            installed = report.installed.len(),
            failed = report.failed.len(),
            "plugin directory sweep finished"
        );
        Ok(report)
    }

    /// Register an already installed plugin directory in place.
    async fn register_dir(&self, dir: &Path) -> Result<String, PluginError> {
        let meta = self.validator.validate(dir).await?;
        let target = self.plugin_path(&meta.gid)?;
        if normalize(dir) != target {
            return Err(PluginError::Filesystem {
                path: dir.to_path_buf(),
                message: format!("directory does not match plugin gid {}", meta.gid),
            });
        }

        let _guard = self.locks.acquire(&meta.gid).await;
        if let Some(previous) = record::fetch_index(self.store.as_ref(), &meta.gid).await? {
            self.remove_records(&previous, false).await?;
        }
        self.scanner.scan(dir, &meta).await?;
        Ok(meta.gid)
    }

    async fn mark_swept(&self) -> Result<(), PluginError> {
        let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
        self.store
            .hash_set(&RegistryKey::LastModified.to_string(), MTIME, &now)
            .await?;
        Ok(())
    }
}

async fn same_dir(a: &Path, b: &Path) -> bool {
    if normalize(a) == normalize(b) {
        return true;
    }
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
