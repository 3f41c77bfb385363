//! Registry scanner for validated plugin directories.

use std::path::{Component as PathComponent, Path};
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use strum::IntoEnumIterator;
use tokio::sync::broadcast;

use aiverify_core::manifest::{
    self, AlgorithmManifest, InputBlockManifest, TemplateData, TemplateManifest, WidgetManifest,
    INPUT_SCHEMA_FILE, OUTPUT_SCHEMA_FILE, REQUIREMENTS_FILE,
};
use aiverify_core::{
    Algorithm, Component, ComponentBase, ComponentIds, ComponentKind, InputBlock, MockData, Plugin,
    PluginMeta, ProjectInfo, RegistryKey, ReportWidget, ScanError, TemplateComponent,
    TemplateDocument, WidgetDependency, WidgetStatus,
};
use aiverify_store::record::{encode_component, encode_index};
use aiverify_store::{RegistryStore, StoreBatch};
use aiverify_validate::discover;

use crate::progress::ScanProgress;
use crate::template_service::ProjectTemplateService;

/// Turns a validated plugin directory into registry records.
///
/// The scanner trusts its input: it performs no schema checks, so callers
/// must run [`aiverify_validate::PluginValidator`] on the directory first.
pub struct DirectoryScanner {
    store: Arc<dyn RegistryStore>,
    templates: Arc<dyn ProjectTemplateService>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl std::fmt::Debug for DirectoryScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryScanner")
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

/// Components of one plugin plus the template documents saved for them.
#[derive(Default)]
struct Scanned {
    components: Vec<(Component, Option<(String, TemplateDocument)>)>,
    saved_templates: Vec<String>,
}

impl DirectoryScanner {
    /// Create a scanner writing through `store`.
    pub fn new(store: Arc<dyn RegistryStore>, templates: Arc<dyn ProjectTemplateService>) -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            store,
            templates,
            progress_tx,
        }
    }

    /// Subscribe to scan progress updates.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    /// Scan `plugin_dir` and write its records in one atomic batch.
    ///
    /// Returns the plugin populated with the components just written. If the
    /// batch fails, template documents saved during this scan are removed
    /// again.
    pub async fn scan(&self, plugin_dir: &Path, meta: &PluginMeta) -> Result<Plugin, ScanError> {
        let start = Instant::now();
        let mut scanned = Scanned::default();

        let result = self.collect(plugin_dir, meta, start, &mut scanned).await;
        let written = match result {
            Ok(()) => self.write(meta, &scanned).await,
            Err(e) => Err(e),
        };

        match written {
            Ok(plugin) => {
                tracing::info!(
                    target: "aiverify::scan",
                    gid = %meta.gid,
                    components = plugin.component_ids.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "plugin scanned"
                );
                Ok(plugin)
            }
            Err(e) => {
                self.discard_templates(&scanned.saved_templates).await;
                Err(e)
            }
        }
    }

    async fn collect(
        &self,
        plugin_dir: &Path,
        meta: &PluginMeta,
        start: Instant,
        scanned: &mut Scanned,
    ) -> Result<(), ScanError> {
        let mut progress = ScanProgress::new(&meta.gid);

        for kind in ComponentKind::iter() {
            let manifests = discover::component_manifests(plugin_dir, kind)
                .map_err(|e| ScanError::io(plugin_dir.join(kind.dir_name()), e))?;

            for path in manifests {
                let entry = match kind {
                    ComponentKind::Widget => (scan_widget(plugin_dir, &path, meta).await?, None),
                    ComponentKind::InputBlock => (scan_input_block(plugin_dir, &path, meta).await?, None),
                    ComponentKind::Algorithm => (scan_algorithm(plugin_dir, &path, meta).await?, None),
                    ComponentKind::Template => {
                        let (mut template, document) = scan_template(&path, meta).await?;
                        let id = self.templates.save(&document).await?;
                        scanned.saved_templates.push(id.clone());
                        template.template_id = id.clone();
                        (Component::Template(template), Some((id, document)))
                    }
                };
                tracing::debug!(target: "aiverify::scan", gid = %entry.0.gid(), kind = %kind, "component scanned");

                progress.components_scanned += 1;
                progress.kind = Some(kind);
                progress.current_path = path;
                progress.elapsed = start.elapsed();
                let _ = self.progress_tx.send(progress.clone());

                scanned.components.push(entry);
            }
        }
        Ok(())
    }

    async fn write(&self, meta: &PluginMeta, scanned: &Scanned) -> Result<Plugin, ScanError> {
        let mut ids = ComponentIds::default();
        let mut batch = StoreBatch::new();

        for (component, template) in &scanned.components {
            let base = component.base();
            ids.get_mut(component.kind()).push(base.cid.clone());
            let template = template.as_ref().map(|(id, doc)| (id.as_str(), doc));
            batch.hash_set(
                &RegistryKey::component(component.kind(), &meta.gid, &base.cid),
                encode_component(component, template)?,
            );
        }

        let installed_at = chrono::Utc::now().timestamp_millis();
        batch.hash_set(&RegistryKey::plugin_index(&meta.gid), encode_index(meta, &ids, installed_at)?);
        self.store.execute(batch).await?;

        let mut plugin = Plugin::new(meta.clone(), ids, installed_at);
        for (component, _) in &scanned.components {
            match component.clone() {
                Component::ReportWidget(c) => plugin.report_widgets.push(c),
                Component::InputBlock(c) => plugin.input_blocks.push(c),
                Component::Algorithm(c) => plugin.algorithms.push(c),
                Component::Template(c) => plugin.templates.push(c),
            }
        }
        Ok(plugin)
    }

    async fn discard_templates(&self, ids: &[String]) {
        for id in ids {
            if let Err(e) = self.templates.delete(id).await {
                tracing::warn!(target: "aiverify::scan", id = %id, error = %e, "failed to remove project template after aborted scan");
            }
        }
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ScanError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ScanError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| ScanError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Path of `path` relative to `root`, `/`-separated.
fn relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            PathComponent::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn manifest_dir(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

fn base(meta: &PluginMeta, cid: &str, name: &str, description: Option<String>, author: Option<String>) -> ComponentBase {
    let mut base = ComponentBase::new(&meta.gid, &meta.version, cid, name);
    base.description = description;
    base.author = author;
    base
}

async fn scan_widget(plugin_dir: &Path, path: &Path, meta: &PluginMeta) -> Result<Component, ScanError> {
    let widget: WidgetManifest = read_json(path).await?;
    let mdx = manifest_dir(path).join(manifest::mdx_file(&widget.cid));

    let dependencies = widget
        .dependencies
        .iter()
        .map(|dep| WidgetDependency::new(dep.qualified(&meta.gid), dep.version.clone()))
        .collect();
    let mock_data = widget
        .mock_data
        .iter()
        .map(|mock| MockData {
            kind: mock.kind,
            gid: mock.qualified(&meta.gid),
            datapath: mock.datapath.clone(),
        })
        .collect();

    Ok(Component::ReportWidget(ReportWidget {
        base: base(meta, &widget.cid, &widget.name, widget.description, widget.author),
        tags: widget.tags,
        dependencies,
        mdx_path: relative(plugin_dir, &mdx),
        mock_data,
        widget_size: widget.widget_size,
        properties: widget.properties,
        dynamic_height: widget.dynamic_height,
        status: WidgetStatus::Ok,
    }))
}

async fn scan_input_block(plugin_dir: &Path, path: &Path, meta: &PluginMeta) -> Result<Component, ScanError> {
    let block: InputBlockManifest = read_json(path).await?;
    let dir = manifest_dir(path);

    Ok(Component::InputBlock(InputBlock {
        mdx_path: relative(plugin_dir, &dir.join(manifest::mdx_file(&block.cid))),
        summary_mdx_path: relative(plugin_dir, &dir.join(manifest::summary_mdx_file(&block.cid))),
        base: base(meta, &block.cid, &block.name, block.description, block.author),
        width: block.width,
        full_screen: block.full_screen,
    }))
}

async fn scan_algorithm(plugin_dir: &Path, path: &Path, meta: &PluginMeta) -> Result<Component, ScanError> {
    let algo: AlgorithmManifest = read_json(path).await?;
    let dir = manifest_dir(path);

    let requirements_path = dir.join(REQUIREMENTS_FILE);
    let requirements = tokio::fs::read_to_string(&requirements_path)
        .await
        .map_err(|e| ScanError::io(&requirements_path, e))?;
    let input_schema: Value = read_json(&dir.join(INPUT_SCHEMA_FILE)).await?;
    let output_schema: Value = read_json(&dir.join(OUTPUT_SCHEMA_FILE)).await?;

    Ok(Component::Algorithm(Algorithm {
        script_path: relative(plugin_dir, &dir.join(manifest::script_file(&algo.cid))),
        base: base(meta, &algo.cid, &algo.name, algo.description, algo.author),
        model_type: algo.model_type,
        require_ground_truth: algo.require_ground_truth,
        tags: algo.tags,
        requirements: manifest::parse_requirements(&requirements),
        input_schema,
        output_schema,
    }))
}

/// Build a template component and its project template document.
///
/// The component's `template_id` is filled in once the document is saved.
async fn scan_template(path: &Path, meta: &PluginMeta) -> Result<(TemplateComponent, TemplateDocument), ScanError> {
    let template: TemplateManifest = read_json(path).await?;
    let data: TemplateData = read_json(&manifest_dir(path).join(manifest::template_data_file(&template.cid))).await?;

    let base = base(
        meta,
        &template.cid,
        &template.name,
        template.description.clone(),
        template.author.clone(),
    );
    let document = TemplateDocument {
        gid: base.gid.clone(),
        from_plugin: true,
        project_info: ProjectInfo {
            name: template.name,
            description: template.description.unwrap_or_default(),
            company: template.author,
        },
        pages: data.pages,
        global_vars: data.global_vars,
    };
    let component = TemplateComponent {
        base,
        template_id: String::new(),
    };
    Ok((component, document))
}
