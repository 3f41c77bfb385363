//! Effect-free validation of a staged plugin directory.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use aiverify_core::manifest::{
    self, AlgorithmManifest, InputBlockManifest, TemplateManifest, WidgetManifest,
    INPUT_SCHEMA_FILE, OUTPUT_SCHEMA_FILE, PLUGIN_META_FILE, REQUIREMENTS_FILE,
};
use aiverify_core::{ComponentKind, PluginMeta, PortalConfig, ValidationError};

use crate::content::{self, MdxCompiler, PythonChecker};
use crate::discover;
use crate::paths::resolve_within;
use crate::schemas::PluginSchemas;

/// Order in which component kinds are validated.
const KIND_ORDER: [ComponentKind; 4] = [
    ComponentKind::Widget,
    ComponentKind::InputBlock,
    ComponentKind::Template,
    ComponentKind::Algorithm,
];

/// Validates plugin directories against the embedded schemas and the
/// external content validators.
///
/// Validation reads files and runs content checks but never writes, so it
/// can be retried freely.
pub struct PluginValidator {
    schemas: &'static PluginSchemas,
    mdx: Box<dyn MdxCompiler>,
    python: Box<dyn PythonChecker>,
}

impl std::fmt::Debug for PluginValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginValidator").finish_non_exhaustive()
    }
}

impl PluginValidator {
    /// Create a validator with explicit content validators.
    pub fn new(mdx: Box<dyn MdxCompiler>, python: Box<dyn PythonChecker>) -> Result<Self, ValidationError> {
        Ok(Self {
            schemas: PluginSchemas::embedded()?,
            mdx,
            python,
        })
    }

    /// Create a validator whose content checks follow `config`.
    pub fn from_config(config: &PortalConfig, cancel: CancellationToken) -> Result<Self, ValidationError> {
        let (mdx, python) = content::from_config(config, cancel);
        Self::new(mdx, python)
    }

    /// Validate a plugin directory and return its metadata.
    pub async fn validate(&self, plugin_dir: &Path) -> Result<PluginMeta, ValidationError> {
        let meta = self.validate_plugin_meta(plugin_dir).await?;
        tracing::debug!(target: "aiverify::validate", gid = %meta.gid, dir = %plugin_dir.display(), "validating plugin");

        // Component gids are `<pluginGid>:<cid>` whatever the kind, so a cid
        // may appear only once across all kinds.
        let mut seen = HashSet::new();
        for kind in KIND_ORDER {
            let manifests = discover::component_manifests(plugin_dir, kind)
                .map_err(|e| ValidationError::io(plugin_dir.join(kind.dir_name()), e))?;

            for path in manifests {
                let cid = match kind {
                    ComponentKind::Widget => self.validate_widget(plugin_dir, &path).await?,
                    ComponentKind::InputBlock => self.validate_input_block(&path).await?,
                    ComponentKind::Template => self.validate_template(&path).await?,
                    ComponentKind::Algorithm => self.validate_algorithm(&path).await?,
                };
                if !seen.insert(cid.clone()) {
                    return Err(ValidationError::DuplicateComponent { kind, cid });
                }
            }
        }
        Ok(meta)
    }

    async fn validate_plugin_meta(&self, plugin_dir: &Path) -> Result<PluginMeta, ValidationError> {
        let path = plugin_dir.join(PLUGIN_META_FILE);
        let value = read_json(&path)
            .await
            .map_err(|e| ValidationError::plugin_schema(format!("{PLUGIN_META_FILE}: {e}")))?;
        self.schemas
            .plugin
            .validate(&value)
            .map_err(|v| ValidationError::plugin_schema(v.to_string()))?;
        serde_json::from_value(value).map_err(|e| ValidationError::plugin_schema(e.to_string()))
    }

    /// Read, schema-check and decode one component metadata file.
    async fn load_manifest<T: DeserializeOwned>(
        &self,
        kind: ComponentKind,
        path: &Path,
    ) -> Result<T, ValidationError> {
        let file = file_label(path);
        let value = read_json(path)
            .await
            .map_err(|e| ValidationError::component_schema(kind, None, format!("{file}: {e}")))?;
        let cid = value.get("cid").and_then(Value::as_str).map(String::from);

        self.schemas
            .component(kind)
            .validate(&value)
            .map_err(|v| ValidationError::component_schema(kind, cid.clone(), v.to_string()))?;
        serde_json::from_value(value).map_err(|e| ValidationError::component_schema(kind, cid, e.to_string()))
    }

    async fn validate_widget(&self, plugin_dir: &Path, path: &Path) -> Result<String, ValidationError> {
        let kind = ComponentKind::Widget;
        let widget: WidgetManifest = self.load_manifest(kind, path).await?;
        let dir = parent(path);

        let mdx = require_file(kind, &widget.cid, dir, &manifest::mdx_file(&widget.cid)).await?;
        self.compile_mdx(kind, &widget.cid, &mdx).await?;

        for mock in &widget.mock_data {
            let data_path = resolve_within(plugin_dir, &mock.datapath)?;
            let readable = read_json(&data_path).await;
            if let Err(e) = readable {
                return Err(ValidationError::ContentInvalid {
                    kind,
                    cid: widget.cid.clone(),
                    message: format!("mock data {} is not readable JSON: {e}", mock.datapath),
                });
            }
        }
        Ok(widget.cid)
    }

    async fn validate_input_block(&self, path: &Path) -> Result<String, ValidationError> {
        let kind = ComponentKind::InputBlock;
        let block: InputBlockManifest = self.load_manifest(kind, path).await?;
        let dir = parent(path);

        let mdx = require_file(kind, &block.cid, dir, &manifest::mdx_file(&block.cid)).await?;
        let summary = require_file(kind, &block.cid, dir, &manifest::summary_mdx_file(&block.cid)).await?;
        self.compile_mdx(kind, &block.cid, &mdx).await?;
        self.compile_mdx(kind, &block.cid, &summary).await?;
        Ok(block.cid)
    }

    async fn validate_template(&self, path: &Path) -> Result<String, ValidationError> {
        let kind = ComponentKind::Template;
        let template: TemplateManifest = self.load_manifest(kind, path).await?;
        let data_file = manifest::template_data_file(&template.cid);
        let data_path = require_file(kind, &template.cid, parent(path), &data_file).await?;

        let data = read_json(&data_path).await.map_err(|e| {
            ValidationError::component_schema(kind, Some(template.cid.clone()), format!("{data_file}: {e}"))
        })?;
        self.schemas.template_data.validate(&data).map_err(|v| {
            ValidationError::component_schema(kind, Some(template.cid.clone()), format!("{data_file}: {v}"))
        })?;
        Ok(template.cid)
    }

    async fn validate_algorithm(&self, path: &Path) -> Result<String, ValidationError> {
        let kind = ComponentKind::Algorithm;
        let algo: AlgorithmManifest = self.load_manifest(kind, path).await?;
        let cid = algo.cid.as_str();
        let dir = parent(path);

        let script = require_file(kind, cid, dir, &manifest::script_file(cid)).await?;
        let requirements = require_file(kind, cid, dir, REQUIREMENTS_FILE).await?;
        let input_schema = require_file(kind, cid, dir, INPUT_SCHEMA_FILE).await?;
        let output_schema = require_file(kind, cid, dir, OUTPUT_SCHEMA_FILE).await?;

        tokio::fs::read_to_string(&requirements)
            .await
            .map_err(|e| ValidationError::io(&requirements, e))?;
        for (file, schema_path) in [(INPUT_SCHEMA_FILE, &input_schema), (OUTPUT_SCHEMA_FILE, &output_schema)] {
            let value = read_json(schema_path)
                .await
                .map_err(|e| ValidationError::component_schema(kind, Some(cid.to_string()), format!("{file}: {e}")))?;
            if !value.is_object() {
                return Err(ValidationError::component_schema(
                    kind,
                    Some(cid.to_string()),
                    format!("{file} must be a JSON object"),
                ));
            }
        }

        self.python
            .check(&script)
            .await
            .map_err(|message| ValidationError::ContentInvalid {
                kind,
                cid: cid.to_string(),
                message,
            })?;
        Ok(algo.cid)
    }

    async fn compile_mdx(&self, kind: ComponentKind, cid: &str, path: &Path) -> Result<(), ValidationError> {
        self.mdx
            .compile(path)
            .await
            .map(|_| ())
            .map_err(|message| ValidationError::ContentInvalid {
                kind,
                cid: cid.to_string(),
                message,
            })
    }
}

async fn read_json(path: &Path) -> Result<Value, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("cannot read: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid JSON: {e}"))
}

async fn require_file(kind: ComponentKind, cid: &str, dir: &Path, name: &str) -> Result<PathBuf, ValidationError> {
    let path = dir.join(name);
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.is_file() => Ok(path),
        _ => Err(ValidationError::missing(kind, cid, name)),
    }
}

fn parent(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new("."))
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
