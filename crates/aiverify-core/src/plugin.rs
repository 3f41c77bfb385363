//! Plugin records and their component listings.

use serde::{Deserialize, Serialize};

use crate::component::{Algorithm, ComponentKind, InputBlock, ReportWidget, TemplateComponent};

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Contents of `plugin.meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMeta {
    /// Globally unique plugin identifier.
    pub gid: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl PluginMeta {
    /// Create metadata with the default version.
    pub fn new(gid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gid: gid.into(),
            version: default_version(),
            name: name.into(),
            author: None,
            description: None,
            url: None,
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }
}

/// Component cids of one plugin, per kind, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentIds {
    pub report_widgets: Vec<String>,
    pub input_blocks: Vec<String>,
    pub algorithms: Vec<String>,
    pub templates: Vec<String>,
}

impl ComponentIds {
    /// Cids of one kind.
    pub fn get(&self, kind: ComponentKind) -> &[String] {
        match kind {
            ComponentKind::Widget => &self.report_widgets,
            ComponentKind::InputBlock => &self.input_blocks,
            ComponentKind::Algorithm => &self.algorithms,
            ComponentKind::Template => &self.templates,
        }
    }

    /// Mutable cids of one kind.
    pub fn get_mut(&mut self, kind: ComponentKind) -> &mut Vec<String> {
        match kind {
            ComponentKind::Widget => &mut self.report_widgets,
            ComponentKind::InputBlock => &mut self.input_blocks,
            ComponentKind::Algorithm => &mut self.algorithms,
            ComponentKind::Template => &mut self.templates,
        }
    }

    /// Total number of components.
    pub fn len(&self) -> usize {
        self.report_widgets.len()
            + self.input_blocks.len()
            + self.algorithms.len()
            + self.templates.len()
    }

    /// Check if the plugin has no components.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An installed plugin as seen through the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plugin {
    #[serde(flatten)]
    pub meta: PluginMeta,
    /// Unix timestamp in milliseconds.
    pub installed_at: i64,
    /// Membership in the configured stock-plugin allowlist.
    #[serde(default)]
    pub is_stock: bool,
    /// Cids listed in the plugin index record.
    pub component_ids: ComponentIds,
    /// Resolved components; empty unless the registry read was populated.
    #[serde(default)]
    pub report_widgets: Vec<ReportWidget>,
    #[serde(default)]
    pub input_blocks: Vec<InputBlock>,
    #[serde(default)]
    pub algorithms: Vec<Algorithm>,
    #[serde(default)]
    pub templates: Vec<TemplateComponent>,
}

impl Plugin {
    /// Create an unpopulated plugin record.
    pub fn new(meta: PluginMeta, component_ids: ComponentIds, installed_at: i64) -> Self {
        Self {
            meta,
            installed_at,
            is_stock: false,
            component_ids,
            report_widgets: Vec::new(),
            input_blocks: Vec::new(),
            algorithms: Vec::new(),
            templates: Vec::new(),
        }
    }

    /// Plugin gid.
    pub fn gid(&self) -> &str {
        &self.meta.gid
    }
}
