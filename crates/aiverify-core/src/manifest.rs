//! On-disk plugin layout and the metadata files it holds.
//!
//! ```text
//! {plugin}/plugin.meta.json
//! {plugin}/widgets/{cid}.meta.json      + {cid}.mdx
//! {plugin}/inputs/{cid}.meta.json       + {cid}.mdx + {cid}.summary.mdx
//! {plugin}/templates/{cid}.meta.json    + {cid}.data.json
//! {plugin}/algorithms/{dir}/{cid}.meta.json
//!     + {cid}.py + requirements.txt + input.schema.json + output.schema.json
//! ```
//!
//! Sibling files are named after the cid declared inside the metadata file.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::component::{component_gid, MockDataKind};

/// Plugin metadata file at the top of a plugin directory.
pub const PLUGIN_META_FILE: &str = "plugin.meta.json";
/// Suffix identifying component metadata files.
pub const META_SUFFIX: &str = ".meta.json";
pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const INPUT_SCHEMA_FILE: &str = "input.schema.json";
pub const OUTPUT_SCHEMA_FILE: &str = "output.schema.json";

pub fn mdx_file(cid: &str) -> String {
    format!("{cid}.mdx")
}

pub fn summary_mdx_file(cid: &str) -> String {
    format!("{cid}.summary.mdx")
}

pub fn template_data_file(cid: &str) -> String {
    format!("{cid}.data.json")
}

pub fn script_file(cid: &str) -> String {
    format!("{cid}.py")
}

/// Reference from a widget to another component.
///
/// A reference without `gid` targets a component of the same plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    /// Plugin gid of the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
    pub cid: String,
    /// Semver range the target's plugin version must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ComponentRef {
    /// Fully qualified component gid, resolving a bare reference against `plugin_gid`.
    pub fn qualified(&self, plugin_gid: &str) -> String {
        component_gid(self.gid.as_deref().unwrap_or(plugin_gid), &self.cid)
    }
}

/// Sample data binding declared by a widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockDataRef {
    #[serde(rename = "type")]
    pub kind: MockDataKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<String>,
    pub cid: String,
    /// JSON file path relative to the plugin root.
    pub datapath: String,
}

impl MockDataRef {
    pub fn qualified(&self, plugin_gid: &str) -> String {
        component_gid(self.gid.as_deref().unwrap_or(plugin_gid), &self.cid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetManifest {
    pub cid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<ComponentRef>,
    #[serde(default, rename = "mockdata")]
    pub mock_data: Vec<MockDataRef>,
    #[serde(default)]
    pub widget_size: Option<Value>,
    #[serde(default)]
    pub properties: Vec<Value>,
    #[serde(default)]
    pub dynamic_height: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBlockManifest {
    pub cid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub full_screen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmManifest {
    pub cid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub model_type: Vec<String>,
    #[serde(default)]
    pub require_ground_truth: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateManifest {
    pub cid: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

/// Contents of a template's `{cid}.data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    #[serde(default)]
    pub pages: Vec<Value>,
    #[serde(default)]
    pub global_vars: Vec<Value>,
}

/// Split `requirements.txt` into trimmed, non-blank lines.
pub fn parse_requirements(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
