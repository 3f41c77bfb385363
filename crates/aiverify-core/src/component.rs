//! Plugin component types.
//!
//! A plugin ships four kinds of component. All of them share
//! [`ComponentBase`]; the kind-specific payload lives in the per-kind structs,
//! and [`Component`] is the tagged union persisted in the registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumIter, EnumString};

/// Kind discriminator for plugin components.
///
/// `Display`/`FromStr` use the registry key prefix (`widget`, `inputBlock`,
/// `algo`, `template`).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum ComponentKind {
    #[strum(serialize = "widget")]
    #[serde(rename = "ReportWidget")]
    Widget,
    #[strum(serialize = "inputBlock")]
    InputBlock,
    #[strum(serialize = "algo")]
    Algorithm,
    #[strum(serialize = "template")]
    Template,
}

impl ComponentKind {
    /// Value of the `type` discriminator in serialized records.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Widget => "ReportWidget",
            Self::InputBlock => "InputBlock",
            Self::Algorithm => "Algorithm",
            Self::Template => "Template",
        }
    }

    /// Subdirectory of the plugin root holding this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Widget => "widgets",
            Self::InputBlock => "inputs",
            Self::Algorithm => "algorithms",
            Self::Template => "templates",
        }
    }

    /// Field of the plugin index record listing this kind's cids.
    pub fn index_field(self) -> &'static str {
        match self {
            Self::Widget => "reportWidgets",
            Self::InputBlock => "inputBlocks",
            Self::Algorithm => "algorithms",
            Self::Template => "templates",
        }
    }

    /// Glob pattern matching every registry key of this kind.
    pub fn key_pattern(self) -> String {
        format!("{self}:*")
    }
}

/// Build the composite gid of a component.
pub fn component_gid(plugin_gid: &str, cid: &str) -> String {
    format!("{plugin_gid}:{cid}")
}

/// Fields shared by every component kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentBase {
    /// Identifier unique within the owning plugin.
    pub cid: String,
    /// `<pluginGid>:<cid>`.
    pub gid: String,
    /// Version inherited from the owning plugin at scan time.
    pub version: String,
    /// Owning plugin gid.
    #[serde(rename = "pluginGID")]
    pub plugin_gid: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl ComponentBase {
    /// Create a base for a component of the given plugin.
    pub fn new(
        plugin_gid: impl Into<String>,
        version: impl Into<String>,
        cid: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        let plugin_gid = plugin_gid.into();
        let cid = cid.into();
        Self {
            gid: component_gid(&plugin_gid, &cid),
            cid,
            version: version.into(),
            plugin_gid,
            name: name.into(),
            description: None,
            author: None,
        }
    }
}

/// Aggregate dependency status of a report widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WidgetStatus {
    #[default]
    #[serde(rename = "OK")]
    Ok,
    MissingDependencies,
}

/// A report widget's reference to another component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetDependency {
    /// Fully-qualified gid of the target component.
    pub gid: String,
    /// Semantic-version range the target's plugin version must satisfy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Derived on every registry read; never trusted from storage.
    #[serde(default)]
    pub valid: bool,
}

impl WidgetDependency {
    /// Create an unresolved dependency.
    pub fn new(gid: impl Into<String>, version: Option<String>) -> Self {
        Self {
            gid: gid.into(),
            version,
            valid: false,
        }
    }
}

/// Source kind of a widget's mock data binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MockDataKind {
    Algorithm,
    InputBlock,
}

/// Sample data bound to a widget for previews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockData {
    #[serde(rename = "type")]
    pub kind: MockDataKind,
    /// Fully-qualified gid of the component the data stands in for.
    pub gid: String,
    /// Path of the JSON data file relative to the plugin root.
    pub datapath: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWidget {
    #[serde(flatten)]
    pub base: ComponentBase,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<WidgetDependency>,
    /// Content path relative to the plugin root.
    pub mdx_path: String,
    #[serde(default)]
    pub mock_data: Vec<MockData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widget_size: Option<Value>,
    #[serde(default)]
    pub properties: Vec<Value>,
    #[serde(default)]
    pub dynamic_height: bool,
    #[serde(default)]
    pub status: WidgetStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBlock {
    #[serde(flatten)]
    pub base: ComponentBase,
    /// Display width hint (`xs` .. `xl`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(default)]
    pub full_screen: bool,
    pub mdx_path: String,
    pub summary_mdx_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Algorithm {
    #[serde(flatten)]
    pub base: ComponentBase,
    /// Script path relative to the plugin root.
    pub script_path: String,
    #[serde(default)]
    pub model_type: Vec<String>,
    #[serde(default)]
    pub require_ground_truth: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Lines of `requirements.txt`, trimmed, blanks dropped.
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub input_schema: Value,
    #[serde(default)]
    pub output_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateComponent {
    #[serde(flatten)]
    pub base: ComponentBase,
    /// Identifier assigned by the project template service.
    pub template_id: String,
}

/// Any component, tagged by `type` when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Component {
    ReportWidget(ReportWidget),
    InputBlock(InputBlock),
    Algorithm(Algorithm),
    Template(TemplateComponent),
}

impl Component {
    /// Kind of this component.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::ReportWidget(_) => ComponentKind::Widget,
            Self::InputBlock(_) => ComponentKind::InputBlock,
            Self::Algorithm(_) => ComponentKind::Algorithm,
            Self::Template(_) => ComponentKind::Template,
        }
    }

    /// Shared fields.
    pub fn base(&self) -> &ComponentBase {
        match self {
            Self::ReportWidget(c) => &c.base,
            Self::InputBlock(c) => &c.base,
            Self::Algorithm(c) => &c.base,
            Self::Template(c) => &c.base,
        }
    }

    /// Composite gid.
    pub fn gid(&self) -> &str {
        &self.base().gid
    }
}
