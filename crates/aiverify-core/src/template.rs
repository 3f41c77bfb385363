//! Project template documents created from plugin templates.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Display information of a project template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// A report template document, as handed to the project template service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDocument {
    /// Gid of the template component this document was built from.
    pub gid: String,
    /// Always `true` for documents built during a plugin scan.
    pub from_plugin: bool,
    pub project_info: ProjectInfo,
    #[serde(default)]
    pub pages: Vec<Value>,
    #[serde(default)]
    pub global_vars: Vec<Value>,
}
