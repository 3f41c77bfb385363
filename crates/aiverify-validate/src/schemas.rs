//! Schemas for plugin and component metadata files, embedded at build time.

use std::sync::LazyLock;

use aiverify_core::{ComponentKind, ValidationError};

use crate::schema::Schema;

const PLUGIN: &str = include_str!("../schemas/plugin.schema.json");
const WIDGET: &str = include_str!("../schemas/widget.schema.json");
const INPUT_BLOCK: &str = include_str!("../schemas/inputBlock.schema.json");
const ALGORITHM: &str = include_str!("../schemas/algorithm.schema.json");
const TEMPLATE: &str = include_str!("../schemas/template.schema.json");
const TEMPLATE_DATA: &str = include_str!("../schemas/templateData.schema.json");

/// The compiled schema set.
#[derive(Debug)]
pub struct PluginSchemas {
    pub plugin: Schema,
    pub widget: Schema,
    pub input_block: Schema,
    pub algorithm: Schema,
    pub template: Schema,
    pub template_data: Schema,
}

static EMBEDDED: LazyLock<Result<PluginSchemas, String>> = LazyLock::new(PluginSchemas::compile);

impl PluginSchemas {
    fn compile() -> Result<Self, String> {
        let load = |name: &str, text: &str| Schema::parse(text).map_err(|e| format!("{name}: {e}"));
        Ok(Self {
            plugin: load("plugin.schema.json", PLUGIN)?,
            widget: load("widget.schema.json", WIDGET)?,
            input_block: load("inputBlock.schema.json", INPUT_BLOCK)?,
            algorithm: load("algorithm.schema.json", ALGORITHM)?,
            template: load("template.schema.json", TEMPLATE)?,
            template_data: load("templateData.schema.json", TEMPLATE_DATA)?,
        })
    }

    /// The schemas shipped with this crate, compiled once.
    pub fn embedded() -> Result<&'static Self, ValidationError> {
        EMBEDDED
            .as_ref()
            .map_err(|e| ValidationError::plugin_schema(format!("embedded schema failed to compile: {e}")))
    }

    /// Schema for a component kind's metadata file.
    pub fn component(&self, kind: ComponentKind) -> &Schema {
        match kind {
            ComponentKind::Widget => &self.widget,
            ComponentKind::InputBlock => &self.input_block,
            ComponentKind::Algorithm => &self.algorithm,
            ComponentKind::Template => &self.template,
        }
    }
}
