use std::fs;
use std::path::{Path, PathBuf};

use aiverify_core::PluginMeta;
use serde_json::{json, Value};

/// Writes a plugin directory that passes validation.
pub struct PluginDir {
    dir: PathBuf,
    pub meta: PluginMeta,
}

impl PluginDir {
    pub fn new(root: &Path, gid: &str, version: &str) -> Self {
        let dir = root.join(gid);
        fs::create_dir_all(&dir).unwrap();
        let meta = PluginMeta::new(gid, format!("{gid} plugin")).with_version(version);
        let plugin = Self { dir, meta };
        plugin.json("plugin.meta.json", &serde_json::to_value(&plugin.meta).unwrap());
        plugin
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    pub fn json(&self, rel: &str, value: &Value) -> &Self {
        self.write(rel, &serde_json::to_string_pretty(value).unwrap())
    }

    pub fn widget(&self, cid: &str, extra: Value) -> &Self {
        let mut meta = json!({"cid": cid, "name": cid, "tags": ["chart"]});
        if let (Some(base), Value::Object(extra)) = (meta.as_object_mut(), extra) {
            base.extend(extra);
        }
        self.json(&format!("widgets/{cid}.meta.json"), &meta)
            .write(&format!("widgets/{cid}.mdx"), "# Widget")
    }

    pub fn input_block(&self, cid: &str) -> &Self {
        self.json(
            &format!("inputs/{cid}.meta.json"),
            &json!({"cid": cid, "name": cid, "width": "md", "fullScreen": true}),
        )
        .write(&format!("inputs/{cid}.mdx"), "# Input")
        .write(&format!("inputs/{cid}.summary.mdx"), "# Summary")
    }

    pub fn template(&self, cid: &str) -> &Self {
        self.json(
            &format!("templates/{cid}.meta.json"),
            &json!({"cid": cid, "name": "Summary Report", "description": "One page", "author": "AI Verify"}),
        )
        .json(
            &format!("templates/{cid}.data.json"),
            &json!({
                "pages": [{"layouts": [{"i": "0", "x": 0}], "reportWidgets": [{"widgetGID": "p:bar"}]}],
                "globalVars": [{"key": "title", "value": "Report"}]
            }),
        )
    }

    pub fn algorithm(&self, cid: &str, requirements: &str) -> &Self {
        let dir = format!("algorithms/{cid}");
        self.json(
            &format!("{dir}/{cid}.meta.json"),
            &json!({"cid": cid, "name": cid, "modelType": ["classification"], "requireGroundTruth": true}),
        )
        .write(&format!("{dir}/{cid}.py"), "def run():\n    return {}\n")
        .write(&format!("{dir}/requirements.txt"), requirements)
        .json(&format!("{dir}/input.schema.json"), &input_schema())
        .json(&format!("{dir}/output.schema.json"), &output_schema())
    }
}

pub fn input_schema() -> Value {
    json!({
        "title": "Algorithm Plugin Input Arguments",
        "type": "object",
        "required": ["explain_type"],
        "properties": {"explain_type": {"type": "string", "enum": ["global", "local"]}}
    })
}

pub fn output_schema() -> Value {
    json!({"type": "object", "required": ["results"], "properties": {"results": {"type": "array"}}})
}
