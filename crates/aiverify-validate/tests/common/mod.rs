use std::fs;
use std::path::{Path, PathBuf};

use aiverify_validate::content::BoxFuture;
use aiverify_validate::{PluginValidator, PythonChecker, ReadableMdx};
use serde_json::{json, Value};

/// Builds a plugin directory on disk.
pub struct PluginFixture {
    dir: PathBuf,
}

impl PluginFixture {
    pub fn new(root: &Path, gid: &str) -> Self {
        let dir = root.join(gid);
        fs::create_dir_all(&dir).unwrap();
        let fixture = Self { dir };
        fixture.json(
            "plugin.meta.json",
            &json!({"gid": gid, "version": "1.0.0", "name": gid, "author": "tests"}),
        );
        fixture
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

    pub fn remove(&self, rel: &str) -> &Self {
        fs::remove_file(self.dir.join(rel)).unwrap();
        self
    }

    pub fn widget(&self, cid: &str, extra: Value) -> &Self {
        let mut meta = json!({"cid": cid, "name": cid});
        merge(&mut meta, extra);
        self.json(&format!("widgets/{cid}.meta.json"), &meta)
            .write(&format!("widgets/{cid}.mdx"), "# Widget")
    }

    pub fn input_block(&self, cid: &str) -> &Self {
        self.json(&format!("inputs/{cid}.meta.json"), &json!({"cid": cid, "name": cid, "width": "md"}))
            .write(&format!("inputs/{cid}.mdx"), "# Input")
            .write(&format!("inputs/{cid}.summary.mdx"), "# Summary")
    }

    pub fn template(&self, cid: &str) -> &Self {
        self.json(&format!("templates/{cid}.meta.json"), &json!({"cid": cid, "name": cid}))
            .json(
                &format!("templates/{cid}.data.json"),
                &json!({"pages": [{"layouts": [], "reportWidgets": []}], "globalVars": []}),
            )
    }

    pub fn algorithm(&self, cid: &str) -> &Self {
        let dir = format!("algorithms/{cid}");
        self.json(
            &format!("{dir}/{cid}.meta.json"),
            &json!({"cid": cid, "name": cid, "modelType": ["classification"]}),
        )
        .write(&format!("{dir}/{cid}.py"), "def run():\n    return {}\n")
        .write(&format!("{dir}/requirements.txt"), "numpy\n")
        .json(&format!("{dir}/input.schema.json"), &json!({"type": "object"}))
        .json(&format!("{dir}/output.schema.json"), &json!({"type": "object"}))
    }
}

fn merge(base: &mut Value, extra: Value) {
    if let (Some(base), Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
}

/// Python checker that rejects scripts containing `syntax error`.
pub struct FakePython;

impl PythonChecker for FakePython {
    fn check<'a>(&'a self, script: &'a Path) -> BoxFuture<'a, Result<(), String>> {
        Box::pin(async move {
            let source = tokio::fs::read_to_string(script).await.map_err(|e| e.to_string())?;
            if source.contains("syntax error") {
                Err("SyntaxError: invalid syntax".to_string())
            } else {
                Ok(())
            }
        })
    }
}

pub fn validator() -> PluginValidator {
    PluginValidator::new(Box::new(ReadableMdx), Box::new(FakePython)).unwrap()
}
