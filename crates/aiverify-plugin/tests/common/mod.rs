use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use aiverify_core::{PortalConfig, ScanError, TemplateDocument};
use aiverify_plugin::PluginManager;
use aiverify_scan::{MemoryTemplateService, ProjectTemplateService};
use aiverify_store::{MemoryPublisher, MemoryStore};
use aiverify_validate::content::BoxFuture;
use aiverify_validate::{PluginValidator, PythonChecker, ReadableMdx};
use serde_json::{json, Value};
use tempfile::TempDir;

/// A plugin directory written to disk.
pub struct PluginFixture {
    dir: PathBuf,
}

impl PluginFixture {
    pub fn at(dir: PathBuf, gid: &str, version: &str) -> Self {
        fs::create_dir_all(&dir).unwrap();
        let fixture = Self { dir };
        fixture.json(
            "plugin.meta.json",
            &json!({"gid": gid, "version": version, "name": gid, "author": "tests"}),
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

    pub fn widget(&self, cid: &str, extra: Value) -> &Self {
        let mut meta = json!({"cid": cid, "name": cid});
        if let (Some(base), Value::Object(extra)) = (meta.as_object_mut(), extra) {
            base.extend(extra);
        }
        self.json(&format!("widgets/{cid}.meta.json"), &meta)
            .write(&format!("widgets/{cid}.mdx"), "# Widget")
    }

    pub fn input_block(&self, cid: &str) -> &Self {
        self.json(&format!("inputs/{cid}.meta.json"), &json!({"cid": cid, "name": cid}))
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
        self.algorithm_with(cid, "numpy\n", &json!({"type": "object"}), &json!({"type": "object"}))
    }

    pub fn algorithm_with(&self, cid: &str, requirements: &str, input: &Value, output: &Value) -> &Self {
        let dir = format!("algorithms/{cid}");
        self.json(
            &format!("{dir}/{cid}.meta.json"),
            &json!({"cid": cid, "name": cid, "modelType": ["classification"]}),
        )
        .write(&format!("{dir}/{cid}.py"), "def run():\n    return {}\n")
        .write(&format!("{dir}/requirements.txt"), requirements)
        .json(&format!("{dir}/input.schema.json"), input)
        .json(&format!("{dir}/output.schema.json"), output)
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

/// Template service that saves normally but fails every delete.
pub struct RejectingDeletes(Arc<MemoryTemplateService>);

impl ProjectTemplateService for RejectingDeletes {
    fn save<'a>(&'a self, document: &'a TemplateDocument) -> BoxFuture<'a, Result<String, ScanError>> {
        self.0.save(document)
    }

    fn delete<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, Result<(), ScanError>> {
        Box::pin(async {
            Err(ScanError::TemplateService {
                message: "template service unavailable".to_string(),
            })
        })
    }

    fn get<'a>(&'a self, id: &'a str) -> BoxFuture<'a, Result<Option<TemplateDocument>, ScanError>> {
        self.0.get(id)
    }
}

/// A manager over in-memory collaborators and a temporary plugins root.
pub struct Harness {
    pub temp: TempDir,
    pub store: Arc<MemoryStore>,
    pub publisher: Arc<MemoryPublisher>,
    pub templates: Arc<MemoryTemplateService>,
    pub manager: PluginManager,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_stock(Vec::new())
    }

    pub fn with_stock(stock_plugins: Vec<String>) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("plugins");
        Self::assemble(temp, root, stock_plugins, false)
    }

    /// A harness whose project template service refuses every delete.
    pub fn rejecting_template_deletes() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("plugins");
        Self::assemble(temp, root, Vec::new(), true)
    }

    /// A harness whose plugins root is `rel` inside the temp directory.
    pub fn with_root(rel: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(rel);
        Self::assemble(temp, root, Vec::new(), false)
    }

    fn assemble(temp: TempDir, root: PathBuf, stock_plugins: Vec<String>, reject_deletes: bool) -> Self {
        let config = PortalConfig::builder()
            .plugin_root(root)
            .stock_plugins(stock_plugins)
            .build()
            .unwrap();

        let store = Arc::new(MemoryStore::new());
        let publisher = Arc::new(MemoryPublisher::new());
        let templates = Arc::new(MemoryTemplateService::new());
        let service: Arc<dyn ProjectTemplateService> = if reject_deletes {
            Arc::new(RejectingDeletes(templates.clone())) as Arc<dyn ProjectTemplateService>
        } else {
            templates.clone() as Arc<dyn ProjectTemplateService>
        };
        let validator = PluginValidator::new(Box::new(ReadableMdx), Box::new(FakePython)).unwrap();
        let manager = PluginManager::new(config, store.clone(), publisher.clone(), service, validator);

        Self {
            temp,
            store,
            publisher,
            templates,
            manager,
        }
    }

    pub fn root(&self) -> PathBuf {
        self.manager.config().plugin_root.clone()
    }

    /// A plugin staged outside the plugins root.
    pub fn stage(&self, gid: &str, version: &str) -> PluginFixture {
        let dir = self.temp.path().join("staging").join(format!("{gid}-{version}"));
        PluginFixture::at(dir, gid, version)
    }

    /// A plugin directory placed directly under the plugins root.
    pub fn on_disk(&self, dir_name: &str, gid: &str) -> PluginFixture {
        PluginFixture::at(self.root().join(dir_name), gid, "1.0.0")
    }
}
