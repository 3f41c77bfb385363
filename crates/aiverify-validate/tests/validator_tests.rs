mod common;

use aiverify_core::{ComponentKind, ValidationError};
use serde_json::json;
use tempfile::TempDir;

use common::{validator, PluginFixture};

#[tokio::test]
async fn test_valid_plugin_returns_meta() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "aiverify.test.full");
    plugin
        .widget("bar", json!({"dependencies": [{"cid": "line"}]}))
        .widget("line", json!({}))
        .input_block("checklist")
        .template("report")
        .algorithm("shap");

    let meta = validator().validate(plugin.path()).await.unwrap();
    assert_eq!(meta.gid, "aiverify.test.full");
    assert_eq!(meta.version, "1.0.0");
}

#[tokio::test]
async fn test_plugin_without_components_is_valid() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "empty");
    assert_eq!(validator().validate(plugin.path()).await.unwrap().gid, "empty");
}

#[tokio::test]
async fn test_missing_plugin_meta() {
    let temp = TempDir::new().unwrap();
    let err = validator().validate(temp.path()).await.unwrap_err();
    assert!(matches!(err, ValidationError::SchemaInvalid { kind: None, .. }));
}

#[tokio::test]
async fn test_plugin_meta_schema_violation() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.json("plugin.meta.json", &json!({"gid": "../escape", "name": "x"}));

    let err = validator().validate(plugin.path()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("plugin schema invalid"), "{message}");
    assert!(message.contains("/gid"), "{message}");
}

#[tokio::test]
async fn test_widget_schema_error_names_cid() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.widget("bar", json!({"widgetSize": {"minW": 0, "minH": 1, "maxW": 12, "maxH": 36}}));

    let err = validator().validate(plugin.path()).await.unwrap_err();
    match err {
        ValidationError::SchemaInvalid { kind, cid, .. } => {
            assert_eq!(kind, Some(ComponentKind::Widget));
            assert_eq!(cid.as_deref(), Some("bar"));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[tokio::test]
async fn test_missing_algorithm_assets_are_distinct() {
    for asset in ["shap.py", "requirements.txt", "input.schema.json", "output.schema.json"] {
        let temp = TempDir::new().unwrap();
        let plugin = PluginFixture::new(temp.path(), "p");
        plugin.algorithm("shap").remove(&format!("algorithms/shap/{asset}"));

        let err = validator().validate(plugin.path()).await.unwrap_err();
        match err {
            ValidationError::MissingAsset { kind, cid, asset: missing } => {
                assert_eq!(kind, ComponentKind::Algorithm);
                assert_eq!(cid, "shap");
                assert_eq!(missing, asset);
            }
            other => panic!("unexpected error for {asset}: {other}"),
        }
    }
}

#[tokio::test]
async fn test_algorithm_schema_must_be_object() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.algorithm("shap").write("algorithms/shap/input.schema.json", "[1, 2]");

    let err = validator().validate(plugin.path()).await.unwrap_err();
    assert!(err.to_string().contains("input.schema.json must be a JSON object"), "{err}");
}

#[tokio::test]
async fn test_python_syntax_failure_names_component() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.algorithm("shap").write("algorithms/shap/shap.py", "def (: syntax error");

    let err = validator().validate(plugin.path()).await.unwrap_err();
    assert!(matches!(err, ValidationError::ContentInvalid { kind: ComponentKind::Algorithm, ref cid, .. } if cid == "shap"));
}

#[tokio::test]
async fn test_mock_data_path_traversal() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.widget(
        "bar",
        json!({"mockdata": [{"type": "Algorithm", "cid": "shap", "datapath": "../../etc/passwd"}]}),
    );

    let err = validator().validate(plugin.path()).await.unwrap_err();
    assert!(matches!(err, ValidationError::PathTraversal { .. }));
    assert_eq!(err.to_string(), "Invalid data path: ../../etc/passwd");
}

#[tokio::test]
async fn test_mock_data_must_be_json() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin
        .widget(
            "bar",
            json!({"mockdata": [{"type": "Algorithm", "cid": "shap", "datapath": "widgets/sample.json"}]}),
        )
        .write("widgets/sample.json", "not json");

    let err = validator().validate(plugin.path()).await.unwrap_err();
    assert!(matches!(err, ValidationError::ContentInvalid { kind: ComponentKind::Widget, .. }));

    plugin.json("widgets/sample.json", &json!({"results": []}));
    assert!(validator().validate(plugin.path()).await.is_ok());
}

#[tokio::test]
async fn test_template_data_validated() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.template("report").json("templates/report.data.json", &json!({"globalVars": []}));

    let err = validator().validate(plugin.path()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("report.data.json"), "{message}");
    assert!(message.contains("'report'"), "{message}");

    plugin.remove("templates/report.data.json");
    let err = validator().validate(plugin.path()).await.unwrap_err();
    assert!(matches!(err, ValidationError::MissingAsset { kind: ComponentKind::Template, .. }));
}

#[tokio::test]
async fn test_input_block_requires_summary() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.input_block("checklist").remove("inputs/checklist.summary.mdx");

    let err = validator().validate(plugin.path()).await.unwrap_err();
    assert_eq!(err.to_string(), "InputBlock 'checklist' is missing checklist.summary.mdx");
}

#[tokio::test]
async fn test_duplicate_cid_rejected() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin
        .widget("bar", json!({}))
        .json("widgets/bar-copy.meta.json", &json!({"cid": "bar", "name": "Copy"}));

    let err = validator().validate(plugin.path()).await.unwrap_err();
    assert!(matches!(err, ValidationError::DuplicateComponent { kind: ComponentKind::Widget, ref cid } if cid == "bar"));
}

#[tokio::test]
async fn test_duplicate_cid_across_kinds_rejected() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.widget("x", json!({})).input_block("x");

    let err = validator().validate(plugin.path()).await.unwrap_err();
    assert!(matches!(err, ValidationError::DuplicateComponent { kind: ComponentKind::InputBlock, ref cid } if cid == "x"));
}

#[tokio::test]
async fn test_validation_has_no_side_effects() {
    let temp = TempDir::new().unwrap();
    let plugin = PluginFixture::new(temp.path(), "p");
    plugin.widget("bar", json!({})).algorithm("shap");

    let before = snapshot(plugin.path());
    validator().validate(plugin.path()).await.unwrap();
    validator().validate(plugin.path()).await.unwrap();
    assert_eq!(snapshot(plugin.path()), before);
}

fn snapshot(dir: &std::path::Path) -> Vec<(String, Vec<u8>)> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(d) = stack.pop() {
        for entry in std::fs::read_dir(&d).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push((path.display().to_string(), std::fs::read(&path).unwrap()));
            }
        }
    }
    files.sort();
    files
}
