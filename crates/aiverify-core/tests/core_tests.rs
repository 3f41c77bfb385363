use aiverify_core::{
    Component, ComponentBase, ComponentIds, ComponentKey, ComponentKind, InputBlock, Plugin,
    PluginError, PluginMeta, Registry, RegistryKey, ReportWidget, ValidationError,
    WidgetDependency, WidgetStatus,
};
use serde_json::json;

fn widget(plugin: &str, cid: &str, deps: Vec<WidgetDependency>) -> ReportWidget {
    ReportWidget {
        base: ComponentBase::new(plugin, "1.0.0", cid, cid),
        tags: vec![],
        dependencies: deps,
        mdx_path: format!("widgets/{cid}.mdx"),
        mock_data: vec![],
        widget_size: None,
        properties: vec![],
        dynamic_height: false,
        status: WidgetStatus::Ok,
    }
}

#[test]
fn test_component_wire_format() {
    let component = Component::ReportWidget(widget("aiverify.stock.decorators", "divider", vec![]));
    let value = serde_json::to_value(&component).unwrap();

    assert_eq!(value["type"], "ReportWidget");
    assert_eq!(value["gid"], "aiverify.stock.decorators:divider");
    assert_eq!(value["pluginGID"], "aiverify.stock.decorators");
    assert_eq!(value["mdxPath"], "widgets/divider.mdx");
    assert_eq!(value["status"], "OK");

    let back: Component = serde_json::from_value(value).unwrap();
    assert_eq!(back, component);
}

#[test]
fn test_input_block_decodes_from_record() {
    let record = json!({
        "type": "InputBlock",
        "cid": "checklist",
        "gid": "p:checklist",
        "version": "1.0.0",
        "pluginGID": "p",
        "name": "Checklist",
        "fullScreen": true,
        "mdxPath": "inputs/checklist.mdx",
        "summaryMdxPath": "inputs/checklist.summary.mdx"
    });
    let Component::InputBlock(block): Component = serde_json::from_value(record).unwrap() else {
        panic!("expected input block");
    };
    let expected = InputBlock {
        base: ComponentBase::new("p", "1.0.0", "checklist", "Checklist"),
        width: None,
        full_screen: true,
        mdx_path: "inputs/checklist.mdx".to_string(),
        summary_mdx_path: "inputs/checklist.summary.mdx".to_string(),
    };
    assert_eq!(block, expected);
}

#[test]
fn test_keys_address_components() {
    let component = Component::ReportWidget(widget("p", "bar", vec![]));
    let key = ComponentKey::from_gid(component.kind(), component.gid()).unwrap();
    assert_eq!(RegistryKey::from(key).to_string(), "widget:p:bar");

    let patterns = RegistryKey::all_patterns();
    for kind in ["widget:*", "inputBlock:*", "algo:*", "template:*", "plugin:*", "projectTemplate:*"] {
        assert!(patterns.iter().any(|p| p == kind), "missing {kind}");
    }
    assert_eq!(ComponentKind::Algorithm.dir_name(), "algorithms");
    assert_eq!(ComponentKind::Widget.index_field(), "reportWidgets");
}

#[test]
fn test_registry_snapshot_orders_and_resolves() {
    let mut late = Plugin::new(
        PluginMeta::new("late", "Late"),
        ComponentIds {
            report_widgets: vec!["chart".to_string()],
            ..ComponentIds::default()
        },
        200,
    );
    late.report_widgets = vec![widget(
        "late",
        "chart",
        vec![
            WidgetDependency::new("early:base", Some(">=1.0.0".to_string())),
            WidgetDependency::new("missing:thing", None),
        ],
    )];

    let mut early = Plugin::new(PluginMeta::new("early", "Early"), ComponentIds::default(), 100);
    early.report_widgets = vec![widget("early", "base", vec![])];

    let registry = Registry::from_plugins(vec![late, early], vec!["early".to_string()]);
    let gids: Vec<&str> = registry.plugins.iter().map(Plugin::gid).collect();
    assert_eq!(gids, ["early", "late"]);

    let chart = registry.widget("late:chart").unwrap();
    assert!(chart.dependencies[0].valid);
    assert!(!chart.dependencies[1].valid);
    assert_eq!(chart.status, WidgetStatus::MissingDependencies);
    assert_eq!(registry.report_widgets.len(), 2);
}

#[test]
fn test_error_messages() {
    let err = ValidationError::missing(ComponentKind::Algorithm, "shap", "requirements.txt");
    assert_eq!(err.to_string(), "Algorithm 'shap' is missing requirements.txt");

    let err: PluginError = ValidationError::PathTraversal {
        path: "../../etc/passwd".into(),
    }
    .into();
    assert_eq!(err.to_string(), "Invalid data path: ../../etc/passwd");

    let err = PluginError::InvalidGid {
        gid: "../escape".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid GID: ../escape");
}
