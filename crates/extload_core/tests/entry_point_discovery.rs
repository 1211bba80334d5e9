use extload_core::{
    EntryPoint, EntryPointDiscovery, EntryPointParseError, EntryPointTable, EntryStage,
    ExtensionKey, ExtensionRegistrar, Namespace, SymbolTable,
};
use std::io::Write;

const ENTRY_POINTS: &str = "\
[interpret_ext_glassbox]
Linear = acme_ext.glassbox:LinearExplainer
Rules = acme_ext.glassbox:RuleExplainer [rules]
1bad = acme_ext.glassbox:Bad
Ghost = acme_ext.missing:Ghost

[interpret_ext_visual]
Dashboard = acme_ext.visual:Dashboard
";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Component {
    Explainer(&'static str),
    Visualizer(&'static str),
}

fn write_entry_points(text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(text.as_bytes()).expect("write entry points");
    file
}

fn symbols() -> SymbolTable<Component> {
    let mut symbols = SymbolTable::new();
    symbols
        .define(
            "acme_ext.glassbox:LinearExplainer",
            Component::Explainer("linear"),
        )
        .define(
            "acme_ext.glassbox:RuleExplainer",
            Component::Visualizer("rules"),
        )
        .define("acme_ext.glassbox:Bad", Component::Explainer("bad"))
        .define("acme_ext.visual:Dashboard", Component::Visualizer("dash"));
    symbols
}

#[test]
fn registers_entry_points_from_metadata_file() {
    let file = write_entry_points(ENTRY_POINTS);
    let table = EntryPointTable::from_path(file.path()).expect("entry points should parse");
    let registrar = ExtensionRegistrar::new(EntryPointDiscovery::new(table, symbols()));
    let mut namespace = Namespace::new("interpret.glassbox");

    let report = registrar.register(
        &mut namespace,
        &ExtensionKey::from("interpret_ext_glassbox"),
        |component: &Component| matches!(component, Component::Explainer(_)),
    );

    assert_eq!(report.bound, vec!["Linear"]);
    assert_eq!(
        namespace.get("Linear"),
        Some(&Component::Explainer("linear"))
    );

    let stages: Vec<(&str, EntryStage)> = report
        .warnings
        .iter()
        .map(|warning| (warning.name.as_str(), warning.stage))
        .collect();
    assert_eq!(
        stages,
        vec![
            ("Rules", EntryStage::ValidatingShape),
            ("1bad", EntryStage::ValidatingName),
            ("Ghost", EntryStage::Resolving),
        ]
    );
    assert_eq!(
        report.warnings[0].entry,
        "Rules = acme_ext.glassbox:RuleExplainer [rules]"
    );
    assert!(report.warnings[2]
        .message
        .contains("`acme_ext.missing:Ghost` is not defined"));
}

#[test]
fn groups_are_isolated_by_key() {
    let table = EntryPointTable::parse(ENTRY_POINTS).expect("parse");
    let registrar = ExtensionRegistrar::new(EntryPointDiscovery::new(table, symbols()));
    let mut namespace = Namespace::new("interpret.visual");

    let report = registrar.register(
        &mut namespace,
        &ExtensionKey::from("interpret_ext_visual"),
        |component: &Component| matches!(component, Component::Visualizer(_)),
    );

    assert!(report.is_clean());
    assert_eq!(namespace.names(), vec!["Dashboard"]);
}

#[test]
fn declaration_only_table_binds_entry_metadata() {
    let table = EntryPointTable::parse(ENTRY_POINTS).expect("parse");
    let registrar = ExtensionRegistrar::new(&table);
    let mut namespace: Namespace<EntryPoint> = Namespace::new("dry-run");

    let report = registrar.register(
        &mut namespace,
        &ExtensionKey::from("interpret_ext_glassbox"),
        |entry: &EntryPoint| entry.target.attr.is_some(),
    );

    assert_eq!(report.bound, vec!["Linear", "Rules", "Ghost"]);
    assert_eq!(report.failed_names(), vec!["1bad"]);
    let rules = namespace.get("Rules").expect("rules entry");
    assert_eq!(rules.extras, vec!["rules"]);
}

#[test]
fn entry_points_serialize_with_stable_fields() {
    let table = EntryPointTable::parse(ENTRY_POINTS).expect("parse");
    let rules = &table.entries()[1];

    let json = serde_json::to_value(rules).expect("serialize entry point");
    assert_eq!(json["group"], "interpret_ext_glassbox");
    assert_eq!(json["name"], "Rules");
    assert_eq!(json["target"]["module"], "acme_ext.glassbox");
    assert_eq!(json["target"]["attr"], "RuleExplainer");
    assert_eq!(json["extras"][0], "rules");

    let linear = serde_json::to_value(&table.entries()[0]).expect("serialize entry point");
    assert!(linear.get("extras").is_none());

    let decoded: EntryPoint = serde_json::from_value(json).expect("deserialize entry point");
    assert_eq!(&decoded, rules);
}

#[test]
fn missing_file_is_reported_as_io_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("entry_points.txt");

    let err = EntryPointTable::from_path(&missing).expect_err("missing file must fail");
    assert!(matches!(err, EntryPointParseError::Io { ref path, .. } if path == &missing));
}
