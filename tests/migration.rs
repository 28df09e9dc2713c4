//! Schema loading and migration planning against fixture snapshots

use vault_schemas::migrate::{diff, diff_snapshots, MigrationOp};
use vault_schemas::{resolve, LinkFormat, RawSchema, VersionBump};

fn v1() -> RawSchema {
    RawSchema::from_json_str(include_str!("fixtures/vault.schema.json")).unwrap()
}

fn v2() -> RawSchema {
    RawSchema::from_json_str(include_str!("fixtures/vault.schema.v2.json")).unwrap()
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_toml_snapshot_resolves() {
    let raw = RawSchema::from_toml_str(include_str!("fixtures/vault.schema.toml")).unwrap();
    let schema = resolve(&raw).unwrap();

    assert_eq!(schema.link_format(), LinkFormat::Markdown);
    let task = schema.get("task").unwrap();
    assert_eq!(task.output_dir, "objectives/tasks");
    assert!(task.field("status").unwrap().required);
    assert_eq!(schema.options_for(task.field("status").unwrap()), Some(&["raw".to_string(), "done".to_string()][..]));
}

#[test]
fn test_load_by_extension() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("schema.json");
    let yaml_path = dir.path().join("schema.yaml");
    std::fs::write(&json_path, include_str!("fixtures/vault.schema.json")).unwrap();
    std::fs::write(&yaml_path, "types: {}\n").unwrap();

    assert_eq!(RawSchema::load(&json_path).unwrap(), v1());
    assert!(RawSchema::load(&yaml_path).is_err());
}

#[test]
fn test_fixture_ownership_map() {
    let schema = resolve(&v1()).unwrap();
    let owners = schema.ownership().owners_of("research");
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].owner_type, "project");
    assert_eq!(owners[0].field, "research");
    assert!(schema.ownership().owners_of("task").is_empty());
}

// =============================================================================
// Diffing
// =============================================================================

#[test]
fn test_v1_to_v2_plan() {
    let plan = diff_snapshots(&v1(), &v2()).unwrap();

    assert_eq!(plan.from_version, "1.0.0");
    assert_eq!(plan.to_version, "1.1.0");
    assert!(plan.has_changes);

    assert_eq!(
        plan.deterministic,
        vec![
            MigrationOp::AddType { type_name: "meeting".into(), extends: None },
            MigrationOp::AddField { type_name: "task".into(), field: "due_date".into(), default: None },
            MigrationOp::AddEnumValue { enum_name: "status".into(), value: "archived".into() },
        ]
    );
    assert_eq!(
        plan.non_deterministic,
        vec![
            MigrationOp::RemoveType { type_name: "idea".into() },
            MigrationOp::RemoveField { type_name: "task".into(), field: "due".into(), possible_rename: None },
        ]
    );

    assert_eq!(plan.suggested_bump, VersionBump::Major);
    assert_eq!(plan.suggested_version.as_deref(), Some("2.0.0"));
    assert!(!plan.declared_version_sufficient());
    assert_eq!(plan.from_checksum, v1().checksum().unwrap());
}

#[test]
fn test_reverse_plan_swaps_classes() {
    let plan = diff(&v2(), &v1(), "1.1.0", "2.0.0").unwrap();
    let names: Vec<&str> = plan.ops().map(MigrationOp::name).collect();
    assert_eq!(
        names,
        vec!["add-type", "add-field", "remove-type", "remove-field", "remove-enum-value"]
    );
}

#[test]
fn test_identical_snapshots() {
    let plan = diff(&v1(), &v1(), "1.0.0", "1.0.0").unwrap();
    assert!(!plan.has_changes);
    assert_eq!(plan.suggested_bump, VersionBump::None);
    assert!(plan.declared_version_sufficient());
}

#[test]
fn test_plan_json_round_trip() {
    let plan = diff_snapshots(&v1(), &v2()).unwrap();
    let json = serde_json::to_value(&plan).unwrap();
    assert_eq!(json["suggested_bump"], "major");
    assert_eq!(json["deterministic"][0]["op"], "add-type");

    let back: vault_schemas::MigrationPlan = serde_json::from_value(json).unwrap();
    assert_eq!(back, plan);
}
