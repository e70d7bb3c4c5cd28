//! End-to-End tests for table type reconciliation
//!
//! Tests the full lifecycle: default catalog -> edited rows -> commit ->
//! snapshot -> reload -> reconcile imports against instantiated types.
//! Uses the in-memory store as the storage collaborator.

use std::sync::Arc;
use tabletype_ids::TableId;
use tabletype_schema::{
    builtin,
    defaults::default_type_rows,
    field::type_field_owner,
    Applicability, ColumnDifference, ColumnFlag, DuplicateFieldRename, EditedRow, FieldDefinition, FieldStore,
    IncomingType, InputTypeRegistry, MemoryStore, NameTranslator, ReconcileError,
    ReconciliationEngine, ReconciliationOutcome, RenameDecision, RenamePolicy, ReservedWords,
    SemanticKind, StoreError, TypeRegistry, TypeStore,
};

fn fresh_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new(
        Arc::new(InputTypeRegistry::with_defaults().unwrap()),
        NameTranslator::new(ReservedWords::sql_defaults()),
    );
    registry.ensure_default_types().unwrap();
    registry
}

fn sensor_rows() -> Vec<EditedRow> {
    vec![
        EditedRow::new("Name", builtin::VARIABLE_NAME)
            .with_description("Sensor name")
            .with_flags(true, true, false, false),
        EditedRow::new("Order", builtin::INT_POSITIVE).with_description("Readout order"),
        EditedRow::new("Scale", builtin::FLOAT).with_flags(false, true, false, false),
        EditedRow::new("Enabled", builtin::BOOLEAN),
    ]
}

fn sensor() -> IncomingType {
    IncomingType::new("Sensor", "Sensor calibration table", sensor_rows())
}

/// Registry and store with Sensor committed and instantiated twice.
fn instantiated_sensor() -> (TypeRegistry, MemoryStore) {
    let mut registry = fresh_registry();
    let mut store = MemoryStore::new().with_reserved_words(["order", "user"]);
    for def in registry.iter() {
        store.replace_type_rows(def.name(), &def.to_storage_rows()).unwrap();
    }

    let outcome = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile(&sensor(), &mut RenamePolicy::NeverAllowRename)
        .unwrap();
    assert!(matches!(outcome, ReconciliationOutcome::New { replaced: false, .. }));

    store.add_table(TableId::parse("imu_sensors").unwrap(), "Sensor");
    store.add_table(TableId::parse("imu_sensors,thermal.t1").unwrap(), "Sensor");
    (registry, store)
}

// =============================================================================
// COMMIT AND RELOAD
// =============================================================================

/// Committed rows reload into the same definitions, hidden columns included
#[test]
fn test_snapshot_reload_preserves_definitions() {
    let (registry, store) = instantiated_sensor();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(&path, serde_json::to_string_pretty(&store).unwrap()).unwrap();
    let restored: MemoryStore = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    let translator = NameTranslator::new(restored.reserved_words().unwrap());
    let reloaded = TypeRegistry::load(
        Arc::new(InputTypeRegistry::with_defaults().unwrap()),
        translator,
        &restored.committed_type_rows().unwrap(),
    )
    .unwrap();

    assert_eq!(reloaded.type_names(), vec!["Command", "Sensor", "Structure"]);
    let sensor = reloaded.get("sensor").unwrap();
    assert_eq!(sensor.columns()[0].display_name, "_Key_");
    assert_eq!(sensor.columns()[1].display_name, "_Index_");
    assert_eq!(sensor.visible_column_count(), 4);
    assert_eq!(
        sensor.column_by_display_name("order").unwrap().storage_name,
        "\"order\""
    );
    assert_eq!(reloaded.to_storage_rows(), registry.to_storage_rows());
}

// =============================================================================
// MATCH
// =============================================================================

/// Reconciling the committed definition against itself is a clean Match
#[test]
fn test_unmodified_definition_matches() {
    let (mut registry, mut store) = instantiated_sensor();
    let rows_before = store.type_rows.clone();

    let outcome = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile(&sensor(), &mut RenamePolicy::NeverAllowRename)
        .unwrap();

    let ReconciliationOutcome::Match { type_name, changes } = outcome else {
        panic!("expected match");
    };
    assert_eq!(type_name, "Sensor");
    assert!(changes.is_empty());
    assert_eq!(changes.field_difference_count(), 0);
    assert_eq!(store.type_rows, rows_before);
}

/// Description-only edits match and are written to storage
#[test]
fn test_description_only_change_updates_storage() {
    let (mut registry, mut store) = instantiated_sensor();
    let mut rows = sensor_rows();
    rows[2].description = "Counts to engineering units".to_string();
    let incoming = IncomingType::new("Sensor", "Calibrated sensors", rows);

    let outcome = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile(&incoming, &mut RenamePolicy::NeverAllowRename)
        .unwrap();

    let ReconciliationOutcome::Match { changes, .. } = outcome else {
        panic!("expected match");
    };
    assert!(changes.type_description_changed);
    assert_eq!(changes.column_descriptions_changed, vec!["Scale"]);
    assert_eq!(changes.field_difference_count(), 0);

    let committed = store.rows_for_type("Sensor");
    assert_eq!(committed[0].description, "Calibrated sensors");
    let scale = committed.iter().find(|r| r.display_name == "Scale").unwrap();
    assert_eq!(scale.description, "Counts to engineering units");
    assert_eq!(registry.get("Sensor").unwrap().description(), "Calibrated sensors");
}

// =============================================================================
// MISMATCH
// =============================================================================

/// Flipping a required flag mismatches on exactly that column, without writes
#[test]
fn test_required_flip_mismatches_without_mutation() {
    let (mut registry, mut store) = instantiated_sensor();
    let rows_before = store.type_rows.clone();
    let mut rows = sensor_rows();
    rows[3].required = true;

    let outcome = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile(&IncomingType::new("Sensor", "", rows), &mut RenamePolicy::NeverAllowRename)
        .unwrap();

    let ReconciliationOutcome::Mismatch(mismatch) = outcome else {
        panic!("expected mismatch");
    };
    assert_eq!(mismatch.type_name, "Sensor");
    assert_eq!(
        mismatch.columns,
        vec![ColumnDifference::Flag {
            display_name: "Enabled".to_string(),
            flag: ColumnFlag::Required,
            existing: false,
            incoming: true,
        }]
    );
    assert_eq!(store.type_rows, rows_before);
    assert!(!registry.get("Sensor").unwrap().column_by_display_name("Enabled").unwrap().required);
}

/// A renamed column reads as one missing column plus one extra column
#[test]
fn test_column_rename_mismatches() {
    let (mut registry, mut store) = instantiated_sensor();
    let mut rows = sensor_rows();
    rows[1].display_name = "Sequence".to_string();

    let outcome = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile(&IncomingType::new("Sensor", "", rows), &mut RenamePolicy::NeverAllowRename)
        .unwrap();

    let ReconciliationOutcome::Mismatch(mismatch) = outcome else {
        panic!("expected mismatch");
    };
    assert_eq!(
        mismatch.columns,
        vec![
            ColumnDifference::Missing {
                display_name: "Order".to_string()
            },
            ColumnDifference::Extra {
                display_name: "Sequence".to_string()
            },
        ]
    );
}

/// Deleting a column and adding another is indistinguishable from a rename
#[test]
fn test_delete_and_add_mismatches() {
    let (mut registry, mut store) = instantiated_sensor();
    let mut rows = sensor_rows();
    rows.remove(1);
    rows.push(EditedRow::new("Offset", builtin::FLOAT));

    let outcome = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile(&IncomingType::new("Sensor", "", rows), &mut RenamePolicy::NeverAllowRename)
        .unwrap();

    let ReconciliationOutcome::Mismatch(mismatch) = outcome else {
        panic!("expected mismatch");
    };
    let names: Vec<&str> = mismatch.columns.iter().map(|d| d.display_name()).collect();
    assert_eq!(names, vec!["Order", "Offset"]);
    assert!(matches!(mismatch.columns[0], ColumnDifference::Missing { .. }));
    assert!(matches!(mismatch.columns[1], ColumnDifference::Extra { .. }));
}

/// Display names are compared exactly
#[test]
fn test_recased_display_name_mismatches() {
    let (mut registry, mut store) = instantiated_sensor();
    let mut rows = sensor_rows();
    rows[2].display_name = "SCALE".to_string();

    let outcome = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile(&IncomingType::new("Sensor", "", rows), &mut RenamePolicy::NeverAllowRename)
        .unwrap();
    assert!(outcome.is_mismatch());
}

// =============================================================================
// DATA FIELD CASCADE
// =============================================================================

/// New type fields reach every applicable table; conflicts are renamed
#[test]
fn test_field_cascade_with_adopt_and_rename() {
    let (mut registry, mut store) = instantiated_sensor();
    store
        .upsert_fields(&[
            // same meaning as the incoming Subsystem field
            FieldDefinition::new("imu_sensors", "Subsystem", builtin::TEXT).with_value("GNC"),
            // different meaning from the incoming Rate field
            FieldDefinition::new("imu_sensors", "Rate", builtin::INTEGER).with_value("10"),
        ])
        .unwrap();

    let incoming = sensor().with_fields(vec![
        FieldDefinition::new("", "Subsystem", builtin::TEXT).with_value("GNC"),
        FieldDefinition::new("", "Rate", builtin::FLOAT)
            .with_value("1.5")
            .with_applicability(Applicability::RootsOnly),
    ]);

    let mut conflicts = Vec::new();
    let report = {
        let mut policy = RenamePolicy::Prompt(Box::new(|c: &DuplicateFieldRename| {
            conflicts.push(c.clone());
            RenameDecision::Allow
        }));
        ReconciliationEngine::new(&mut registry, &mut store)
            .reconcile_batch(&[incoming], &mut policy)
            .unwrap()
    };

    assert!(report.applied);
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].field_name, "Rate");
    assert_eq!(conflicts[0].affected_tables, vec![TableId::parse("imu_sensors").unwrap()]);

    assert_eq!(store.fields_for_owner(&type_field_owner("Sensor")).unwrap().len(), 2);

    let mut root: Vec<(String, bool)> = store
        .fields_for_owner("imu_sensors")
        .unwrap()
        .into_iter()
        .map(|f| (f.field_name, f.inherited))
        .collect();
    root.sort();
    assert_eq!(
        root,
        vec![
            ("Rate".to_string(), true),
            ("Rate_1".to_string(), false),
            ("Subsystem".to_string(), true),
        ]
    );

    // the child table only receives fields that apply to children
    let child = store.fields_for_owner("imu_sensors,thermal.t1").unwrap();
    assert_eq!(child.len(), 1);
    assert_eq!(child[0].field_name, "Subsystem");
}

/// Declining a rename aborts the whole batch before any write
#[test]
fn test_declined_rename_leaves_everything_untouched() {
    let (mut registry, mut store) = instantiated_sensor();
    store
        .upsert_fields(&[FieldDefinition::new("imu_sensors", "Rate", builtin::INTEGER)])
        .unwrap();
    let fields_before = store.fields.clone();
    let rows_before = store.type_rows.clone();
    let types_before = registry.type_names();

    let batch = [
        IncomingType::new("Telemetry", "Packets", default_type_rows(SemanticKind::Structure)),
        sensor().with_fields(vec![FieldDefinition::new("", "Rate", builtin::FLOAT)]),
    ];
    let mut policy = RenamePolicy::Prompt(Box::new(|_: &DuplicateFieldRename| RenameDecision::Decline));
    let err = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile_batch(&batch, &mut policy)
        .unwrap_err();

    assert!(matches!(err, ReconcileError::Aborted { ref field_name, .. } if field_name == "Rate"));
    assert_eq!(store.fields, fields_before);
    assert_eq!(store.type_rows, rows_before);
    assert_eq!(registry.type_names(), types_before);
}

// =============================================================================
// BATCHES
// =============================================================================

/// One mismatch keeps every other type in the batch from being committed
#[test]
fn test_mismatch_in_batch_applies_nothing() {
    let (mut registry, mut store) = instantiated_sensor();
    let mut rows = sensor_rows();
    rows[0].input_type = builtin::ALPHANUMERIC.to_string();

    let batch = [
        IncomingType::new("Telemetry", "Packets", default_type_rows(SemanticKind::Structure)),
        IncomingType::new("Sensor", "", rows),
    ];
    let report = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile_batch(&batch, &mut RenamePolicy::AlwaysAllowRename)
        .unwrap();

    assert!(!report.applied);
    assert!(matches!(
        report.first_mismatch().unwrap().columns.as_slice(),
        [ColumnDifference::InputType { display_name, .. }] if display_name == "Name"
    ));
    assert!(!registry.contains("Telemetry"));
    assert!(store.rows_for_type("Telemetry").is_empty());
}

/// A committed type with no tables is replaced outright
#[test]
fn test_uninstantiated_type_is_new() {
    let mut registry = fresh_registry();
    let mut store = MemoryStore::new();
    let mut engine = ReconciliationEngine::new(&mut registry, &mut store);

    // Structure is committed but has no tables yet
    let mut rows = default_type_rows(SemanticKind::Structure);
    rows.push(EditedRow::new("Notes", builtin::TEXT));
    let report = engine
        .reconcile_batch(
            &[IncomingType::new("Structure", "Reworked", rows)],
            &mut RenamePolicy::NeverAllowRename,
        )
        .unwrap();

    assert!(report.applied);
    assert!(matches!(
        report.outcome_for("Structure"),
        Some(ReconciliationOutcome::New { replaced: true, is_structure: true, .. })
    ));
    assert_eq!(report.structure_types_added, vec!["Structure"]);
    assert!(registry.get("Structure").unwrap().column_by_display_name("Notes").is_some());
}

/// Storage failures surface unchanged
#[test]
fn test_storage_failure_passes_through() {
    let (mut registry, mut store) = instantiated_sensor();
    store.set_offline(true);

    let err = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile_batch(&[sensor()], &mut RenamePolicy::NeverAllowRename)
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Store(StoreError::Unavailable(_))));
}

// =============================================================================
// CLASSIFICATION THROUGH RECONCILIATION
// =============================================================================

/// A user type gains structure behavior by carrying the template columns
#[test]
fn test_user_type_classified_as_structure() {
    let mut registry = fresh_registry();
    let mut store = MemoryStore::new();
    let rows = vec![
        EditedRow::new("Param", builtin::VARIABLE_NAME),
        EditedRow::new("Type", builtin::PRIM_AND_STRUCT),
        EditedRow::new("Count", builtin::ARRAY_INDEX),
        EditedRow::new("Bits", builtin::BIT_LENGTH),
        EditedRow::new("Rate", builtin::RATE),
        EditedRow::new("Enum", builtin::ENUMERATION),
    ];
    let report = ReconciliationEngine::new(&mut registry, &mut store)
        .reconcile_batch(&[IncomingType::new("Housekeeping", "", rows)], &mut RenamePolicy::NeverAllowRename)
        .unwrap();

    assert_eq!(report.structure_types_added, vec!["Housekeeping"]);
    let def = registry.get("Housekeeping").unwrap();
    assert!(def.is_structure());
    assert!(!def.is_command());
    assert_eq!(def.column_by_display_name("Param").unwrap().storage_name, "variable_name");
    assert_eq!(def.column_by_display_name("Count").unwrap().storage_name, "array_size");
    assert_eq!(registry.structure_type_names(), vec!["Housekeeping", "Structure"]);
}
