//! Integration tests for schema-to-loaded-type synthesis.
//!
//! Tests the complete workflow from schema translation to instance use.

use rust_decimal::Decimal;
use tempfile::TempDir;

use typeforge_core::compile::ModuleImage;
use typeforge_core::model::min_date;
use typeforge_core::{
    ContractMember, EmissionPath, Error, ForgeDirs, PrimitiveKind, SchemaColumn, SchemaDocument,
    SynthesisConfig, SynthesisRequest, SynthesisStage, Synthesizer, Value, ViewModel,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn employee_columns() -> Vec<SchemaColumn> {
    vec![
        SchemaColumn::new("Id", PrimitiveKind::Int32),
        SchemaColumn::new("Name", PrimitiveKind::String),
        SchemaColumn::new("Age", PrimitiveKind::Int32),
    ]
}

fn employee(emit: EmissionPath) -> SynthesisRequest {
    SynthesisRequest::new("Employee", employee_columns())
        .namespace("Hr")
        .emit(emit)
}

fn in_memory() -> Synthesizer {
    Synthesizer::new(SynthesisConfig::in_memory())
}

const PATHS: [EmissionPath; 2] = [EmissionPath::Metadata, EmissionPath::Source];

// =============================================================================
// Round trip and defaults
// =============================================================================

#[test]
fn test_property_names_round_trip() {
    let columns = vec![
        SchemaColumn::new("Zeta", PrimitiveKind::String),
        SchemaColumn::new("Alpha", PrimitiveKind::Int64),
        SchemaColumn::new("Mid", PrimitiveKind::Decimal),
        SchemaColumn::new("Born", PrimitiveKind::Date),
    ];

    for path in PATHS {
        let request = SynthesisRequest::new("Record", columns.clone()).emit(path);
        let synthesis = in_memory().synthesize(&request).unwrap();
        let handle = synthesis.get_type("Record").unwrap();
        assert_eq!(
            handle.property_names(),
            vec!["Zeta", "Alpha", "Mid", "Born"],
            "property order on the {path} path"
        );
    }
}

#[test]
fn test_employee_defaults() {
    for path in PATHS {
        let synthesis = in_memory().synthesize(&employee(path)).unwrap();
        let employee = synthesis.get_type("Hr.Employee").unwrap().create().unwrap();

        assert_eq!(employee.get("Id").unwrap(), Value::Int32(0));
        assert_eq!(employee.get("Name").unwrap(), Value::String(String::new()));
        assert_eq!(employee.get("Age").unwrap(), Value::Int32(0));
    }
}

#[test]
fn test_default_for_every_kind() {
    let columns: Vec<SchemaColumn> = PrimitiveKind::ALL
        .iter()
        .map(|kind| SchemaColumn::new(format!("{kind:?}Column"), *kind))
        .collect();

    for path in PATHS {
        let request = SynthesisRequest::new("Everything", columns.clone()).emit(path);
        let synthesis = in_memory().synthesize(&request).unwrap();
        let instance = synthesis.get_type("Everything").unwrap().create().unwrap();

        assert_eq!(instance.get("Int32Column").unwrap(), Value::Int32(0));
        assert_eq!(instance.get("Int64Column").unwrap(), Value::Int64(0));
        assert_eq!(instance.get("Float64Column").unwrap(), Value::Float64(0.0));
        assert_eq!(instance.get("BoolColumn").unwrap(), Value::Bool(false));
        assert_eq!(instance.get("StringColumn").unwrap(), Value::String(String::new()));
        assert_eq!(instance.get("DateColumn").unwrap(), Value::Date(min_date()));
        assert_eq!(instance.get("DecimalColumn").unwrap(), Value::Decimal(Decimal::ZERO));
        assert_eq!(instance.get("ObjectColumn").unwrap(), Value::Null);
    }
}

#[test]
fn test_setters_reject_wrong_kind() {
    let synthesis = in_memory().synthesize(&employee(EmissionPath::Metadata)).unwrap();
    let employee = synthesis.get_type("Employee").unwrap().create().unwrap();

    employee.set("Age", 41).unwrap();
    assert_eq!(employee.get("Age").unwrap(), Value::Int32(41));
    assert!(employee.set("Age", "forty-one").is_err());
    assert!(matches!(
        employee.get("Salary"),
        Err(Error::MemberNotFound { .. })
    ));
}

// =============================================================================
// Determinism across emission paths
// =============================================================================

#[test]
fn test_paths_produce_equivalent_types() {
    let synthesizer = in_memory();
    let mut images = Vec::new();
    for path in PATHS {
        let request = employee(path).view_model(true);
        let synthesis = synthesizer.synthesize(&request).unwrap();
        let bytes = &synthesis.compiled().unwrap().bytes;
        images.push(ModuleImage::decode(bytes).unwrap());
    }

    let (metadata, source) = (&images[0], &images[1]);
    assert_eq!(metadata.types.len(), source.types.len());
    for (a, b) in metadata.types.iter().zip(&source.types) {
        assert_eq!(a.full_name(), b.full_name());
        assert_eq!(a.property_names(), b.property_names());
        assert_eq!(a.method_names(), b.method_names());
        for (pa, pb) in a.properties.iter().zip(&b.properties) {
            assert_eq!(pa.getter, pb.getter);
            assert_eq!(pa.setter, pb.setter);
        }
    }
}

#[test]
fn test_same_request_twice_is_identical() {
    let synthesizer = in_memory();
    let request = employee(EmissionPath::Metadata).view_model(true);
    let first = synthesizer.synthesize(&request).unwrap();
    let second = synthesizer.synthesize(&request).unwrap();
    assert_eq!(
        first.compiled().unwrap().bytes,
        second.compiled().unwrap().bytes
    );
}

// =============================================================================
// View-model contract
// =============================================================================

#[test]
fn test_capability_completeness() {
    for path in PATHS {
        let request = employee(path).view_model(true);
        let synthesis = in_memory().synthesize(&request).unwrap();
        let methods = synthesis.get_type("EmployeeVM").unwrap().method_names();
        for member in ContractMember::ALL {
            assert!(
                methods.iter().any(|m| m == member.name()),
                "{} missing on the {path} path",
                member.name()
            );
        }
    }
}

#[test]
fn test_clone_copies_values_into_distinct_instance() {
    let synthesis = in_memory()
        .synthesize(&employee(EmissionPath::Source).view_model(true))
        .unwrap();
    let vm = ViewModel::new(synthesis.get_type("EmployeeVM").unwrap().create().unwrap()).unwrap();
    vm.set("Id", 1).unwrap();
    vm.set("Name", "Alice").unwrap();
    vm.set("Age", 30).unwrap();

    let copy = vm.clone_vm().unwrap();
    assert!(!copy.instance().ptr_eq(vm.instance()));
    assert_eq!(copy.get("Id").unwrap(), Value::Int32(1));
    assert_eq!(copy.get("Name").unwrap(), Value::from("Alice"));
    assert_eq!(copy.get("Age").unwrap(), Value::Int32(30));

    copy.set("Name", "Bob").unwrap();
    assert_eq!(vm.get("Name").unwrap(), Value::from("Alice"));
}

#[test]
fn test_list_members() {
    let synthesis = in_memory()
        .synthesize(&employee(EmissionPath::Metadata).view_model(true))
        .unwrap();
    let handle = synthesis.get_type("EmployeeVM").unwrap();
    let new_vm = || ViewModel::new(handle.create().unwrap()).unwrap();

    let first = new_vm();
    first.set("Name", "Alice").unwrap();
    let list = first.add_item_to_list(&[]).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(first.get("RowId").unwrap(), Value::Int32(1));

    let second = new_vm();
    second.set("Name", "Bob").unwrap();
    let list = second.add_item_to_list(&list).unwrap();
    assert_eq!(second.get("RowId").unwrap(), Value::Int32(2));

    let edited = second.clone_vm().unwrap();
    edited.set("Name", "Robert").unwrap();
    let list = edited.update_list(&list, false).unwrap();
    assert_eq!(list[1].get("Name").unwrap(), Value::from("Robert"));

    let list = first.delete_item_from_list(&list).unwrap();
    assert_eq!(list.len(), 1);
    assert!(list[0].instance().ptr_eq(second.instance()));

    let staged = new_vm();
    let with_staged = staged.add_item_to_list(&list).unwrap();
    let committed = staged.update_list(&with_staged, true).unwrap();
    assert_eq!(committed.len(), 1);
}

#[test]
fn test_validate_without_list_is_empty() {
    let synthesis = in_memory()
        .synthesize(&employee(EmissionPath::Metadata).view_model(true))
        .unwrap();
    let vm = ViewModel::new(synthesis.get_type("EmployeeVM").unwrap().create().unwrap()).unwrap();
    assert!(vm.validate(&Value::Null).unwrap().is_empty());
}

#[test]
fn test_set_list_and_duplicate_detection() {
    for path in PATHS {
        let synthesis = in_memory()
            .synthesize(&employee(path).view_model(true))
            .unwrap();
        let handle = synthesis.get_type("EmployeeVM").unwrap();
        let new_vm = |id: i32, name: &str| {
            let vm = ViewModel::new(handle.create().unwrap()).unwrap();
            vm.set("Id", id).unwrap();
            vm.set("Name", name).unwrap();
            vm
        };

        let alice = new_vm(1, "Alice");
        let bob = new_vm(2, "Bob");
        let candidate = new_vm(3, "Carol");

        candidate
            .set_list(&[alice.clone(), bob.clone(), candidate.clone()])
            .unwrap();
        match candidate.instance().field("_employees").unwrap() {
            Value::List(items) => assert_eq!(items.len(), 3, "list on the {path} path"),
            other => panic!("expected a list, got {other:?}"),
        }
        // The candidate itself is in the list but never counts as a duplicate.
        assert!(!candidate.already_exists().unwrap());
        assert!(candidate.validate(&Value::Null).unwrap().is_empty());

        candidate.set("Id", 2).unwrap();
        candidate.set("Name", "Bob").unwrap();
        assert!(candidate.already_exists().unwrap());
        assert_eq!(
            candidate.validate(&Value::Null).unwrap(),
            vec!["EmployeeVM already exists"]
        );
    }
}

#[test]
fn test_model_conversions() {
    let synthesis = in_memory()
        .synthesize(&employee(EmissionPath::Metadata).view_model(true))
        .unwrap();
    let vm = ViewModel::new(synthesis.get_type("EmployeeVM").unwrap().create().unwrap()).unwrap();
    vm.set("Id", 7).unwrap();
    vm.set("Name", "Grace").unwrap();

    let model = vm.to_new_model().unwrap();
    assert_eq!(model.type_name(), "Employee");
    assert_eq!(model.get("Name").unwrap(), Value::from("Grace"));
    assert!(model.get("RowId").is_err());

    let other = vm.to_new_imodel().unwrap();
    assert!(!other.instance().ptr_eq(vm.instance()));
    assert_eq!(other.get("Id").unwrap(), Value::Int32(7));
}

#[tokio::test]
async fn test_async_members() {
    let synthesis = in_memory()
        .synthesize(&employee(EmissionPath::Source).view_model(true))
        .unwrap();
    let model = synthesis.get_type("Employee").unwrap().create().unwrap();
    model.set("Id", 3).unwrap();
    model.set("Name", "Ada").unwrap();
    model.set("Age", 36).unwrap();

    let vm = ViewModel::new(synthesis.get_type("EmployeeVM").unwrap().create().unwrap()).unwrap();
    let returned = vm.from_model(&model).await.unwrap();
    assert!(returned.instance().ptr_eq(vm.instance()));
    assert_eq!(vm.get("Name").unwrap(), Value::from("Ada"));
    assert_eq!(vm.get("Age").unwrap(), Value::Int32(36));

    vm.set("IsNew", true).unwrap();
    vm.set_edit_mode(true).await.unwrap();
    assert_eq!(vm.get("IsEditMode").unwrap(), Value::Bool(true));

    vm.save_model_vm().await.unwrap();
    assert_eq!(vm.get("IsEditMode").unwrap(), Value::Bool(false));
    assert_eq!(vm.get("IsNew").unwrap(), Value::Bool(false));
}

#[tokio::test]
async fn test_from_model_skips_missing_properties() {
    let synthesizer = in_memory();
    let employees = synthesizer
        .synthesize(&employee(EmissionPath::Metadata).view_model(true))
        .unwrap();
    let people = synthesizer
        .synthesize(&SynthesisRequest::new(
            "Person",
            vec![
                SchemaColumn::new("Id", PrimitiveKind::Int32),
                SchemaColumn::new("Name", PrimitiveKind::String),
            ],
        ))
        .unwrap();

    let person = people.get_type("Person").unwrap().create().unwrap();
    person.set("Id", 5).unwrap();
    person.set("Name", "Lin").unwrap();

    let vm = ViewModel::new(employees.get_type("EmployeeVM").unwrap().create().unwrap()).unwrap();
    vm.set("Age", 41).unwrap();

    // `Person` has no `Age`; the failure is logged and the rest is copied.
    let returned = vm.from_model(&person).await.unwrap();
    assert!(returned.instance().ptr_eq(vm.instance()));
    assert_eq!(vm.get("Id").unwrap(), Value::Int32(5));
    assert_eq!(vm.get("Name").unwrap(), Value::from("Lin"));
    assert_eq!(vm.get("Age").unwrap(), Value::Int32(41));
}

// =============================================================================
// Persistence and unload
// =============================================================================

#[test]
fn test_document_to_persisted_module() {
    let temp = TempDir::new().unwrap();
    let doc = SchemaDocument::from_json(
        r#"{"name":"Employee","namespace":"Hr",
            "columns":[{"name":"Id","kind":"int32"},{"name":"Name","kind":"string"}]}"#,
    )
    .unwrap();
    let dirs = ForgeDirs::from_root(temp.path()).unwrap();
    let synthesizer = Synthesizer::new(SynthesisConfig::for_dirs(&dirs));

    let request = SynthesisRequest::from_document(&doc).view_model(true);
    let mut synthesis = synthesizer.synthesize(&request).unwrap();
    assert_eq!(synthesis.stage(), SynthesisStage::Loaded);

    let path = synthesis.persisted_path().unwrap().to_path_buf();
    assert_eq!(path, dirs.module_path("Employee"));
    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(on_disk, synthesis.compiled().unwrap().bytes);

    synthesis.unload(true).unwrap();
    assert!(!path.exists());
}

#[test]
fn test_unload_invalidates_handles_and_instances() {
    let mut synthesis = in_memory()
        .synthesize(&employee(EmissionPath::Metadata).view_model(true))
        .unwrap();

    let (token, instance, vm) = {
        let handle = synthesis.get_type("EmployeeVM").unwrap();
        let instance = handle.create().unwrap();
        let vm = ViewModel::new(handle.create().unwrap()).unwrap();
        (handle.detach(), instance, vm)
    };
    assert!(token.is_valid());

    synthesis.unload(false).unwrap();

    assert!(!token.is_valid());
    assert!(matches!(token.create(), Err(Error::ModuleUnloaded { .. })));
    assert!(matches!(token.property_names(), Err(Error::ModuleUnloaded { .. })));
    assert!(matches!(instance.get("Id"), Err(Error::ModuleUnloaded { .. })));
    assert!(matches!(instance.set("Id", 1), Err(Error::ModuleUnloaded { .. })));
    assert!(matches!(vm.clone_vm(), Err(Error::ModuleUnloaded { .. })));
    assert!(matches!(
        synthesis.get_type("EmployeeVM"),
        Err(Error::ModuleUnloaded { .. })
    ));
}

#[test]
fn test_unknown_type_is_resolution_error() {
    let synthesis = in_memory().synthesize(&employee(EmissionPath::Metadata)).unwrap();
    assert!(matches!(
        synthesis.get_type("Manager"),
        Err(Error::TypeResolution { .. })
    ));
}
