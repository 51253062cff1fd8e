//! Integration tests for the fatal paths: lowering, compilation, persistence.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use tempfile::TempDir;

use typeforge_core::compile::{ModuleCompiler, codes};
use typeforge_core::model::FieldDefinition;
use typeforge_core::persist::{ModuleStore, NoopResolver};
use typeforge_core::synth::{FieldDescriptor, MethodDescriptor, TypeDescriptor};
use typeforge_core::{
    CompilerConfig, Diagnostic, EmissionPath, Error, MetadataEmitter, ModuleDefinition,
    ModuleWriter, PrimitiveKind, RetryPolicy, SchemaColumn, Severity, SourceUnit,
    SynthesisConfig, SynthesisRequest, Synthesizer, TypeDefinition, TypeRef,
};

/// Reports a lock conflict on the first `violations` writes.
struct ContendedStore {
    violations: u32,
    calls: Arc<AtomicU32>,
}

impl ModuleStore for ContendedStore {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.violations {
            Err(io::Error::from(io::ErrorKind::WouldBlock))
        } else {
            fs::write(path, bytes)
        }
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

fn contended_writer(violations: u32, delay: Duration) -> (ModuleWriter, Arc<AtomicU32>) {
    let calls = Arc::new(AtomicU32::new(0));
    let writer = ModuleWriter::new(RetryPolicy::new(3, delay))
        .with_store(ContendedStore {
            violations,
            calls: Arc::clone(&calls),
        })
        .with_resolver(NoopResolver);
    (writer, calls)
}

fn employee() -> SynthesisRequest {
    SynthesisRequest::new(
        "Employee",
        vec![
            SchemaColumn::new("Id", PrimitiveKind::Int32),
            SchemaColumn::new("Name", PrimitiveKind::String),
        ],
    )
}

// =============================================================================
// Statement lowering
// =============================================================================

#[test]
fn test_unsupported_statement_aborts_emission() {
    let desc = TypeDescriptor::new("Counter")
        .field(FieldDescriptor::new("_count", TypeRef::Primitive(PrimitiveKind::Int32)))
        .method(
            MethodDescriptor::new("Bump", TypeRef::Void, "_count = 1;\nwhile (true) { }\nreturn;"),
        );

    match MetadataEmitter::new().emit(&desc) {
        Err(Error::UnsupportedStatement { member, line, .. }) => {
            assert_eq!(member, "Bump");
            assert_eq!(line, 2);
        }
        other => panic!("expected UnsupportedStatement, got {other:?}"),
    }
}

#[test]
fn test_narrow_grammar_is_accepted() {
    let body = "if (start > 0)\n{\n    _count = start;\n}\nreturn _count;";
    let desc = TypeDescriptor::new("Counter")
        .field(FieldDescriptor::new("_count", TypeRef::Primitive(PrimitiveKind::Int32)))
        .method(
            MethodDescriptor::new("Reset", TypeRef::Primitive(PrimitiveKind::Int32), body)
                .param("start", TypeRef::Primitive(PrimitiveKind::Int32)),
        );

    let def = MetadataEmitter::new().emit(&desc).unwrap();
    assert!(def.method("Reset").is_some());
}

// =============================================================================
// Compilation
// =============================================================================

#[test]
fn test_compile_failure_lists_every_error() {
    let mut broken = TypeDefinition::class("Order");
    broken
        .fields
        .push(FieldDefinition::new("_customer", TypeRef::named("Customer")));
    let module = ModuleDefinition::builder("Sales")
        .add_types([broken, TypeDefinition::class("Order")])
        .build();

    let result = ModuleCompiler::new(CompilerConfig::default()).compile_module(&module);
    assert!(!result.is_success());

    let ids: Vec<&str> = result.diagnostics().iter().map(|d| d.id.as_str()).collect();
    assert!(ids.contains(&codes::DUPLICATE_TYPE));
    assert!(ids.contains(&codes::UNKNOWN_TYPE));
    for diag in result.diagnostics() {
        assert!(!diag.id.is_empty());
        assert!(!diag.message.is_empty());
    }

    let err = result.into_result().unwrap_err();
    assert!(err.diagnostics().iter().any(Diagnostic::is_error));
}

#[test]
fn test_source_syntax_error_is_reported() {
    let unit = SourceUnit::new("Sales", "pub struct Order {\n    _Id: i32\n    _Total: f64,\n}\n")
        .class_name("Order");
    let result = ModuleCompiler::new(CompilerConfig::default()).compile_source(&unit);

    let diag = &result.diagnostics()[0];
    assert_eq!(diag.id, codes::SYNTAX);
    assert_eq!(diag.severity, Severity::Error);
    assert_eq!(diag.location.map(|(line, _)| line), Some(3));
}

#[test]
fn test_failed_synthesis_leaves_no_file() {
    let temp = TempDir::new().unwrap();
    let config = SynthesisConfig {
        compiler: CompilerConfig::production(),
        ..SynthesisConfig::default()
    };
    let empty = SynthesisRequest::new("Empty", Vec::new())
        .emit(EmissionPath::Source)
        .output(temp.path().join("Empty.tfm"));

    let err = Synthesizer::new(config).synthesize(&empty).unwrap_err();
    assert!(err.diagnostics().iter().any(|d| d.id == codes::NO_PROPERTIES));
    assert!(!temp.path().join("Empty.tfm").exists());
}

#[test]
fn test_columns_shadowing_view_model_fields_are_rejected() {
    let synthesizer = Synthesizer::new(SynthesisConfig::in_memory());
    for column in ["context", "employees"] {
        for emit in [EmissionPath::Metadata, EmissionPath::Source] {
            let request = SynthesisRequest::new(
                "Employee",
                vec![
                    SchemaColumn::new("Id", PrimitiveKind::Int32),
                    SchemaColumn::new(column, PrimitiveKind::String),
                ],
            )
            .view_model(true)
            .emit(emit);

            match synthesizer.synthesize(&request) {
                Err(Error::SchemaValidation { subject, .. }) => assert_eq!(subject, column),
                other => panic!("expected SchemaValidation for `{column}`, got {other:?}"),
            }
        }

        // Without a view-model the column is an ordinary property.
        let plain = SynthesisRequest::new(
            "Employee",
            vec![SchemaColumn::new(column, PrimitiveKind::String)],
        );
        let synthesis = synthesizer.synthesize(&plain).unwrap();
        assert_eq!(synthesis.get_type("Employee").unwrap().property_names(), vec![column]);
    }
}

// =============================================================================
// Persistence
// =============================================================================

#[test]
fn test_transient_contention_is_invisible() {
    let temp = TempDir::new().unwrap();
    let (writer, calls) = contended_writer(2, Duration::from_millis(1));
    let synthesizer = Synthesizer::new(SynthesisConfig::in_memory()).with_writer(writer);

    let output = temp.path().join("Employee.tfm");
    let synthesis = synthesizer.synthesize(&employee().output(&output)).unwrap();
    assert_eq!(synthesis.persisted_path(), Some(output.as_path()));
    assert_eq!(synthesis.get_type("Employee").unwrap().property_names(), vec!["Id", "Name"]);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_exhausted_retries_are_fatal() {
    let temp = TempDir::new().unwrap();
    let (writer, calls) = contended_writer(u32::MAX, Duration::from_millis(1));
    let synthesizer = Synthesizer::new(SynthesisConfig::in_memory()).with_writer(writer);

    let request = employee().output(temp.path().join("Employee.tfm"));
    match synthesizer.synthesize(&request) {
        Err(Error::Persistence { attempts, .. }) => assert_eq!(attempts, 3),
        other => panic!("expected Persistence, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(!temp.path().join("Employee.tfm").exists());
}

#[test]
fn test_symbols_failure_leaves_no_module() {
    let temp = TempDir::new().unwrap();
    let output = temp.path().join("Employee.tfm");
    fs::create_dir(temp.path().join("Employee.sym")).unwrap();

    let synthesizer = Synthesizer::new(SynthesisConfig::in_memory())
        .with_writer(ModuleWriter::default().with_resolver(NoopResolver));
    let request = employee().emit(EmissionPath::Source).output(&output);
    match synthesizer.synthesize(&request) {
        Err(Error::Persistence { path, .. }) => {
            assert_eq!(path, temp.path().join("Employee.sym"));
        }
        other => panic!("expected Persistence, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn test_abort_interrupts_retry_wait() {
    let temp = TempDir::new().unwrap();
    let (writer, calls) = contended_writer(u32::MAX, Duration::from_secs(30));
    let synthesizer = Synthesizer::new(SynthesisConfig::in_memory()).with_writer(writer);
    let abort = synthesizer.abort_handle();

    let aborter = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        abort.abort();
    });

    let request = employee().output(temp.path().join("Employee.tfm"));
    let result = synthesizer.synthesize(&request);
    aborter.join().unwrap();

    assert!(matches!(result, Err(Error::Aborted)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
