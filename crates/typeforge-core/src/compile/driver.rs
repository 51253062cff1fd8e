//! Compiler driver: both emission paths end here.

use std::fs;

use crate::model::{ModuleDefinition, TypeDefinition};

use super::diagnostics::{Diagnostic, Severity, codes};
use super::image::ModuleImage;
use super::references::{ModuleExports, ReferenceSet};
use super::source_parser::{SourceParser, SymbolEntry};
use super::types::{CompilationResult, CompiledModule, CompilerConfig};
use super::verify::Verifier;
use super::MODULE_EXTENSION;

/// Source text of one module plus what the text path needs to compile it.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub module_name: String,
    /// Applied to types that carry no namespace attribute.
    pub namespace: Option<String>,
    /// Type that must be present in the source.
    pub class_name: Option<String>,
    pub text: String,
    pub references: ReferenceSet,
}

impl SourceUnit {
    pub fn new(module_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            namespace: None,
            class_name: None,
            text: text.into(),
            references: ReferenceSet::baseline(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn references(mut self, references: ReferenceSet) -> Self {
        self.references = references;
        self
    }
}

/// Compiles modules into loadable images.
///
/// [`compile_module`](Self::compile_module) takes type metadata directly,
/// [`compile_source`](Self::compile_source) parses generated source first.
/// Both verify the same way and return the same [`CompilationResult`] shape.
pub struct ModuleCompiler {
    config: CompilerConfig,
}

impl ModuleCompiler {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile a module built from metadata.
    pub fn compile_module(&self, module: &ModuleDefinition) -> CompilationResult {
        tracing::info!("Compiling module {} from metadata", module.name());

        let exports = match resolve_references(module.references()) {
            Ok(exports) => exports,
            Err(diagnostics) => return failure(module.name(), diagnostics),
        };
        self.finish(
            module.name(),
            module.file_name(),
            module.types(),
            module.references(),
            &exports,
            Vec::new(),
            None,
        )
    }

    /// Compile a module from source text.
    pub fn compile_source(&self, unit: &SourceUnit) -> CompilationResult {
        tracing::info!("Compiling module {} from source", unit.module_name);

        if self.config.keep_sources {
            self.keep_source(unit);
        }

        let exports = match resolve_references(&unit.references) {
            Ok(exports) => exports,
            Err(diagnostics) => return failure(&unit.module_name, diagnostics),
        };

        let parsed = SourceParser::new(unit.namespace.as_deref(), &exports).parse(&unit.text);
        let mut diagnostics = parsed.diagnostics;
        if let Some(class) = &unit.class_name
            && !parsed.types.iter().any(|t| &t.name == class)
        {
            diagnostics.push(Diagnostic::error(
                codes::UNKNOWN_TYPE,
                format!("class `{class}` is not defined in the source"),
            ));
        }
        if diagnostics.iter().any(Diagnostic::is_error) {
            return failure(&unit.module_name, diagnostics);
        }

        let file_name = format!("{}.{}", unit.module_name, MODULE_EXTENSION);
        self.finish(
            &unit.module_name,
            &file_name,
            &parsed.types,
            &unit.references,
            &exports,
            diagnostics,
            Some(parsed.symbols),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        name: &str,
        file_name: &str,
        types: &[TypeDefinition],
        references: &ReferenceSet,
        exports: &[ModuleExports],
        mut diagnostics: Vec<Diagnostic>,
        symbols: Option<Vec<SymbolEntry>>,
    ) -> CompilationResult {
        diagnostics.extend(Verifier::new(types, exports, references).verify());

        if self.config.treat_warnings_as_errors {
            for diag in &mut diagnostics {
                diag.severity = Severity::Error;
            }
        }
        if diagnostics.iter().any(Diagnostic::is_error) {
            return failure(name, diagnostics);
        }

        let image = ModuleImage {
            name: name.to_string(),
            file_name: file_name.to_string(),
            types: types.to_vec(),
            references: references.identities(),
        };
        let bytes = match image.encode() {
            Ok(bytes) => bytes,
            Err(e) => {
                let diag =
                    Diagnostic::error(codes::IMAGE_ENCODING, format!("failed to encode image: {e}"));
                return failure(name, vec![diag]);
            }
        };

        let symbols = match symbols {
            Some(entries) if self.config.emit_symbols => symbol_stream(name, &entries),
            _ => None,
        };

        tracing::info!(
            "Compiled module {} ({} type(s), {} bytes, {} warning(s))",
            name,
            types.len(),
            bytes.len(),
            diagnostics.len()
        );

        CompilationResult::Success(CompiledModule {
            name: name.to_string(),
            file_name: file_name.to_string(),
            bytes,
            symbols,
            warnings: diagnostics,
        })
    }

    fn keep_source(&self, unit: &SourceUnit) {
        let path = self.config.build_dir.join(format!("{}.rs", unit.module_name));
        let written = fs::create_dir_all(&self.config.build_dir)
            .and_then(|()| fs::write(&path, &unit.text));
        match written {
            Ok(()) => tracing::debug!("Kept source at {}", path.display()),
            Err(e) => tracing::warn!("Failed to keep source at {}: {}", path.display(), e),
        }
    }
}

fn failure(module: &str, diagnostics: Vec<Diagnostic>) -> CompilationResult {
    tracing::warn!(
        "Compilation of {} failed with {} diagnostic(s)",
        module,
        diagnostics.len()
    );
    CompilationResult::Failure {
        module: module.to_string(),
        diagnostics,
    }
}

/// Resolve every reference, collecting one diagnostic per unreadable one.
fn resolve_references(references: &ReferenceSet) -> Result<Vec<ModuleExports>, Vec<Diagnostic>> {
    let mut exports = Vec::with_capacity(references.len());
    let mut diagnostics = Vec::new();
    for reference in references.iter() {
        match reference.resolve() {
            Ok(resolved) => exports.push(resolved),
            Err(e) => diagnostics.push(Diagnostic::error(
                codes::UNREADABLE_REFERENCE,
                format!("cannot read reference {reference}: {e}"),
            )),
        }
    }
    if diagnostics.is_empty() {
        Ok(exports)
    } else {
        Err(diagnostics)
    }
}

fn symbol_stream(module: &str, entries: &[SymbolEntry]) -> Option<Vec<u8>> {
    let stream = serde_json::json!({
        "module": module,
        "symbols": entries,
    });
    match serde_json::to_vec_pretty(&stream) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("Failed to encode symbols for {}: {}", module, e);
            None
        }
    }
}
