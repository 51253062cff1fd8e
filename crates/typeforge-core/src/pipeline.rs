//! End-to-end synthesis.
//!
//! One request walks a fixed sequence of stages:
//!
//! ```text
//! SchemaReceived → TypeBuilt → ModuleAssembled → Compiled → [Persisted] → Loaded → [Unloaded]
//! ```
//!
//! Each stage starts only once its predecessor has succeeded. A failure
//! anywhere aborts the attempt without leaving a module file or a loaded
//! context behind.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capability::{CapabilityRegistry, EXTENDED_PROPERTIES};
use crate::compile::{
    CompiledModule, CompilerConfig, ModuleCompiler, ModuleReference, ReferenceSet, SourceUnit,
};
use crate::error::{Error, Result};
use crate::model::{ModuleDefinition, TypeDefinition};
use crate::paths::ForgeDirs;
use crate::persist::{AbortHandle, ModuleWriter, RetryPolicy};
use crate::runtime::{LoadedModule, TypeHandle};
use crate::schema::{
    SchemaColumn, SchemaDocument, SchemaTranslator, TranslatedSchema, validate_identifier,
    view_model_name,
};
use crate::synth::{SourceSynthesizer, TypeLayout};

/// Which of the two compiler inputs a synthesis uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EmissionPath {
    /// Render source text, then parse and compile it.
    Source,
    /// Hand the type metadata to the compiler directly.
    #[default]
    Metadata,
}

impl fmt::Display for EmissionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => f.write_str("source"),
            Self::Metadata => f.write_str("metadata"),
        }
    }
}

/// Stage reached by a [`Synthesis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SynthesisStage {
    SchemaReceived,
    TypeBuilt,
    ModuleAssembled,
    Compiled,
    Persisted,
    Loaded,
    Unloaded,
}

impl SynthesisStage {
    /// Whether `next` may follow `self`.
    pub fn can_advance_to(self, next: SynthesisStage) -> bool {
        use SynthesisStage::*;
        matches!(
            (self, next),
            (SchemaReceived, TypeBuilt)
                | (TypeBuilt, ModuleAssembled)
                | (ModuleAssembled, Compiled)
                | (Compiled, Persisted)
                | (Compiled, Loaded)
                | (Persisted, Loaded)
                | (Loaded, Unloaded)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Unloaded
    }
}

impl fmt::Display for SynthesisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Configuration for a [`Synthesizer`].
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub compiler: CompilerConfig,
    pub retry: RetryPolicy,
    /// Write compiled modules to disk before loading them.
    pub persist: bool,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            compiler: CompilerConfig::default(),
            retry: RetryPolicy::default(),
            persist: true,
        }
    }
}

impl SynthesisConfig {
    /// Development config rooted at `dirs`.
    pub fn for_dirs(dirs: &ForgeDirs) -> Self {
        Self {
            compiler: CompilerConfig::for_dirs(dirs),
            ..Self::default()
        }
    }

    /// Compile and load in memory only.
    pub fn in_memory() -> Self {
        Self {
            persist: false,
            ..Self::default()
        }
    }
}

/// What to synthesize.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub module_name: String,
    /// Name of the model type.
    pub base_name: String,
    pub namespace: Option<String>,
    pub columns: Vec<SchemaColumn>,
    /// Capability interfaces merged into the view-model.
    pub capabilities: Vec<String>,
    /// Also synthesize `<Base>VM` over the model.
    pub view_model: bool,
    pub emit: EmissionPath,
    /// References beyond the baseline.
    pub references: Vec<ModuleReference>,
    /// Output file. Defaults to the modules directory.
    pub output: Option<PathBuf>,
}

impl SynthesisRequest {
    pub fn new(base_name: impl Into<String>, columns: Vec<SchemaColumn>) -> Self {
        let base_name = base_name.into();
        Self {
            module_name: base_name.clone(),
            base_name,
            namespace: None,
            columns,
            capabilities: Vec::new(),
            view_model: false,
            emit: EmissionPath::default(),
            references: Vec::new(),
            output: None,
        }
    }

    pub fn from_document(doc: &SchemaDocument) -> Self {
        let mut request = Self::new(&doc.name, doc.columns.clone());
        request.namespace = doc.namespace.clone();
        request.capabilities = doc.capabilities.clone();
        request
    }

    pub fn module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn capability(mut self, interface: impl Into<String>) -> Self {
        self.capabilities.push(interface.into());
        self
    }

    pub fn view_model(mut self, enabled: bool) -> Self {
        self.view_model = enabled;
        self
    }

    pub fn emit(mut self, path: EmissionPath) -> Self {
        self.emit = path;
        self
    }

    pub fn reference(mut self, reference: ModuleReference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Capabilities to translate with. View-models always get the extended set first.
    fn effective_capabilities(&self) -> Vec<String> {
        if !self.view_model {
            return Vec::new();
        }
        let mut caps = vec![EXTENDED_PROPERTIES.to_string()];
        for cap in &self.capabilities {
            if !caps.contains(cap) {
                caps.push(cap.clone());
            }
        }
        caps
    }
}

/// Result of one synthesis.
///
/// Owns the loaded module; dropping it unloads the context.
pub struct Synthesis {
    stage: SynthesisStage,
    module_name: String,
    types: Vec<TypeDefinition>,
    source: Option<String>,
    compiled: Option<CompiledModule>,
    persisted: Option<PathBuf>,
    loaded: Option<LoadedModule>,
    writer: Arc<ModuleWriter>,
}

impl Synthesis {
    fn new(module_name: &str, writer: Arc<ModuleWriter>) -> Self {
        tracing::info!("Synthesis of {} entered {}", module_name, SynthesisStage::SchemaReceived);
        Self {
            stage: SynthesisStage::SchemaReceived,
            module_name: module_name.to_string(),
            types: Vec::new(),
            source: None,
            compiled: None,
            persisted: None,
            loaded: None,
            writer,
        }
    }

    fn advance(&mut self, next: SynthesisStage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(Error::InvalidOperation(format!(
                "synthesis of {} cannot move from {} to {}",
                self.module_name, self.stage, next
            )));
        }
        tracing::info!("Synthesis of {} entered {}", self.module_name, next);
        self.stage = next;
        Ok(())
    }

    pub fn stage(&self) -> SynthesisStage {
        self.stage
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Types the module was built from.
    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    /// Generated source, on the source path only.
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn compiled(&self) -> Option<&CompiledModule> {
        self.compiled.as_ref()
    }

    pub fn persisted_path(&self) -> Option<&Path> {
        self.persisted.as_deref()
    }

    /// The loaded module. Fails once unloaded.
    pub fn module(&self) -> Result<&LoadedModule> {
        match &self.loaded {
            Some(module) if module.is_loaded() => Ok(module),
            _ => Err(Error::ModuleUnloaded {
                module: self.module_name.clone(),
            }),
        }
    }

    pub fn get_type(&self, name: &str) -> Result<TypeHandle<'_>> {
        self.module()?.get_type(name)
    }

    /// Unload the module and optionally delete its file. Terminal.
    pub fn unload(&mut self, delete_file: bool) -> Result<()> {
        self.advance(SynthesisStage::Unloaded)?;
        if let Some(mut module) = self.loaded.take() {
            module.dispose();
        }
        if delete_file && let Some(path) = &self.persisted {
            self.writer.delete(path)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Synthesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesis")
            .field("module", &self.module_name)
            .field("stage", &self.stage)
            .field("persisted", &self.persisted)
            .finish()
    }
}

/// Drives requests through translation, layout, compilation, persistence and load.
pub struct Synthesizer {
    config: SynthesisConfig,
    registry: CapabilityRegistry,
    compiler: ModuleCompiler,
    writer: Arc<ModuleWriter>,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(SynthesisConfig::default())
    }
}

impl Synthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            compiler: ModuleCompiler::new(config.compiler.clone()),
            writer: Arc::new(ModuleWriter::new(config.retry)),
            registry: CapabilityRegistry::standard(),
            config,
        }
    }

    pub fn with_registry(mut self, registry: CapabilityRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_writer(mut self, writer: ModuleWriter) -> Self {
        self.writer = Arc::new(writer);
        self
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Cancels a pending persistence retry.
    pub fn abort_handle(&self) -> AbortHandle {
        self.writer.abort_handle().clone()
    }

    /// Translate the request's schema.
    pub fn translate(&self, request: &SynthesisRequest) -> Result<TranslatedSchema> {
        validate_identifier(&request.base_name)?;
        validate_identifier(&request.module_name)?;
        SchemaTranslator::new(&self.registry)
            .translate(&request.columns, &request.effective_capabilities())
    }

    /// Lay out the model and, when requested, its view-model.
    pub fn build_types(&self, request: &SynthesisRequest) -> Result<Vec<TypeDefinition>> {
        let schema = self.translate(request)?;
        self.layout(request, &schema)
    }

    /// Source text of the module a request describes.
    pub fn render_source(&self, request: &SynthesisRequest) -> Result<String> {
        let types = self.build_types(request)?;
        Ok(SourceSynthesizer::new().render_module(&request.module_name, &types))
    }

    fn layout(
        &self,
        request: &SynthesisRequest,
        schema: &TranslatedSchema,
    ) -> Result<Vec<TypeDefinition>> {
        let namespace = request.namespace.as_deref();
        let mut types = vec![TypeLayout::model(&request.base_name, namespace, schema)?];
        if request.view_model {
            let vm_name = view_model_name(&request.base_name);
            types.push(TypeLayout::view_model(
                &vm_name,
                &request.base_name,
                namespace,
                schema,
            )?);
        }
        Ok(types)
    }

    /// Run a request to a loaded module.
    pub fn synthesize(&self, request: &SynthesisRequest) -> Result<Synthesis> {
        self.synthesize_linked(request, &[])
    }

    /// Run a request whose types may use types of already-loaded modules.
    pub fn synthesize_linked(
        &self,
        request: &SynthesisRequest,
        dependencies: &[&LoadedModule],
    ) -> Result<Synthesis> {
        let mut synthesis = Synthesis::new(&request.module_name, Arc::clone(&self.writer));

        let schema = self.translate(request)?;
        synthesis.types = self.layout(request, &schema)?;
        synthesis.advance(SynthesisStage::TypeBuilt)?;

        let references = self.references(request, dependencies)?;
        let module = ModuleDefinition::builder(&request.module_name)
            .add_types(synthesis.types.iter().cloned())
            .references(references.clone())
            .build();
        synthesis.advance(SynthesisStage::ModuleAssembled)?;

        let result = match request.emit {
            EmissionPath::Metadata => self.compiler.compile_module(&module),
            EmissionPath::Source => {
                let text = SourceSynthesizer::new().render_module(module.name(), module.types());
                let mut unit = SourceUnit::new(module.name(), text.as_str())
                    .class_name(&request.base_name)
                    .references(references);
                if let Some(namespace) = &request.namespace {
                    unit = unit.namespace(namespace);
                }
                synthesis.source = Some(text);
                self.compiler.compile_source(&unit)
            }
        };
        let compiled = result.into_result()?;
        for warning in &compiled.warnings {
            tracing::debug!("{}: {}", warning.id, warning.message);
        }
        synthesis.advance(SynthesisStage::Compiled)?;

        if self.config.persist || request.output.is_some() {
            let path = match &request.output {
                Some(path) => path.clone(),
                None => self.config.compiler.modules_dir.join(&compiled.file_name),
            };
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            self.writer.persist_module(&compiled, &path)?;
            synthesis.persisted = Some(path);
            synthesis.advance(SynthesisStage::Persisted)?;
        }

        let context_name = format!("{}-{}", request.module_name, uuid::Uuid::new_v4().simple());
        let loaded = match &synthesis.persisted {
            Some(path) if dependencies.is_empty() => LoadedModule::load_from_path(path, &context_name),
            _ => LoadedModule::load_linked(&compiled.bytes, &context_name, dependencies),
        };
        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                if let Some(path) = &synthesis.persisted
                    && let Err(cleanup) = self.writer.delete(path)
                {
                    tracing::warn!("Failed to remove {}: {}", path.display(), cleanup);
                }
                return Err(e);
            }
        };
        synthesis.compiled = Some(compiled);
        synthesis.loaded = Some(loaded);
        synthesis.advance(SynthesisStage::Loaded)?;

        Ok(synthesis)
    }

    fn references(
        &self,
        request: &SynthesisRequest,
        dependencies: &[&LoadedModule],
    ) -> Result<ReferenceSet> {
        let mut references = ReferenceSet::baseline();
        if request.view_model {
            references = references.with_capabilities();
        }
        for reference in &request.references {
            references.add(reference.clone());
        }
        for dependency in dependencies {
            references.add_loaded(dependency.exports()?);
        }
        Ok(references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PrimitiveKind;
    use crate::runtime::Value;
    use tempfile::TempDir;

    fn employee() -> SynthesisRequest {
        SynthesisRequest::new(
            "Employee",
            vec![
                SchemaColumn::new("Id", PrimitiveKind::Int32),
                SchemaColumn::new("Name", PrimitiveKind::String),
            ],
        )
    }

    #[test]
    fn test_stage_transitions() {
        use SynthesisStage::*;
        assert!(Compiled.can_advance_to(Loaded));
        assert!(Compiled.can_advance_to(Persisted));
        assert!(!SchemaReceived.can_advance_to(Compiled));
        assert!(!Unloaded.can_advance_to(Loaded));
        assert!(Unloaded.is_terminal());
    }

    #[test]
    fn test_synthesize_in_memory() {
        let synthesizer = Synthesizer::new(SynthesisConfig::in_memory());
        let mut synthesis = synthesizer.synthesize(&employee()).unwrap();

        assert_eq!(synthesis.stage(), SynthesisStage::Loaded);
        assert!(synthesis.persisted_path().is_none());
        assert!(synthesis.source().is_none());
        assert_eq!(
            synthesis.get_type("Employee").unwrap().property_names(),
            vec!["Id", "Name"]
        );

        synthesis.unload(false).unwrap();
        assert_eq!(synthesis.stage(), SynthesisStage::Unloaded);
        assert!(matches!(
            synthesis.get_type("Employee"),
            Err(Error::ModuleUnloaded { .. })
        ));
        assert!(matches!(
            synthesis.unload(false),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_synthesize_persists_and_deletes() {
        let temp = TempDir::new().unwrap();
        let dirs = ForgeDirs::from_root(temp.path()).unwrap();
        let synthesizer = Synthesizer::new(SynthesisConfig::for_dirs(&dirs));

        let request = employee().emit(EmissionPath::Source).view_model(true);
        let mut synthesis = synthesizer.synthesize(&request).unwrap();

        let path = dirs.module_path("Employee");
        assert_eq!(synthesis.persisted_path(), Some(path.as_path()));
        assert!(path.exists());
        assert!(synthesis.source().unwrap().contains("pub struct EmployeeVM"));

        let vm = synthesis.get_type("EmployeeVM").unwrap();
        assert_eq!(
            vm.property_names(),
            vec!["RowId", "IsNew", "IsEditMode", "IsSelected", "Id", "Name"]
        );

        synthesis.unload(true).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_invalid_schema_stops_early() {
        let synthesizer = Synthesizer::new(SynthesisConfig::in_memory());
        let request = SynthesisRequest::new(
            "Employee",
            vec![SchemaColumn::new("first name", PrimitiveKind::String)],
        );
        let err = synthesizer.synthesize(&request).unwrap_err();
        assert!(matches!(err, Error::SchemaValidation { .. }));
    }

    #[test]
    fn test_linked_synthesis() {
        let synthesizer = Synthesizer::new(SynthesisConfig::in_memory());
        let base = synthesizer.synthesize(&employee()).unwrap();
        let base_module = base.module().unwrap();

        let request = SynthesisRequest::new(
            "Department",
            vec![SchemaColumn::new("Title", PrimitiveKind::String)],
        );
        let linked = synthesizer
            .synthesize_linked(&request, &[base_module])
            .unwrap();
        let handle = linked.get_type("Department").unwrap();
        let instance = handle.create().unwrap();
        assert_eq!(instance.get("Title").unwrap(), Value::String(String::new()));
    }
}
