//! Isolated, unloadable module contexts.
//!
//! A [`LoadedModule`] owns the only strong reference to its [`LoadContext`].
//! Everything handed out from it either borrows the module ([`TypeHandle`],
//! so the borrow checker rejects use after [`LoadedModule::dispose`]) or
//! holds a weak reference that is checked on every access ([`TypeToken`],
//! [`Instance`]), failing with [`Error::ModuleUnloaded`] once the context
//! is gone.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use rustc_hash::FxHashMap;

use crate::compile::{ModuleExports, ModuleImage};
use crate::error::{Error, Result};
use crate::model::{ConstructorKind, TypeDefinition};

use super::instance::Instance;
use super::value::Value;

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

/// The execution context of one loaded module.
pub(crate) struct LoadContext {
    id: u64,
    name: String,
    module: String,
    types: Vec<Arc<TypeDefinition>>,
    by_name: FxHashMap<String, usize>,
    dependencies: Vec<(String, Weak<LoadContext>)>,
}

impl LoadContext {
    fn new(
        name: &str,
        image: ModuleImage,
        dependencies: Vec<(String, Weak<LoadContext>)>,
    ) -> Self {
        let types: Vec<Arc<TypeDefinition>> = image.types.into_iter().map(Arc::new).collect();
        let mut by_name = FxHashMap::default();
        for (index, def) in types.iter().enumerate() {
            by_name.insert(def.full_name(), index);
            by_name.entry(def.name.clone()).or_insert(index);
        }
        Self {
            id: NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed),
            name: name.to_string(),
            module: image.name,
            types,
            by_name,
            dependencies,
        }
    }

    pub(crate) fn module(&self) -> &str {
        &self.module
    }

    /// A type of this module, by simple or namespace-qualified name.
    fn find(&self, name: &str) -> Option<Arc<TypeDefinition>> {
        self.by_name.get(name).map(|index| self.types[*index].clone())
    }

    /// Resolve a type here or in a linked dependency.
    pub(crate) fn resolve(
        self: &Arc<Self>,
        name: &str,
    ) -> Result<(Arc<LoadContext>, Arc<TypeDefinition>)> {
        if let Some(def) = self.find(name) {
            return Ok((self.clone(), def));
        }
        for (module, dependency) in &self.dependencies {
            let dependency = dependency.upgrade().ok_or_else(|| Error::ModuleUnloaded {
                module: module.clone(),
            })?;
            if let Some(def) = dependency.find(name) {
                return Ok((dependency, def));
            }
        }
        Err(Error::TypeResolution {
            module: self.module.clone(),
            type_name: name.to_string(),
        })
    }

    /// Create an instance of `type_name` with the constructor matching `args`.
    pub(crate) fn create(self: &Arc<Self>, type_name: &str, args: Vec<Value>) -> Result<Instance> {
        let (context, def) = self.resolve(type_name)?;
        Instance::construct_matching(&context, def, args)
    }
}

/// A compiled module loaded into its own context.
pub struct LoadedModule {
    name: String,
    module: String,
    identity: String,
    references: Vec<String>,
    context: Option<Arc<LoadContext>>,
}

impl LoadedModule {
    /// Load a module image into a fresh context named `context_name`.
    pub fn load(bytes: &[u8], context_name: &str) -> Result<Self> {
        Self::load_inner(bytes, context_name, None, &[])
    }

    /// Load a module file. Its identity is the file path.
    pub fn load_from_path(path: &Path, context_name: &str) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::load_inner(&bytes, context_name, Some(path), &[])
    }

    /// Load a module whose types refer to types of already-loaded modules.
    pub fn load_linked(
        bytes: &[u8],
        context_name: &str,
        dependencies: &[&LoadedModule],
    ) -> Result<Self> {
        Self::load_inner(bytes, context_name, None, dependencies)
    }

    fn load_inner(
        bytes: &[u8],
        context_name: &str,
        origin: Option<&Path>,
        dependencies: &[&LoadedModule],
    ) -> Result<Self> {
        let image = ModuleImage::decode(bytes)?;
        let identity = ModuleExports::from_image(&image, bytes, origin).identity;

        let mut links = Vec::with_capacity(dependencies.len());
        for dependency in dependencies {
            let context = dependency.context()?;
            links.push((context.module.clone(), Arc::downgrade(context)));
        }
        for reference in &image.references {
            let linked = dependencies.iter().any(|d| &d.identity == reference);
            let builtin =
                reference.starts_with("runtime:") || reference.starts_with("module:Typeforge.");
            if !linked && !builtin {
                tracing::debug!(
                    "Reference {} of {} is not linked in this context",
                    reference,
                    image.name
                );
            }
        }

        let references = image.references.clone();
        let context = LoadContext::new(context_name, image, links);
        tracing::info!(
            "Loaded module {} into context {} (#{}, {} type(s))",
            context.module,
            context.name,
            context.id,
            context.types.len()
        );

        Ok(Self {
            name: context_name.to_string(),
            module: context.module.clone(),
            identity,
            references,
            context: Some(Arc::new(context)),
        })
    }

    /// Context name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    /// Identities of the references the module was compiled against.
    pub fn references(&self) -> &[String] {
        &self.references
    }

    pub fn is_loaded(&self) -> bool {
        self.context.is_some()
    }

    fn context(&self) -> Result<&Arc<LoadContext>> {
        self.context.as_ref().ok_or_else(|| Error::ModuleUnloaded {
            module: self.module.clone(),
        })
    }

    /// Look up a type by simple or namespace-qualified name.
    pub fn get_type(&self, name: &str) -> Result<TypeHandle<'_>> {
        let context = self.context()?;
        let def = context.find(name).ok_or_else(|| Error::TypeResolution {
            module: self.module.clone(),
            type_name: name.to_string(),
        })?;
        Ok(TypeHandle { context, def })
    }

    /// Full names of every type, in module order.
    pub fn type_names(&self) -> Result<Vec<String>> {
        Ok(self.context()?.types.iter().map(|t| t.full_name()).collect())
    }

    /// Exports for referencing this module from another compilation.
    pub fn exports(&self) -> Result<ModuleExports> {
        let context = self.context()?;
        Ok(ModuleExports {
            identity: self.identity.clone(),
            name: self.module.clone(),
            types: context.types.iter().map(|t| t.as_ref().clone()).collect(),
        })
    }

    /// Drop the module and unload its context. Calling it again does nothing.
    pub fn dispose(&mut self) {
        match self.context.take() {
            Some(context) => {
                tracing::info!("Unloaded context {} (#{})", context.name, context.id);
            }
            None => tracing::debug!("Context {} already unloaded", self.name),
        }
    }
}

impl Drop for LoadedModule {
    fn drop(&mut self) {
        if self.context.is_some() {
            tracing::debug!("Unloading context {} on drop", self.name);
            self.dispose();
        }
    }
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("name", &self.name)
            .field("module", &self.module)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// A type of a loaded module, borrowed from it.
#[derive(Debug)]
pub struct TypeHandle<'m> {
    context: &'m Arc<LoadContext>,
    def: Arc<TypeDefinition>,
}

impl TypeHandle<'_> {
    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn full_name(&self) -> String {
        self.def.full_name()
    }

    pub fn definition(&self) -> &TypeDefinition {
        &self.def
    }

    /// Property names in declaration order.
    pub fn property_names(&self) -> Vec<String> {
        self.def.property_names()
    }

    pub fn method_names(&self) -> Vec<String> {
        self.def.method_names()
    }

    /// Instance from the zero-argument constructor.
    pub fn create(&self) -> Result<Instance> {
        self.construct(ConstructorKind::Default, Vec::new())
    }

    pub fn construct(&self, kind: ConstructorKind, args: Vec<Value>) -> Result<Instance> {
        Instance::construct(self.context, self.def.clone(), kind, args)
    }

    /// An owned token that outlives this borrow and checks the module on use.
    pub fn detach(&self) -> TypeToken {
        TypeToken {
            context: Arc::downgrade(self.context),
            module: self.context.module.clone(),
            type_name: self.def.name.clone(),
        }
    }
}

/// Owned reference to a type of a loaded module.
#[derive(Debug, Clone)]
pub struct TypeToken {
    context: Weak<LoadContext>,
    module: String,
    type_name: String,
}

impl TypeToken {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether the owning module is still loaded.
    pub fn is_valid(&self) -> bool {
        self.context.strong_count() > 0
    }

    fn resolve(&self) -> Result<(Arc<LoadContext>, Arc<TypeDefinition>)> {
        let context = self.context.upgrade().ok_or_else(|| Error::ModuleUnloaded {
            module: self.module.clone(),
        })?;
        let def = context.find(&self.type_name).ok_or_else(|| Error::TypeResolution {
            module: self.module.clone(),
            type_name: self.type_name.clone(),
        })?;
        Ok((context, def))
    }

    pub fn property_names(&self) -> Result<Vec<String>> {
        Ok(self.resolve()?.1.property_names())
    }

    pub fn method_names(&self) -> Result<Vec<String>> {
        Ok(self.resolve()?.1.method_names())
    }

    pub fn create(&self) -> Result<Instance> {
        let (context, def) = self.resolve()?;
        Instance::construct(&context, def, ConstructorKind::Default, Vec::new())
    }
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("module", &self.module)
            .finish()
    }
}
