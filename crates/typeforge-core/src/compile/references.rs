//! Module references.
//!
//! A compilation resolves type names against its own types plus the exports
//! of every referenced module. References are supplied by the caller; nothing
//! is discovered transitively.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::capability::{CAPABILITY_MODULE, capability_interfaces};
use crate::error::Result;
use crate::model::TypeDefinition;

use super::image::{ModuleImage, checksum};

/// Baseline runtime modules every generated module may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeModule {
    /// Object model: `Object`, `Value`, `EventHandler`.
    Core,
    /// List types.
    Collections,
    /// Async members.
    Tasks,
}

impl RuntimeModule {
    pub const ALL: [RuntimeModule; 3] = [Self::Core, Self::Collections, Self::Tasks];

    pub fn name(self) -> &'static str {
        match self {
            Self::Core => "Typeforge.Core",
            Self::Collections => "Typeforge.Collections",
            Self::Tasks => "Typeforge.Tasks",
        }
    }

    pub fn exported_types(self) -> &'static [&'static str] {
        match self {
            Self::Core => &["Object", "Value", "EventHandler"],
            Self::Collections => &["List"],
            Self::Tasks => &["Task"],
        }
    }
}

/// Types exported by a module, as seen by a compilation referencing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleExports {
    /// Resolved identity used to de-duplicate references.
    pub identity: String,
    pub name: String,
    pub types: Vec<TypeDefinition>,
}

impl ModuleExports {
    /// Exports of a module image. `origin` is the file it was read from, if any.
    pub fn from_image(image: &ModuleImage, bytes: &[u8], origin: Option<&Path>) -> Self {
        let identity = match origin {
            Some(path) => path_identity(path),
            None => format!("module:{}#{:016x}", image.name, checksum(bytes)),
        };
        Self {
            identity,
            name: image.name.clone(),
            types: image.types.clone(),
        }
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name == name)
    }
}

/// One entry of a [`ReferenceSet`].
#[derive(Debug, Clone)]
pub enum ModuleReference {
    Runtime(RuntimeModule),
    /// The synthetic module exporting capability interfaces.
    Capabilities,
    /// A compiled module file on disk.
    Path(PathBuf),
    /// A module that is already loaded.
    Loaded(Arc<ModuleExports>),
}

impl ModuleReference {
    /// Identity used for de-duplication.
    pub fn identity(&self) -> String {
        match self {
            Self::Runtime(module) => format!("runtime:{}", module.name()),
            Self::Capabilities => format!("module:{CAPABILITY_MODULE}"),
            Self::Path(path) => path_identity(path),
            Self::Loaded(exports) => exports.identity.clone(),
        }
    }

    /// Resolve the exports of this reference.
    pub fn resolve(&self) -> Result<ModuleExports> {
        let identity = self.identity();
        match self {
            Self::Runtime(module) => Ok(ModuleExports {
                identity,
                name: module.name().to_string(),
                types: module
                    .exported_types()
                    .iter()
                    .map(|name| TypeDefinition::class(*name))
                    .collect(),
            }),
            Self::Capabilities => Ok(ModuleExports {
                identity,
                name: CAPABILITY_MODULE.to_string(),
                types: capability_interfaces(),
            }),
            Self::Path(path) => {
                let bytes = fs::read(path)?;
                let image = ModuleImage::decode(&bytes)?;
                Ok(ModuleExports::from_image(&image, &bytes, Some(path)))
            }
            Self::Loaded(exports) => Ok(exports.as_ref().clone()),
        }
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Runtime(module) => f.write_str(module.name()),
            Self::Capabilities => f.write_str(CAPABILITY_MODULE),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Loaded(exports) => write!(f, "{} (loaded)", exports.name),
        }
    }
}

fn path_identity(path: &Path) -> String {
    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    format!("file:{}", canonical.display())
}

/// Ordered, duplicate-free list of module references.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSet {
    entries: Vec<ModuleReference>,
    identities: FxHashSet<String>,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The runtime modules any generated code may need.
    pub fn baseline() -> Self {
        let mut set = Self::new();
        for module in RuntimeModule::ALL {
            set.add(ModuleReference::Runtime(module));
        }
        set
    }

    /// Add the capability module.
    pub fn with_capabilities(mut self) -> Self {
        self.add(ModuleReference::Capabilities);
        self
    }

    /// Add a reference. Returns `false` if one with the same identity exists.
    pub fn add(&mut self, reference: ModuleReference) -> bool {
        let identity = reference.identity();
        if !self.identities.insert(identity) {
            tracing::debug!("Skipping duplicate reference {}", reference);
            return false;
        }
        self.entries.push(reference);
        true
    }

    pub fn add_path(&mut self, path: impl Into<PathBuf>) -> bool {
        self.add(ModuleReference::Path(path.into()))
    }

    pub fn add_loaded(&mut self, exports: ModuleExports) -> bool {
        self.add(ModuleReference::Loaded(Arc::new(exports)))
    }

    pub fn contains(&self, reference: &ModuleReference) -> bool {
        self.identities.contains(&reference.identity())
    }

    pub fn has_runtime(&self, module: RuntimeModule) -> bool {
        self.contains(&ModuleReference::Runtime(module))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleReference> {
        self.entries.iter()
    }

    pub fn identities(&self) -> Vec<String> {
        self.entries.iter().map(ModuleReference::identity).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
