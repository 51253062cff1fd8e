//! Module definitions.

use crate::compile::{MODULE_EXTENSION, ReferenceSet};

use super::definition::TypeDefinition;

/// A named collection of types plus the references needed to compile them.
///
/// Built through [`ModuleBuilder`]; read-only afterwards.
#[derive(Debug, Clone)]
pub struct ModuleDefinition {
    name: String,
    file_name: String,
    types: Vec<TypeDefinition>,
    references: ReferenceSet,
}

impl ModuleDefinition {
    pub fn builder(name: impl Into<String>) -> ModuleBuilder {
        ModuleBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    pub fn references(&self) -> &ReferenceSet {
        &self.references
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name == name)
    }
}

/// Accumulates types and references for a [`ModuleDefinition`].
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    file_name: Option<String>,
    types: Vec<TypeDefinition>,
    references: ReferenceSet,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_name: None,
            types: Vec::new(),
            references: ReferenceSet::baseline(),
        }
    }

    /// Override the file name (defaults to `<name>.tfm`).
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn add_type(mut self, def: TypeDefinition) -> Self {
        self.types.push(def);
        self
    }

    pub fn add_types(mut self, defs: impl IntoIterator<Item = TypeDefinition>) -> Self {
        self.types.extend(defs);
        self
    }

    pub fn references(mut self, references: ReferenceSet) -> Self {
        self.references = references;
        self
    }

    pub fn references_mut(&mut self) -> &mut ReferenceSet {
        &mut self.references
    }

    /// Freeze the module.
    pub fn build(self) -> ModuleDefinition {
        let file_name = self
            .file_name
            .unwrap_or_else(|| format!("{}.{}", self.name, MODULE_EXTENSION));
        ModuleDefinition {
            name: self.name,
            file_name,
            types: self.types,
            references: self.references,
        }
    }
}
