//! Type, member and constructor definitions.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::capability::ContractMember;

use super::instr::Instruction;
use super::types::{Literal, TypeRef};

bitflags! {
    /// Attribute flags of a type definition.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TypeAttributes: u8 {
        const PUBLIC = 0b0001;
        const INTERFACE = 0b0010;
        const ABSTRACT = 0b0100;
        const CLASS = 0b1000;
    }
}

/// Prefix of property backing fields.
pub const BACKING_FIELD_PREFIX: &str = "_";

/// Name of the single setter parameter.
pub const SETTER_PARAMETER: &str = "value";

/// Backing field name for a property (`Id` → `_Id`).
pub fn backing_field_name(property: &str) -> String {
    format!("{BACKING_FIELD_PREFIX}{property}")
}

/// Getter method name for a property (`Id` → `get_Id`).
pub fn getter_name(property: &str) -> String {
    format!("get_{property}")
}

/// Setter method name for a property (`Id` → `set_Id`).
pub fn setter_name(property: &str) -> String {
    format!("set_{property}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: TypeRef,
    /// Value assigned by field initializers before any constructor body runs.
    pub default: Literal,
}

impl FieldDefinition {
    /// A field holding the canonical default of its type.
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        let default = ty.default_literal();
        Self {
            name: name.into(),
            ty,
            default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    pub ty: TypeRef,
    /// Name of the getter method in the owning type's method list.
    pub getter: Option<String>,
    /// Name of the setter method in the owning type's method list.
    pub setter: Option<String>,
}

impl PropertyDefinition {
    /// A read/write property with conventional accessor names.
    pub fn read_write(name: impl Into<String>, ty: TypeRef) -> Self {
        let name = name.into();
        Self {
            getter: Some(getter_name(&name)),
            setter: Some(setter_name(&name)),
            name,
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub ty: TypeRef,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// How a method is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MethodBody {
    /// Lowered instructions run by the interpreter.
    Instructions(Vec<Instruction>),
    /// A capability contract member implemented by the runtime.
    Intrinsic(ContractMember),
    /// No body (interface members).
    Abstract,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDefinition {
    pub name: String,
    pub parameters: Vec<ParameterDefinition>,
    pub return_type: TypeRef,
    pub is_async: bool,
    pub body: MethodBody,
}

impl MethodDefinition {
    pub fn instructions(&self) -> Option<&[Instruction]> {
        match &self.body {
            MethodBody::Instructions(body) => Some(body),
            _ => None,
        }
    }
}

/// The fixed constructor shapes a synthesized type can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConstructorKind {
    /// Zero arguments; initializes list fields and the context handle.
    Default,
    /// Context handle only.
    Context,
    /// Context handle plus a source model instance to copy from.
    ContextAndSource,
    /// Another instance of the same type.
    Copy,
}

impl ConstructorKind {
    /// Rust constructor function name used by the source backend.
    pub fn rust_name(self) -> &'static str {
        match self {
            Self::Default => "new",
            Self::Context => "with_context",
            Self::ContextAndSource => "from_source",
            Self::Copy => "from_other",
        }
    }

    pub fn from_rust_name(name: &str) -> Option<Self> {
        [Self::Default, Self::Context, Self::ContextAndSource, Self::Copy]
            .into_iter()
            .find(|kind| kind.rust_name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDefinition {
    pub kind: ConstructorKind,
    pub parameters: Vec<ParameterDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub name: String,
    pub handler: TypeRef,
}

/// Metadata the runtime needs to execute capability contract members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewModelInfo {
    /// Source model type (`ToNewModel`, `FromModel`).
    pub model_type: String,
    /// Backing field holding the owning list.
    pub list_field: String,
    /// Backing field holding the context handle.
    pub context_field: String,
    /// Properties contributed by capability interfaces, in declaration order.
    pub capability_properties: Vec<String>,
    /// Properties contributed by the schema, in column order.
    pub schema_properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    pub namespace: Option<String>,
    pub base_type: Option<String>,
    pub attributes: TypeAttributes,
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldDefinition>,
    pub properties: Vec<PropertyDefinition>,
    pub methods: Vec<MethodDefinition>,
    pub constructors: Vec<ConstructorDefinition>,
    pub events: Vec<EventDefinition>,
    pub view_model: Option<ViewModelInfo>,
}

impl TypeDefinition {
    /// An empty public class.
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            base_type: None,
            attributes: TypeAttributes::PUBLIC | TypeAttributes::CLASS,
            interfaces: Vec::new(),
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            events: Vec::new(),
            view_model: None,
        }
    }

    /// An empty public interface.
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            attributes: TypeAttributes::PUBLIC | TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT,
            ..Self::class(name)
        }
    }

    pub fn is_interface(&self) -> bool {
        self.attributes.contains(TypeAttributes::INTERFACE)
    }

    /// Namespace-qualified name.
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDefinition> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn constructor(&self, kind: ConstructorKind) -> Option<&ConstructorDefinition> {
        self.constructors.iter().find(|c| c.kind == kind)
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }

    pub fn property_names(&self) -> Vec<String> {
        self.properties.iter().map(|p| p.name.clone()).collect()
    }

    pub fn method_names(&self) -> Vec<String> {
        self.methods.iter().map(|m| m.name.clone()).collect()
    }
}
