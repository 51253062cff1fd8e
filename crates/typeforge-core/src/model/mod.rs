//! Canonical, language-neutral type descriptions.
//!
//! Both emission backends produce and consume these definitions:
//!
//! ```text
//! SchemaColumn* ──► TypeDefinition ──► ModuleDefinition ──► compiler
//!                     │  fields, properties (get_/set_ accessors)
//!                     │  methods (instructions | contract intrinsics)
//!                     └─ constructors, events, view-model info
//! ```

mod definition;
mod instr;
mod module;
mod types;

pub use definition::{
    BACKING_FIELD_PREFIX, ConstructorDefinition, ConstructorKind, EventDefinition,
    FieldDefinition, MethodBody, MethodDefinition, ParameterDefinition, PropertyDefinition,
    SETTER_PARAMETER, TypeAttributes, TypeDefinition, ViewModelInfo, backing_field_name,
    getter_name, setter_name,
};
pub use instr::{BranchKind, Instruction, seal};
pub use module::{ModuleBuilder, ModuleDefinition};
pub use types::{Literal, PrimitiveKind, TypeRef, min_date};
