//! Core engine for typeforge: types synthesized from tabular schemas.
//!
//! This crate provides:
//! - Schema translation into ordered property/field pairs
//! - Model and view-model layout with a fixed capability contract
//! - Two emission paths (source text and direct metadata) into one compiler
//! - Module persistence with bounded retry on sharing violations
//! - Isolated loading with checked use-after-unload

pub mod capability;
pub mod compile;
pub mod error;
pub mod model;
pub mod paths;
pub mod persist;
pub mod pipeline;
pub mod runtime;
pub mod schema;
pub mod synth;

pub use error::{Error, Result};
pub use paths::ForgeDirs;
pub use capability::{CapabilityRegistry, ContractMember};
pub use compile::{
    CompilationResult, CompiledModule, CompilerConfig, Diagnostic, ModuleCompiler,
    ModuleReference, ReferenceSet, Severity, SourceUnit,
};
pub use model::{ModuleDefinition, PrimitiveKind, TypeDefinition, TypeRef};
pub use persist::{ModuleWriter, RetryPolicy};
pub use pipeline::{
    EmissionPath, Synthesis, SynthesisConfig, SynthesisRequest, SynthesisStage, Synthesizer,
};
pub use runtime::{Instance, LoadedModule, TypeHandle, TypeToken, Value, ViewModel};
pub use schema::{SchemaColumn, SchemaDocument, SchemaTranslator, TranslatedSchema};
pub use synth::{MetadataEmitter, SourceSynthesizer, TypeLayout};
