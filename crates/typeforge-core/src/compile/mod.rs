//! Compilation of type definitions into loadable module images.
//!
//! # Architecture
//!
//! ```text
//! ModuleDefinition ───────────────────────────┐
//!                                              ├──► Verifier ──► ModuleImage ──► bytes
//! SourceUnit ──► SourceParser ──► TypeDefinition*┘       │
//!                     │                                  └──► Diagnostic*
//!                     └──► symbols (JSON)
//!
//! ReferenceSet ──► ModuleExports (resolved once per compilation)
//! ```

mod diagnostics;
mod driver;
mod image;
mod references;
mod source_parser;
mod types;
mod verify;

pub use diagnostics::{Diagnostic, Severity, codes};
pub use driver::{ModuleCompiler, SourceUnit};
pub use image::{FORMAT_VERSION, MAGIC, ModuleImage, checksum};
pub use references::{ModuleExports, ModuleReference, ReferenceSet, RuntimeModule};
pub use source_parser::{ParsedSource, SourceParser, SymbolEntry};
pub use types::{CompilationResult, CompiledModule, CompilerConfig};
pub use verify::Verifier;

/// File extension of persisted module images.
pub const MODULE_EXTENSION: &str = "tfm";

/// File extension of persisted debug-symbol streams.
pub const SYMBOLS_EXTENSION: &str = "sym";
