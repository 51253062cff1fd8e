//! Error types for typeforge-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::compile::Diagnostic;

/// Result type for typeforge-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in typeforge-core.
#[derive(Debug, Error)]
pub enum Error {
    /// The schema was rejected before synthesis began.
    #[error("invalid schema `{subject}`: {reason}")]
    SchemaValidation { subject: String, reason: String },

    /// The statement lowering pass met a statement or operand outside its grammar.
    /// The whole emission is aborted.
    #[error("unsupported statement at line {line} in `{member}`: `{statement}` ({reason})")]
    UnsupportedStatement {
        member: String,
        line: usize,
        statement: String,
        reason: String,
    },

    /// Compilation produced at least one error diagnostic.
    #[error("compilation of module `{module}` failed with {} diagnostic(s)", diagnostics.len())]
    Compilation {
        module: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// Writing a module kept failing after the bounded retry.
    #[error("failed to persist {} after {attempts} attempt(s): {source}", path.display())]
    Persistence {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// The named type is not defined by the loaded module.
    #[error("type `{type_name}` not found in module `{module}`")]
    TypeResolution { module: String, type_name: String },

    /// A handle or instance outlived the module it came from.
    #[error("module `{module}` has been unloaded")]
    ModuleUnloaded { module: String },

    /// A property, method or constructor is not defined on the type.
    #[error("type `{type_name}` has no member `{member}`")]
    MemberNotFound { type_name: String, member: String },

    /// Execution of a member of a loaded type failed.
    #[error("execution error: {0}")]
    Execution(String),

    /// The bytes are not a valid module image.
    #[error("invalid module image: {0}")]
    InvalidImage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid operation (e.g., loading before compiling).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A blocking wait was aborted by request.
    #[error("operation aborted")]
    Aborted,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for schema validation failures.
    pub(crate) fn schema(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaValidation {
            subject: subject.into(),
            reason: reason.into(),
        }
    }

    /// Diagnostics carried by a compilation failure, empty for any other error.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Compilation { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }
}
