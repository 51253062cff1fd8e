//! Common types for the compilation pipeline.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::paths::ForgeDirs;

use super::diagnostics::Diagnostic;

/// Configuration for the compiler.
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    /// Directory for intermediate artifacts (.typeforge/build/)
    pub build_dir: PathBuf,

    /// Directory for compiled modules (.typeforge/modules/)
    pub modules_dir: PathBuf,

    /// Produce a debug-symbol stream on the text path
    pub emit_symbols: bool,

    /// Fail compilation on warnings
    pub treat_warnings_as_errors: bool,

    /// Write parsed source text to the build directory
    pub keep_sources: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            build_dir: PathBuf::from(".typeforge/build"),
            modules_dir: PathBuf::from(".typeforge/modules"),
            emit_symbols: true,
            treat_warnings_as_errors: false,
            keep_sources: false,
        }
    }
}

impl CompilerConfig {
    /// Create config for development builds.
    pub fn development() -> Self {
        Self::default()
    }

    /// Create config for production builds: no symbols, warnings fail.
    pub fn production() -> Self {
        Self {
            emit_symbols: false,
            treat_warnings_as_errors: true,
            ..Default::default()
        }
    }

    /// Create a development config with paths from ForgeDirs.
    pub fn for_dirs(dirs: &ForgeDirs) -> Self {
        Self {
            build_dir: dirs.build_dir.clone(),
            modules_dir: dirs.modules_dir.clone(),
            ..Self::development()
        }
    }
}

/// A successfully compiled module.
#[derive(Debug, Clone)]
pub struct CompiledModule {
    /// Module name
    pub name: String,

    /// Suggested file name
    pub file_name: String,

    /// Complete, independently loadable module image
    pub bytes: Vec<u8>,

    /// Debug-symbol stream (JSON), text path only
    pub symbols: Option<Vec<u8>>,

    /// Warnings reported during compilation
    pub warnings: Vec<Diagnostic>,
}

/// Result of a compilation operation. Never partially populated.
#[derive(Debug)]
pub enum CompilationResult {
    /// Compilation succeeded
    Success(CompiledModule),

    /// Compilation failed; `diagnostics` holds at least one error
    Failure {
        module: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl CompilationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Get the compiled module if successful.
    pub fn compiled(&self) -> Option<&CompiledModule> {
        match self {
            Self::Success(module) => Some(module),
            Self::Failure { .. } => None,
        }
    }

    /// Warnings on success, every diagnostic on failure.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Success(module) => &module.warnings,
            Self::Failure { diagnostics, .. } => diagnostics,
        }
    }

    /// Convert into a `Result`, failing with [`Error::Compilation`].
    pub fn into_result(self) -> Result<CompiledModule> {
        match self {
            Self::Success(module) => Ok(module),
            Self::Failure {
                module,
                diagnostics,
            } => Err(Error::Compilation {
                module,
                diagnostics,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::diagnostics::codes;

    #[test]
    fn test_config_presets() {
        let dev = CompilerConfig::development();
        assert!(dev.emit_symbols);
        assert!(!dev.treat_warnings_as_errors);

        let prod = CompilerConfig::production();
        assert!(!prod.emit_symbols);
        assert!(prod.treat_warnings_as_errors);
    }

    #[test]
    fn test_failure_into_result() {
        let result = CompilationResult::Failure {
            module: "Hr".into(),
            diagnostics: vec![Diagnostic::error(codes::EMPTY_MODULE, "no types")],
        };
        assert!(!result.is_success());
        assert!(result.compiled().is_none());
        assert_eq!(result.diagnostics().len(), 1);

        let err = result.into_result().unwrap_err();
        assert_eq!(err.diagnostics()[0].id, "TF0211");
    }
}
