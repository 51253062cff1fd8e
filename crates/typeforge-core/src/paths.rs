//! Project directory layout.
//!
//! Generated artifacts live under a `.typeforge` directory next to the
//! project (or schema file) they were synthesized from:
//!
//! ```text
//! employee.json
//! .typeforge/
//! ├── build/      # Kept generated sources
//! └── modules/    # Persisted module images and symbol streams
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use crate::compile::{MODULE_EXTENSION, SYMBOLS_EXTENSION};
use crate::error::Result;

/// Name of the artifact directory.
pub const FORGE_DIR: &str = ".typeforge";

#[derive(Debug, Clone)]
pub struct ForgeDirs {
    /// The `.typeforge` directory itself.
    pub root_dir: PathBuf,

    /// Kept generated sources.
    pub build_dir: PathBuf,

    /// Persisted modules.
    pub modules_dir: PathBuf,
}

impl ForgeDirs {
    /// Layout next to a schema file. Creates the directories.
    pub fn from_schema_path(schema_path: &Path) -> Result<Self> {
        let dir = schema_path.parent().unwrap_or(Path::new("."));
        Self::from_root(dir)
    }

    /// Layout under `project_dir`. Creates the directories.
    pub fn from_root(project_dir: &Path) -> Result<Self> {
        let root_dir = project_dir.join(FORGE_DIR);
        let dirs = Self {
            build_dir: root_dir.join("build"),
            modules_dir: root_dir.join("modules"),
            root_dir,
        };
        dirs.create()?;
        Ok(dirs)
    }

    fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.build_dir)?;
        fs::create_dir_all(&self.modules_dir)?;
        Ok(())
    }

    /// Remove every artifact and recreate the empty layout.
    pub fn clean(&self) -> Result<()> {
        if self.root_dir.exists() {
            fs::remove_dir_all(&self.root_dir)?;
        }
        self.create()
    }

    /// Where the module `name` is persisted.
    pub fn module_path(&self, name: &str) -> PathBuf {
        self.modules_dir.join(format!("{name}.{MODULE_EXTENSION}"))
    }

    /// Companion symbol stream of the module `name`.
    pub fn symbols_path(&self, name: &str) -> PathBuf {
        self.modules_dir.join(format!("{name}.{SYMBOLS_EXTENSION}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_schema_path() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let schema_path = temp.path().join("employee.json");

        let dirs = ForgeDirs::from_schema_path(&schema_path).expect("Failed to create dirs");

        assert!(dirs.root_dir.ends_with(".typeforge"));
        assert!(dirs.build_dir.exists());
        assert!(dirs.modules_dir.exists());
        assert_eq!(
            dirs.module_path("Hr"),
            temp.path().join(".typeforge/modules/Hr.tfm")
        );
        assert!(dirs.symbols_path("Hr").ends_with("Hr.sym"));
    }

    #[test]
    fn test_clean() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let dirs = ForgeDirs::from_root(temp.path()).expect("Failed to create dirs");

        let module = dirs.module_path("Hr");
        fs::write(&module, b"TFMOD").expect("Failed to write module");

        dirs.clean().expect("Failed to clean");
        assert!(!module.exists());
        assert!(dirs.modules_dir.exists());
    }
}
