//! Storage backends for module files.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

/// Writes and removes module files.
pub trait ModuleStore: Send + Sync {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Remove `path`. A missing file is not an error.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

/// Filesystem store.
///
/// Writes go to a uniquely named temp file next to the target, which is then
/// renamed over it. Readers see either the old module or the new one, never
/// a partial or empty file. An existing target is held under an exclusive
/// advisory lock for the duration; a missing target is never created early.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl FileStore {
    /// Lock an existing target. `None` when there is nothing to lock.
    fn lock_existing(path: &Path) -> io::Result<Option<File>> {
        let file = match OpenOptions::new().read(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        file.try_lock_exclusive()?;
        Ok(Some(file))
    }

    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4()))
    }
}

impl ModuleStore for FileStore {
    fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let lock = Self::lock_existing(path)?;
        let temp = Self::temp_path(path);
        let written = File::create(&temp)
            .and_then(|mut file| {
                file.write_all(bytes)?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp, path));

        if written.is_err() {
            let _ = fs::remove_file(&temp);
        }
        if let Some(lock) = &lock {
            let _ = FileExt::unlock(lock);
        }
        written
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        let Some(lock) = Self::lock_existing(path)? else {
            return Ok(());
        };
        let removed = match fs::remove_file(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        };
        let _ = FileExt::unlock(&lock);
        removed
    }
}

/// Whether `err` is an exclusive-access conflict worth retrying.
pub fn is_sharing_violation(err: &io::Error) -> bool {
    if err.kind() == io::ErrorKind::WouldBlock {
        return true;
    }
    let Some(code) = err.raw_os_error() else {
        return false;
    };
    if Some(code) == fs2::lock_contended_error().raw_os_error() {
        return true;
    }

    #[cfg(windows)]
    {
        // ERROR_SHARING_VIOLATION, ERROR_LOCK_VIOLATION
        code == 32 || code == 33
    }
    #[cfg(unix)]
    {
        code == libc::EBUSY || code == libc::ETXTBSY
    }
    #[cfg(not(any(unix, windows)))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_remove() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("modules/Hr.tfm");

        FileStore.write(&path, b"first").unwrap();
        FileStore.write(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        FileStore.remove(&path).unwrap();
        assert!(!path.exists());
        FileStore.remove(&path).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_first_write_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        // A valid target name whose temp sibling exceeds the file name limit.
        let path = temp.path().join(format!("{}.tfm", "m".repeat(230)));

        assert!(FileStore.write(&path, b"TFMOD").is_err());
        assert!(!path.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_locked_file_is_a_sharing_violation() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Hr.tfm");
        let holder = File::create(&path).unwrap();
        holder.lock_exclusive().unwrap();

        let err = FileStore.write(&path, b"x").unwrap_err();
        assert!(is_sharing_violation(&err));

        FileExt::unlock(&holder).unwrap();
        FileStore.write(&path, b"x").unwrap();
    }

    #[test]
    fn test_classification() {
        assert!(is_sharing_violation(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_sharing_violation(&io::Error::from(io::ErrorKind::NotFound)));
        #[cfg(unix)]
        assert!(is_sharing_violation(&io::Error::from_raw_os_error(libc::EBUSY)));
    }
}
