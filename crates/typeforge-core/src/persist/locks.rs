//! Clearing exclusive-access contention on module files.

use std::path::Path;

/// Clears whatever holds a file open so a write can be retried.
pub trait ContentionResolver: Send + Sync {
    /// Returns how many holders were cleared.
    fn resolve(&self, path: &Path) -> usize;
}

/// Does nothing. Retries then rely on the holder letting go by itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl ContentionResolver for NoopResolver {
    fn resolve(&self, _path: &Path) -> usize {
        0
    }
}

/// Terminates other processes holding the file open.
///
/// Holders are found through `/proc/<pid>/fd` on Linux. Elsewhere nothing
/// is found and the retry proceeds unassisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl ProcessTerminator {
    /// Processes other than this one with `path` open.
    pub fn holders(&self, path: &Path) -> Vec<u32> {
        find_holders(path)
    }
}

impl ContentionResolver for ProcessTerminator {
    fn resolve(&self, path: &Path) -> usize {
        let holders = self.holders(path);
        if holders.is_empty() {
            tracing::debug!("No process holds {}", path.display());
            return 0;
        }

        let mut killed = 0;
        for pid in holders {
            if kill(pid) {
                tracing::warn!("Killed process {} holding {}", pid, path.display());
                killed += 1;
            } else {
                tracing::warn!("Failed to kill process {} holding {}", pid, path.display());
            }
        }
        killed
    }
}

#[cfg(target_os = "linux")]
fn find_holders(path: &Path) -> Vec<u32> {
    use std::fs;

    let Ok(target) = fs::canonicalize(path) else {
        return Vec::new();
    };
    let Ok(entries) = fs::read_dir("/proc") else {
        return Vec::new();
    };
    let own = std::process::id();

    entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter(|pid| *pid != own)
        .filter(|pid| {
            fs::read_dir(format!("/proc/{pid}/fd"))
                .map(|fds| {
                    fds.flatten()
                        .any(|fd| fs::read_link(fd.path()).is_ok_and(|link| link == target))
                })
                .unwrap_or(false)
        })
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn find_holders(path: &Path) -> Vec<u32> {
    tracing::debug!("Holder lookup unsupported here, skipping {}", path.display());
    Vec::new()
}

#[cfg(unix)]
fn kill(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SIGKILL for immediate termination
    unsafe { libc::kill(pid, libc::SIGKILL) == 0 }
}

#[cfg(not(unix))]
fn kill(_pid: u32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    #[test]
    fn test_own_process_is_not_a_holder() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("Hr.tfm");
        let _open = File::create(&path).unwrap();

        assert!(ProcessTerminator.holders(&path).is_empty());
        assert_eq!(ProcessTerminator.resolve(&path), 0);
    }

    #[test]
    fn test_missing_file_has_no_holders() {
        assert!(ProcessTerminator.holders(Path::new("/nonexistent/x.tfm")).is_empty());
        assert_eq!(NoopResolver.resolve(Path::new("/nonexistent/x.tfm")), 0);
    }
}
