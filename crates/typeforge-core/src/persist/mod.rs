//! Persisting compiled modules with bounded retry.
//!
//! A write that hits an exclusive-access conflict is retried a fixed number
//! of times. Between attempts the [`ContentionResolver`] clears the holders
//! and the writer blocks for the policy delay on an [`AbortHandle`].
//!
//! ```text
//! attempt ──► ok ─────────────────────────────────────► PersistReport
//!    │
//!    └─► sharing violation ─► resolve ─► wait(delay) ─► attempt
//!                 │ (max_attempts reached)
//!                 └────────────────────────────────────► Error::Persistence
//! ```

mod abort;
mod locks;
mod store;

pub use abort::AbortHandle;
pub use locks::{ContentionResolver, NoopResolver, ProcessTerminator};
pub use store::{FileStore, ModuleStore, is_sharing_violation};

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compile::{CompiledModule, SYMBOLS_EXTENSION};
use crate::error::{Error, Result};

/// Bounded retry policy for writes and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Wait between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Outcome of a successful persist or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReport {
    pub path: PathBuf,
    /// Attempts used, including the successful one.
    pub attempts: u32,
    /// Holders cleared by the contention resolver.
    pub cleared_holders: usize,
    /// Companion symbol stream, if one was written.
    pub symbols_path: Option<PathBuf>,
}

/// Writes and deletes module files.
pub struct ModuleWriter {
    policy: RetryPolicy,
    store: Box<dyn ModuleStore>,
    resolver: Box<dyn ContentionResolver>,
    abort: AbortHandle,
}

impl Default for ModuleWriter {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl ModuleWriter {
    /// Writer over the filesystem that terminates lock holders.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            store: Box::new(FileStore),
            resolver: Box::new(ProcessTerminator),
            abort: AbortHandle::new(),
        }
    }

    pub fn with_store(mut self, store: impl ModuleStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    pub fn with_resolver(mut self, resolver: impl ContentionResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    pub fn with_abort_handle(mut self, abort: AbortHandle) -> Self {
        self.abort = abort;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Handle that cancels a pending retry wait.
    pub fn abort_handle(&self) -> &AbortHandle {
        &self.abort
    }

    /// Write `bytes` to `path`.
    pub fn persist(&self, path: &Path, bytes: &[u8]) -> Result<PersistReport> {
        self.retry(path, |store| store.write(path, bytes))
    }

    /// Write a compiled module and, when present, its symbol stream next to it.
    ///
    /// If the symbol stream cannot be written the module file is removed
    /// again, so a failure leaves neither file behind.
    pub fn persist_module(&self, module: &CompiledModule, path: &Path) -> Result<PersistReport> {
        let mut report = self.persist(path, &module.bytes)?;
        if let Some(symbols) = &module.symbols {
            let symbols_path = path.with_extension(SYMBOLS_EXTENSION);
            let written = match self.persist(&symbols_path, symbols) {
                Ok(written) => written,
                Err(e) => {
                    if let Err(cleanup) = self.store.remove(path) {
                        tracing::warn!("Failed to remove {}: {}", path.display(), cleanup);
                    }
                    return Err(e);
                }
            };
            report.attempts += written.attempts;
            report.cleared_holders += written.cleared_holders;
            report.symbols_path = Some(symbols_path);
        }
        tracing::info!("Persisted module {} to {}", module.name, path.display());
        Ok(report)
    }

    /// Delete a module file and its symbol stream.
    pub fn delete(&self, path: &Path) -> Result<PersistReport> {
        let symbols_path = path.with_extension(SYMBOLS_EXTENSION);
        let had_symbols = symbols_path.exists();

        let mut report = self.retry(path, |store| store.remove(path))?;
        if had_symbols {
            let removed = self.retry(&symbols_path, |store| store.remove(&symbols_path))?;
            report.attempts += removed.attempts;
            report.cleared_holders += removed.cleared_holders;
            report.symbols_path = Some(symbols_path);
        }
        tracing::info!("Deleted module {}", path.display());
        Ok(report)
    }

    fn retry<F>(&self, path: &Path, op: F) -> Result<PersistReport>
    where
        F: Fn(&dyn ModuleStore) -> io::Result<()>,
    {
        let max = self.policy.max_attempts.max(1);
        let mut cleared_holders = 0;
        let mut attempt = 0;

        loop {
            if self.abort.is_aborted() {
                return Err(Error::Aborted);
            }
            attempt += 1;

            match op(self.store.as_ref()) {
                Ok(()) => {
                    if attempt > 1 {
                        tracing::info!(
                            "{} succeeded after {} attempt(s)",
                            path.display(),
                            attempt
                        );
                    }
                    return Ok(PersistReport {
                        path: path.to_path_buf(),
                        attempts: attempt,
                        cleared_holders,
                        symbols_path: None,
                    });
                }
                Err(e) if is_sharing_violation(&e) && attempt < max => {
                    tracing::warn!(
                        "Sharing violation on {} (attempt {}/{}): {}",
                        path.display(),
                        attempt,
                        max,
                        e
                    );
                    cleared_holders += self.resolver.resolve(path);
                    if self.abort.wait_timeout(self.policy.delay) {
                        return Err(Error::Aborted);
                    }
                }
                Err(source) => {
                    return Err(Error::Persistence {
                        path: path.to_path_buf(),
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}
