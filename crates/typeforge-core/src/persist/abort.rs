//! Abort signal for blocking waits.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// Handle for aborting a blocking wait.
///
/// Clones share state: aborting any clone wakes every thread blocked in
/// [`wait_timeout`](Self::wait_timeout) on any other clone.
#[derive(Clone, Default)]
pub struct AbortHandle {
    inner: Arc<AbortState>,
}

#[derive(Default)]
struct AbortState {
    aborted: AtomicBool,
    lock: Mutex<()>,
    signal: Condvar,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Request abort and wake all waiters.
    pub fn abort(&self) {
        let _guard = self.inner.lock.lock().unwrap_or_else(|p| p.into_inner());
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.signal.notify_all();
    }

    /// Clear the abort flag.
    pub fn reset(&self) {
        self.inner.aborted.store(false, Ordering::SeqCst);
    }

    /// Block for `timeout` or until aborted, whichever comes first.
    ///
    /// Returns `true` if the wait ended because of an abort.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.inner.lock.lock().unwrap_or_else(|p| p.into_inner());
        while !self.is_aborted() {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            guard = match self.inner.signal.wait_timeout(guard, deadline - now) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortHandle")
            .field("aborted", &self.is_aborted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clone_shares_state() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_aborted());

        clone.abort();
        assert!(handle.is_aborted());

        handle.reset();
        assert!(!clone.is_aborted());
    }

    #[test]
    fn test_wait_times_out() {
        let handle = AbortHandle::new();
        let start = Instant::now();
        assert!(!handle.wait_timeout(Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_abort_wakes_waiter() {
        let handle = AbortHandle::new();
        let waiter = {
            let handle = handle.clone();
            thread::spawn(move || handle.wait_timeout(Duration::from_secs(30)))
        };

        thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        handle.abort();
        assert!(waiter.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }
}
