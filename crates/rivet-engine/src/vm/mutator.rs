//! Mutator lock
//!
//! Runtime-wide reader/writer lock guarding the managed object graph. Every
//! invocation holds it shared from entry until the result is converted. The
//! collector (or anything else that rewrites the graph) takes it exclusively.
//!
//! ## Release points
//!
//! The bridge never releases the lock itself. The execution-engine
//! collaborator may release it around a blocking section with
//! [`MutatorGuard::suspended`]; the guard is re-acquired before `suspended`
//! returns, so the bridge observes a held lock on both sides of the call.
//! Re-acquisition is recursive as well: a nested invocation must get its hold
//! back even when a writer is queued behind an outer hold on the same thread.

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// The runtime-wide shared/exclusive lock
#[derive(Debug, Default)]
pub struct MutatorLock {
    lock: RwLock<()>,
    suspensions: AtomicUsize,
}

impl MutatorLock {
    /// Create an unlocked mutator lock
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire in shared mode.
    ///
    /// Uses a recursive read so that a method body may re-enter the bridge
    /// while an exclusive acquirer is queued.
    pub fn shared(&self) -> MutatorGuard<'_> {
        MutatorGuard {
            guard: Some(self.lock.read_recursive()),
            owner: self,
        }
    }

    /// Acquire in exclusive mode (stop-the-world)
    pub fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.lock.write()
    }

    /// Try to acquire in exclusive mode without blocking
    pub fn try_exclusive(&self) -> Option<RwLockWriteGuard<'_, ()>> {
        self.lock.try_write()
    }

    /// Whether any thread holds the lock exclusively
    pub fn is_exclusively_held(&self) -> bool {
        self.lock.is_locked_exclusive()
    }

    /// Total number of times a shared holder suspended the lock
    pub fn suspension_count(&self) -> usize {
        self.suspensions.load(Ordering::Relaxed)
    }
}

/// Shared hold on the mutator lock, threaded through one invocation
pub struct MutatorGuard<'a> {
    guard: Option<RwLockReadGuard<'a, ()>>,
    owner: &'a MutatorLock,
}

impl MutatorGuard<'_> {
    /// Release the shared hold while `f` runs, then re-acquire it.
    ///
    /// Nothing read from the object graph before the call may be assumed
    /// unchanged after it.
    pub fn suspended<F, U>(&mut self, f: F) -> U
    where
        F: FnOnce() -> U,
    {
        self.owner.suspensions.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("mutator lock suspended");
        drop(self.guard.take());
        let result = f();
        self.guard = Some(self.owner.lock.read_recursive());
        tracing::trace!("mutator lock reacquired");
        result
    }
}

impl std::fmt::Debug for MutatorGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutatorGuard").finish_non_exhaustive()
    }
}
