// src/supervise/registry.rs

//! Registry of child PIDs that are currently running.
//!
//! The registry is only used to know *whom to signal*: it never owns the
//! children. A PID is registered right after spawn and removed once the
//! child's termination chain has finished.

use std::collections::BTreeSet;
use std::fmt::Debug;
use std::sync::Mutex;

/// Trait abstracting the live-child set.
///
/// Production code uses [`SharedRegistry`]; tests can plug in a recording
/// implementation to observe registration order.
pub trait ChildRegistry: Send + Sync + Debug {
    fn register(&self, pid: u32);
    fn deregister(&self, pid: u32);
    /// Point-in-time copy of the tracked PIDs.
    fn snapshot(&self) -> Vec<u32>;
}

/// Default registry: a mutex-guarded ordered set.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    pids: Mutex<BTreeSet<u32>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A poisoned lock only means another thread panicked mid-insert; the set
    // itself is still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<u32>> {
        self.pids.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ChildRegistry for SharedRegistry {
    fn register(&self, pid: u32) {
        self.lock().insert(pid);
    }

    fn deregister(&self, pid: u32) {
        self.lock().remove(&pid);
    }

    fn snapshot(&self) -> Vec<u32> {
        self.lock().iter().copied().collect()
    }
}
