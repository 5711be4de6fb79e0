//! Mutual exclusion of calls that share a session.

mod session_lock;

use std::fmt;

pub use session_lock::{SessionLock, SessionLockGuard, SessionLocks};

/// A lock's state was poisoned by a thread that panicked while holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockError {
    what: String,
}

impl LockError {
    pub fn poisoned(what: impl Into<String>) -> Self {
        LockError { what: what.into() }
    }

    /// Name of the poisoned lock.
    pub fn what(&self) -> &str {
        &self.what
    }
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} poisoned", self.what)
    }
}

impl std::error::Error for LockError {}
