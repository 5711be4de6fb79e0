use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};

use super::LockError;

/// Blocking lock backed by `Mutex<bool>` + `Condvar`.
///
/// Unlike `std::sync::Mutex` it guards no data and can be released from a
/// guard that outlives the borrow of the lock table.
pub struct SessionLock {
    state: Mutex<bool>,
    wake: Condvar,
}

impl SessionLock {
    pub fn new() -> Self {
        SessionLock {
            state: Mutex::new(false),
            wake: Condvar::new(),
        }
    }

    /// Block until the lock is free, then take it.
    pub fn lock(self: &Arc<Self>) -> Result<SessionLockGuard, LockError> {
        let mut locked = self
            .state
            .lock()
            .map_err(|_| LockError::poisoned("session lock"))?;
        while *locked {
            locked = self
                .wake
                .wait(locked)
                .map_err(|_| LockError::poisoned("session lock"))?;
        }
        *locked = true;
        Ok(SessionLockGuard {
            lock: Arc::clone(self),
            slot: None,
        })
    }

    /// Take the lock if it is free.
    pub fn try_lock(self: &Arc<Self>) -> Result<Option<SessionLockGuard>, LockError> {
        let mut locked = self
            .state
            .lock()
            .map_err(|_| LockError::poisoned("session lock"))?;
        if *locked {
            Ok(None)
        } else {
            *locked = true;
            Ok(Some(SessionLockGuard {
                lock: Arc::clone(self),
                slot: None,
            }))
        }
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().map(|locked| *locked).unwrap_or(true)
    }

    fn unlock(&self) {
        let mut locked = match self.state.lock() {
            Ok(locked) => locked,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *locked {
            *locked = false;
            self.wake.notify_one();
        }
    }
}

impl Default for SessionLock {
    fn default() -> Self {
        Self::new()
    }
}

type LockTable = Mutex<HashMap<String, Arc<SessionLock>>>;

/// Releases its `SessionLock` on drop, including when the handler panics.
///
/// A guard handed out by `SessionLocks` also removes the table entry once
/// nobody else holds or waits for the lock.
pub struct SessionLockGuard {
    lock: Arc<SessionLock>,
    slot: Option<(Arc<LockTable>, String)>,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        let Some((table, key)) = self.slot.take() else {
            self.lock.unlock();
            return;
        };
        let mut locks = match table.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.lock.unlock();
        // One reference in the table, one here: no holder or waiter left.
        let unused = locks
            .get(&key)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.lock) && Arc::strong_count(&self.lock) == 2);
        if unused {
            locks.remove(&key);
        }
    }
}

/// Lock table handing out one `SessionLock` per key.
///
/// Lazily creates one lock per unique key and returns the same `Arc` for
/// repeated lookups. Entries live while some caller holds or awaits them.
#[derive(Default)]
pub struct SessionLocks {
    locks: Arc<LockTable>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_lock(&self, key: &str) -> Result<Arc<SessionLock>, LockError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| LockError::poisoned("session lock table"))?;
        Ok(locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(SessionLock::new()))
            .clone())
    }

    /// Block until the lock for `key` is free and take it.
    pub fn acquire(&self, key: &str) -> Result<SessionLockGuard, LockError> {
        let mut guard = self.get_lock(key)?.lock()?;
        guard.slot = Some((Arc::clone(&self.locks), key.to_string()));
        Ok(guard)
    }

    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
