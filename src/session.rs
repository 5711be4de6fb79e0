//! HTTP session state shared between calls of the same client.
//!
//! A `Session` is a cheap handle: clones share the same variable map, so a
//! handler that stores a value is visible to every later call carrying the
//! same session id.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde_json::Value;

/// Session handle identified by an opaque id.
#[derive(Debug, Clone, Default)]
pub struct Session {
    id: String,
    variables: Arc<RwLock<HashMap<String, Value>>>,
}

impl Session {
    /// Create an empty session with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            variables: Arc::default(),
        }
    }

    /// Create a session from a map of variables.
    pub fn from_map(id: impl Into<String>, variables: HashMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            variables: Arc::new(RwLock::new(variables)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get a session variable by key.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.variables
            .read()
            .ok()
            .and_then(|vars| vars.get(key).cloned())
    }

    /// Set a session variable, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        match self.variables.write() {
            Ok(mut vars) => vars.insert(key.into(), value),
            Err(poisoned) => poisoned.into_inner().insert(key.into(), value),
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.variables.write().ok().and_then(|mut vars| vars.remove(key))
    }

    /// Check if a session variable exists.
    pub fn has(&self, key: &str) -> bool {
        self.variables
            .read()
            .map(|vars| vars.contains_key(key))
            .unwrap_or(false)
    }

    /// Snapshot of all session variables.
    pub fn variables(&self) -> HashMap<String, Value> {
        self.variables
            .read()
            .map(|vars| vars.clone())
            .unwrap_or_default()
    }
}

const DEFAULT_SESSION_CAPACITY: usize = 10_000;

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<String, Session>,
    order: VecDeque<String>,
}

/// In-memory session table keyed by session id.
///
/// Holds at most `capacity` sessions; creating one more drops the oldest.
#[derive(Debug)]
pub struct SessionStore {
    capacity: usize,
    sessions: Mutex<Sessions>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SESSION_CAPACITY)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sessions: Mutex::new(Sessions::default()),
        }
    }

    fn table(&self) -> MutexGuard<'_, Sessions> {
        match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Return the session for `id`, creating an empty one on first use.
    pub fn get_or_create(&self, id: &str) -> Session {
        let mut table = self.table();
        if let Some(session) = table.by_id.get(id) {
            return session.clone();
        }
        while table.order.len() >= self.capacity {
            match table.order.pop_front() {
                Some(oldest) => {
                    table.by_id.remove(&oldest);
                }
                None => break,
            }
        }
        let session = Session::new(id);
        table.order.push_back(id.to_string());
        table.by_id.insert(id.to_string(), session.clone());
        session
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.table().by_id.get(id).cloned()
    }

    pub fn invalidate(&self, id: &str) -> bool {
        let mut table = self.table();
        let removed = table.by_id.remove(id).is_some();
        if removed {
            table.order.retain(|known| known != id);
        }
        removed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.table().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
