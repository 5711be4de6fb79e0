use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

/// Everything a rendered descriptor depends on besides the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiCacheKey {
    pub api_ns: Option<String>,
    pub action_ns: Option<String>,
    pub remoting_api_var: String,
    pub polling_urls_var: String,
    pub group: Option<String>,
    pub debug: bool,
    pub json: bool,
    pub router_url: String,
}

#[derive(Default)]
struct Entries {
    values: HashMap<ApiCacheKey, Arc<str>>,
    order: VecDeque<ApiCacheKey>,
}

/// Bounded cache of rendered descriptors. The oldest entry is dropped once
/// `capacity` is reached; a dropped entry is rebuilt on the next request.
pub struct ApiCache {
    capacity: usize,
    entries: RwLock<Entries>,
}

impl ApiCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn get(&self, key: &ApiCacheKey) -> Option<Arc<str>> {
        let entries = self.entries.read().ok()?;
        entries.values.get(key).cloned()
    }

    /// Store `value` unless another writer got there first, and return the
    /// value that ends up cached. A poisoned cache, or one with zero
    /// capacity, stores nothing.
    pub fn insert(&self, key: ApiCacheKey, value: Arc<str>) -> Arc<str> {
        if self.capacity == 0 {
            return value;
        }
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(_) => return value,
        };
        if let Some(existing) = entries.values.get(&key) {
            return Arc::clone(existing);
        }
        while entries.order.len() >= self.capacity {
            match entries.order.pop_front() {
                Some(oldest) => {
                    entries.values.remove(&oldest);
                }
                None => break,
            }
        }
        entries.order.push_back(key.clone());
        entries.values.insert(key, Arc::clone(&value));
        value
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.values.clear();
            entries.order.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.values.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
