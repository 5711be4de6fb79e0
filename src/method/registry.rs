use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use crate::catalog::HandlerCatalog;
use crate::error::RouterError;
use crate::lock::LockError;

use super::descriptor::MethodDescriptor;

type MethodKey = (String, String);

/// Lazily populated map from `(action, method)` to its descriptor.
///
/// Descriptors are built on first lookup and shared from then on. Misses are
/// never cached, so an unknown name costs a catalog lookup every time.
pub struct MethodRegistry {
    catalog: Arc<dyn HandlerCatalog>,
    descriptors: RwLock<HashMap<MethodKey, Arc<MethodDescriptor>>>,
}

impl MethodRegistry {
    pub fn new(catalog: Arc<dyn HandlerCatalog>) -> Self {
        Self {
            catalog,
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<dyn HandlerCatalog> {
        &self.catalog
    }

    /// Descriptor for `action.method`, classifying it on first use.
    pub fn resolve(&self, action: &str, method: &str) -> Result<Arc<MethodDescriptor>, RouterError> {
        let key = (action.to_string(), method.to_string());
        {
            let descriptors = self.descriptors.read().map_err(|_| poisoned())?;
            if let Some(found) = descriptors.get(&key) {
                return Ok(Arc::clone(found));
            }
        }

        let handler = self
            .catalog
            .handler(action)
            .ok_or_else(|| RouterError::ActionNotFound(action.to_string()))?;
        let definition =
            handler
                .find_method(method)
                .ok_or_else(|| RouterError::MethodNotFound {
                    action: action.to_string(),
                    method: method.to_string(),
                })?;
        let descriptor = MethodDescriptor::classify(action, definition)?;

        let mut descriptors = self.descriptors.write().map_err(|_| poisoned())?;
        let stored = descriptors
            .entry(key)
            .or_insert_with(|| {
                debug!(method = %descriptor.qualified_name(), kind = %descriptor.kind(), "registered method");
                Arc::new(descriptor)
            });
        Ok(Arc::clone(stored))
    }

    /// Classify every marked method of the catalog, in catalog order.
    ///
    /// Invalid methods are logged during classification and left out.
    pub fn scan(&self) -> Result<Vec<Arc<MethodDescriptor>>, RouterError> {
        let mut found = Vec::new();
        for handler in self.catalog.list_handlers() {
            for definition in handler.method_definitions() {
                if definition.markers().is_empty() {
                    continue;
                }
                match self.resolve(handler.name(), definition.name()) {
                    Ok(descriptor) => found.push(descriptor),
                    Err(RouterError::Lock(e)) => return Err(RouterError::Lock(e)),
                    Err(_) => {}
                }
            }
        }
        info!(methods = found.len(), "scanned handler catalog");
        Ok(found)
    }

    /// Number of descriptors built so far.
    pub fn len(&self) -> usize {
        self.descriptors.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> RouterError {
    RouterError::Lock(LockError::poisoned("method registry"))
}
