//! Handler catalog: the set of actions and methods the router can reach.
//!
//! Handlers are registered up front on an `InMemoryCatalog` and never
//! change afterwards. The router only talks to the `HandlerCatalog` trait,
//! so applications can supply their own lookup.
//!
//! ## Example
//!
//! ```ignore
//! use direct_router::catalog::{HandlerDefinition, InMemoryCatalog, MethodDefinition};
//! use direct_router::method::{ParamType, ParameterDescriptor};
//! use serde_json::json;
//!
//! let catalog = InMemoryCatalog::builder()
//!     .action(
//!         HandlerDefinition::new("calc").method(
//!             MethodDefinition::new("add", |args| {
//!                 let a: i64 = args.arg(0)?;
//!                 let b: i64 = args.arg(1)?;
//!                 Ok(json!(a + b))
//!             })
//!             .simple()
//!             .param(ParameterDescriptor::payload("a", ParamType::Integer))
//!             .param(ParameterDescriptor::payload("b", ParamType::Integer)),
//!         ),
//!     )
//!     .build()?;
//! ```

mod definition;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::context::Arguments;
use crate::error::{CatalogError, HandlerError};

pub use definition::{HandlerDefinition, MethodDefinition, ReturnShape};

/// Lookup and invocation of registered handlers.
pub trait HandlerCatalog: Send + Sync {
    /// All handlers, in registration order.
    fn list_handlers(&self) -> Vec<Arc<HandlerDefinition>>;

    /// Handler registered under `action`.
    fn handler(&self, action: &str) -> Option<Arc<HandlerDefinition>> {
        self.list_handlers().into_iter().find(|h| h.name() == action)
    }

    /// Invoke `action.method` with already-resolved arguments.
    fn invoke(&self, action: &str, method: &str, args: &Arguments) -> Result<Value, HandlerError> {
        let handler = self
            .handler(action)
            .ok_or_else(|| HandlerError::NotFound(format!("action '{}'", action)))?;
        let method_def = handler
            .find_method(method)
            .ok_or_else(|| HandlerError::NotFound(format!("method '{}.{}'", action, method)))?;
        method_def.call(args)
    }
}

/// Catalog held in memory, built once at startup.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    order: Vec<Arc<HandlerDefinition>>,
    by_name: HashMap<String, Arc<HandlerDefinition>>,
}

impl InMemoryCatalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Registered action names, in registration order.
    pub fn actions(&self) -> Vec<&str> {
        self.order.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl HandlerCatalog for InMemoryCatalog {
    fn list_handlers(&self) -> Vec<Arc<HandlerDefinition>> {
        self.order.clone()
    }

    fn handler(&self, action: &str) -> Option<Arc<HandlerDefinition>> {
        self.by_name.get(action).cloned()
    }
}

/// Builder for `InMemoryCatalog`.
///
/// Uses builder pattern: `action` returns `self` for chaining, and
/// `build` validates names.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    actions: Vec<HandlerDefinition>,
}

impl CatalogBuilder {
    pub fn action(mut self, handler: HandlerDefinition) -> Self {
        self.actions.push(handler);
        self
    }

    /// Reject duplicate or empty action and method names.
    pub fn build(self) -> Result<InMemoryCatalog, CatalogError> {
        let mut catalog = InMemoryCatalog::default();
        for handler in self.actions {
            if handler.name().is_empty() {
                return Err(CatalogError::EmptyName);
            }
            if catalog.by_name.contains_key(handler.name()) {
                return Err(CatalogError::DuplicateAction(handler.name().to_string()));
            }
            let mut seen = HashSet::new();
            for method in handler.method_definitions() {
                if method.name().is_empty() {
                    return Err(CatalogError::EmptyName);
                }
                if !seen.insert(method.name()) {
                    return Err(CatalogError::DuplicateMethod {
                        action: handler.name().to_string(),
                        method: method.name().to_string(),
                    });
                }
            }
            let handler = Arc::new(handler);
            catalog
                .by_name
                .insert(handler.name().to_string(), Arc::clone(&handler));
            catalog.order.push(handler);
        }
        Ok(catalog)
    }
}

/// Register action modules on a `CatalogBuilder` using the module convention.
///
/// Each action module must export:
/// - `ACTION: &str`, the action name
/// - `methods() -> Vec<MethodDefinition>`, its methods
///
/// # Example
/// ```ignore
/// let catalog = direct_router::register_actions!(
///     InMemoryCatalog::builder(),
///     actions::orders,
///     actions::users,
/// )
/// .build()?;
/// ```
#[macro_export]
macro_rules! register_actions {
    ($builder:expr, $( $($seg:ident)::+ ),+ $(,)?) => {
        $builder
        $(
            .action(
                $crate::catalog::HandlerDefinition::new($($seg)::+::ACTION)
                    .methods($($seg)::+::methods()),
            )
        )+
    };
}
