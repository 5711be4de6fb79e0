use std::error::Error;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::config::RouterConfig;
use crate::context::{Arguments, CallContext};
use crate::error::{HandlerError, RouterError};
use crate::lock::SessionLocks;
use crate::method::{MethodDescriptor, MethodRegistry};

/// Client-facing rendering of a failed call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Failure {
    pub message: String,
    pub location: Option<String>,
}

/// Invocation shared by the router and the poll dispatcher: session
/// locking, panic containment and failure rendering.
pub(crate) struct Invoker {
    registry: Arc<MethodRegistry>,
    locks: Arc<SessionLocks>,
    config: Arc<RouterConfig>,
}

impl Invoker {
    pub fn new(registry: Arc<MethodRegistry>, locks: Arc<SessionLocks>, config: Arc<RouterConfig>) -> Self {
        Self {
            registry,
            locks,
            config,
        }
    }

    pub fn invoke(
        &self,
        descriptor: &MethodDescriptor,
        args: &Arguments,
        ctx: &CallContext,
    ) -> Result<Value, RouterError> {
        let _guard = match self.lock_key(descriptor, ctx) {
            Some(key) => Some(self.locks.acquire(&key)?),
            None => None,
        };
        let catalog = self.registry.catalog();
        contain(|| Ok(catalog.invoke(descriptor.action(), descriptor.method(), args)?))
    }

    /// The global flag serializes every call of a session; the per-method
    /// flag only calls of the same method. No session, no lock.
    fn lock_key(&self, descriptor: &MethodDescriptor, ctx: &CallContext) -> Option<String> {
        let session = ctx.session()?;
        if self.config.synchronize_on_session {
            Some(session.id().to_string())
        } else if descriptor.synchronize_on_session() {
            Some(format!("{}#{}", session.id(), descriptor.qualified_name()))
        } else {
            None
        }
    }

    pub fn failure(&self, err: &RouterError, action: &str, method: &str) -> Failure {
        let qualified = format!("{}.{}", action, method);
        if err.is_routing() {
            error!(method = %qualified, kind = err.kind(), "call to unknown or unexposed method");
        } else {
            error!(method = %qualified, kind = err.kind(), "call failed: {}", err);
        }

        let config = &self.config;
        let message = match err {
            e if e.is_routing() => config.message_for(e.kind(), None, false),
            RouterError::Resolution(e) => config.message_for(err.kind(), Some(e.message()), true),
            RouterError::Invocation(e) => {
                config.message_for(e.kind(), e.message(), config.send_exception_message)
            }
            other => config.message_for(
                other.kind(),
                Some(other.to_string()),
                config.send_exception_message,
            ),
        };
        let location = config
            .send_stacktrace
            .then(|| diagnostic(err, &qualified));
        Failure { message, location }
    }
}

/// Run `work`, turning a panic into a `Panic` invocation error.
pub(crate) fn contain<T>(work: impl FnOnce() -> Result<T, RouterError>) -> Result<T, RouterError> {
    panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned());
        Err(RouterError::Invocation(HandlerError::Custom {
            kind: "Panic".to_string(),
            message,
        }))
    })
}

fn diagnostic(err: &RouterError, qualified: &str) -> String {
    match err {
        RouterError::ActionNotFound(_) | RouterError::MethodNotFound { .. } => {
            format!("Action or method '{}' not found", qualified)
        }
        RouterError::MethodNotExposed { .. } => {
            format!("Method '{}' is not exposed", qualified)
        }
        RouterError::Resolution(e) => e.detail(),
        other => {
            let mut text = other.to_string();
            let mut source = other.source();
            while let Some(cause) = source {
                text.push_str("\ncaused by: ");
                text.push_str(&cause.to_string());
                source = cause.source();
            }
            text
        }
    }
}
