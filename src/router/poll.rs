use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::codec::Codec;
use crate::context::CallContext;
use crate::error::{CodecError, ResolutionError, RouterError};
use crate::method::{CallKind, MethodRegistry};
use crate::resolver::ParameterResolver;
use crate::transport::{IncomingCall, OutgoingResponse, JSON_CONTENT_TYPE};

use super::envelope::PollResponse;
use super::invoke::{contain, Invoker};

/// Single-call path for polling providers, addressed by URL instead of a
/// request body.
pub struct PollDispatcher {
    registry: Arc<MethodRegistry>,
    invoker: Arc<Invoker>,
    resolver: ParameterResolver,
    codec: Arc<dyn Codec>,
}

impl PollDispatcher {
    pub(crate) fn new(registry: Arc<MethodRegistry>, invoker: Arc<Invoker>, codec: Arc<dyn Codec>) -> Self {
        Self {
            registry,
            invoker,
            resolver: ParameterResolver::new(),
            codec,
        }
    }

    /// Invoke `action.method` and answer with an event named `event`.
    ///
    /// Handler and lookup failures are answered with an exception event, so
    /// only an encoding failure surfaces as an error.
    pub fn dispatch(
        &self,
        action: &str,
        method: &str,
        event: &str,
        call: &IncomingCall,
    ) -> Result<OutgoingResponse, RouterError> {
        debug!(action, method, event, "dispatching poll");
        let ctx = CallContext::from_incoming(call);
        let reply = self.poll(action, method, event, &ctx);
        let body = serde_json::to_value(&reply).map_err(|e| CodecError::Encode(e.to_string()))?;
        let mut response = OutgoingResponse::ok(JSON_CONTENT_TYPE, self.codec.encode(&body)?);
        response.headers = ctx.response().headers();
        Ok(response)
    }

    /// The event for one poll, without encoding it.
    pub fn poll(&self, action: &str, method: &str, event: &str, ctx: &CallContext) -> PollResponse {
        match contain(|| self.execute(action, method, ctx)) {
            Ok(data) => PollResponse::event(event, data),
            Err(err) => {
                let failure = self.invoker.failure(&err, action, method);
                PollResponse::exception(event, failure.message, failure.location)
            }
        }
    }

    fn execute(&self, action: &str, method: &str, ctx: &CallContext) -> Result<Value, RouterError> {
        let descriptor = self.registry.resolve(action, method)?;
        if descriptor.kind() != CallKind::Poll {
            return Err(ResolutionError::UnsupportedCall {
                detail: format!(
                    "{} method '{}' is not a polling provider",
                    descriptor.kind(),
                    descriptor.qualified_name()
                ),
            }
            .into());
        }
        let args = self.resolver.resolve_from_params(&descriptor, ctx)?;
        self.invoker.invoke(&descriptor, &args, ctx)
    }
}
