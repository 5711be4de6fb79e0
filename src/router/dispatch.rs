use std::sync::Arc;
use std::thread;

use serde_json::{json, Value};
use tracing::{debug, error};

use crate::catalog::ReturnShape;
use crate::codec::Codec;
use crate::config::{ExecutionPolicy, RouterConfig};
use crate::context::CallContext;
use crate::error::{CodecError, ResolutionError, RouterError};
use crate::method::{CallKind, MethodDescriptor, MethodRegistry};
use crate::resolver::ParameterResolver;
use crate::transport::{IncomingCall, OutgoingResponse, HTML_CONTENT_TYPE, JSON_CONTENT_TYPE};

use super::envelope::{CallEnvelope, ResponseEnvelope};
use super::invoke::{contain, Invoker};
use super::results::{shape_result, FormPostResult};

/// Routes JSON calls (single or batched) and form submits to handlers.
pub struct RequestRouter {
    registry: Arc<MethodRegistry>,
    invoker: Arc<Invoker>,
    resolver: ParameterResolver,
    config: Arc<RouterConfig>,
    codec: Arc<dyn Codec>,
}

impl RequestRouter {
    pub(crate) fn new(
        registry: Arc<MethodRegistry>,
        invoker: Arc<Invoker>,
        config: Arc<RouterConfig>,
        codec: Arc<dyn Codec>,
    ) -> Self {
        Self {
            registry,
            invoker,
            resolver: ParameterResolver::new(),
            config,
            codec,
        }
    }

    /// Route a JSON request body holding one envelope or a list of them.
    ///
    /// A single envelope is answered with a single response, a list with a
    /// list of the same length and order. Only an unreadable body fails the
    /// whole request.
    pub fn route(&self, call: &IncomingCall) -> Result<OutgoingResponse, RouterError> {
        let body = self.codec.decode(call.body_bytes())?;
        let ctx = CallContext::from_incoming(call);

        let (reply, streamed) = match body {
            Value::Array(items) => {
                let responses = self.dispatch_batch(&items, &ctx);
                let streamed = responses.iter().any(|r| r.stream_response);
                (to_value(&responses)?, streamed)
            }
            single @ Value::Object(_) => {
                let response = self.dispatch_value(&single, &ctx);
                let streamed = response.stream_response;
                (to_value(&response)?, streamed)
            }
            other => {
                return Err(RouterError::Codec(CodecError::Decode(format!(
                    "expected a call envelope or a list of them, got {}",
                    json_type(&other)
                ))))
            }
        };

        self.render(&reply, call.is_multipart(), streamed || self.config.stream_response, &ctx)
    }

    /// Route a form submit addressed by its `extAction`/`extMethod` fields.
    pub fn route_form_post(&self, call: &IncomingCall) -> Result<OutgoingResponse, RouterError> {
        let ctx = CallContext::from_incoming(call);
        let request = ctx.request();
        let field = |name: &str| request.param(name).unwrap_or_default().to_string();

        let mut envelope = CallEnvelope::new(
            field("extAction"),
            field("extMethod"),
            request
                .param("extTID")
                .and_then(|t| t.trim().parse().ok())
                .unwrap_or_default(),
        );
        if let Some(kind) = request.param("extType") {
            envelope.kind = kind.to_string();
        }
        let multipart = call.is_multipart()
            || request
                .param("extUpload")
                .map_or(false, |u| u.eq_ignore_ascii_case("true"));

        debug!(action = %envelope.action, method = %envelope.method, tid = envelope.tid, "routing form post");
        let response = match contain(|| self.execute_form_post(&envelope, &ctx)) {
            Ok(result) => ResponseEnvelope::success(&envelope, Some(result)),
            Err(err) => {
                let mut response = self.exception(&envelope, &err);
                response.result = Some(json!({ "success": false }));
                response
            }
        };
        self.render(&to_value(&response)?, multipart, false, &ctx)
    }

    /// Handle one decoded envelope. Never fails: errors become exception
    /// envelopes.
    pub fn handle_call(&self, envelope: &CallEnvelope, ctx: &CallContext) -> ResponseEnvelope {
        debug!(action = %envelope.action, method = %envelope.method, tid = envelope.tid, "routing call");
        let outcome = contain(|| {
            let (descriptor, result) = self.execute(envelope, ctx)?;
            let shaped = shape_result(
                descriptor.kind(),
                result,
                self.config.always_wrap_store_response,
            );
            Ok((shaped, descriptor.stream_response()))
        });
        match outcome {
            Ok((shaped, streamed)) => {
                let mut response = ResponseEnvelope::success(envelope, shaped);
                response.stream_response = streamed;
                response
            }
            Err(err) => self.exception(envelope, &err),
        }
    }

    /// Run every item of a batch, preserving order in the result.
    pub fn dispatch_batch(&self, items: &[Value], ctx: &CallContext) -> Vec<ResponseEnvelope> {
        let concurrent = self.config.batched_methods_execution_policy == ExecutionPolicy::Concurrent
            && items.len() > 1;
        if !concurrent {
            return items.iter().map(|item| self.dispatch_value(item, ctx)).collect();
        }

        let workers = self.config.batch_threads.max(1).min(items.len());
        let chunk_size = (items.len() + workers - 1) / workers;
        thread::scope(|scope| {
            let handles: Vec<_> = items
                .chunks(chunk_size)
                .map(|chunk| {
                    let handle = scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|item| self.dispatch_value(item, ctx))
                            .collect::<Vec<_>>()
                    });
                    (chunk, handle)
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|(chunk, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        error!("batch worker panicked");
                        chunk
                            .iter()
                            .map(|item| {
                                let envelope = CallEnvelope::salvage(item);
                                ResponseEnvelope::exception(
                                    &envelope,
                                    self.config.default_exception_message.clone(),
                                    None,
                                )
                            })
                            .collect()
                    })
                })
                .collect()
        })
    }

    fn dispatch_value(&self, item: &Value, ctx: &CallContext) -> ResponseEnvelope {
        match serde_json::from_value::<CallEnvelope>(item.clone()) {
            Ok(envelope) => self.handle_call(&envelope, ctx),
            Err(e) => {
                let envelope = CallEnvelope::salvage(item);
                let err = RouterError::Resolution(ResolutionError::UnexpectedPayload {
                    detail: format!("malformed call envelope: {}", e),
                });
                self.exception(&envelope, &err)
            }
        }
    }

    fn execute(
        &self,
        envelope: &CallEnvelope,
        ctx: &CallContext,
    ) -> Result<(Arc<MethodDescriptor>, Value), RouterError> {
        let descriptor = self.registry.resolve(&envelope.action, &envelope.method)?;
        let args = self
            .resolver
            .resolve(&descriptor, envelope.data.as_ref(), ctx)?;
        let result = self.invoker.invoke(&descriptor, &args, ctx)?;
        Ok((descriptor, result))
    }

    fn execute_form_post(&self, envelope: &CallEnvelope, ctx: &CallContext) -> Result<Value, RouterError> {
        let descriptor = self.registry.resolve(&envelope.action, &envelope.method)?;
        if descriptor.kind() != CallKind::FormPost {
            return Err(ResolutionError::UnsupportedCall {
                detail: format!(
                    "{} method '{}' cannot be called as a form post",
                    descriptor.kind(),
                    descriptor.qualified_name()
                ),
            }
            .into());
        }
        if !ctx.request().http_method().eq_ignore_ascii_case("POST") {
            return Err(ResolutionError::UnsupportedCall {
                detail: format!("form posts must use POST, not {}", ctx.request().http_method()),
            }
            .into());
        }

        let args = self.resolver.resolve_from_params(&descriptor, ctx)?;
        let result = self.invoker.invoke(&descriptor, &args, ctx)?;
        let collected = || FormPostResult::from_errors(args.binding_errors().cloned().unwrap_or_default());
        Ok(match (descriptor.returns(), result) {
            (ReturnShape::FormPostResult, value) if !value.is_null() => value,
            _ => collected().into(),
        })
    }

    fn exception(&self, envelope: &CallEnvelope, err: &RouterError) -> ResponseEnvelope {
        let failure = self.invoker.failure(err, &envelope.action, &envelope.method);
        ResponseEnvelope::exception(envelope, failure.message, failure.location)
    }

    fn render(
        &self,
        reply: &Value,
        multipart: bool,
        streamed: bool,
        ctx: &CallContext,
    ) -> Result<OutgoingResponse, RouterError> {
        let bytes = self.codec.encode(reply)?;
        let mut response = if multipart {
            OutgoingResponse::ok(HTML_CONTENT_TYPE, wrap_upload_reply(&bytes))
        } else {
            OutgoingResponse::ok(JSON_CONTENT_TYPE, bytes)
        };
        response.streamed = streamed;
        response.headers = ctx.response().headers();
        Ok(response)
    }
}

/// Upload replies travel inside a textarea of an HTML page, which the
/// client reads back from a hidden iframe.
fn wrap_upload_reply(json: &[u8]) -> Vec<u8> {
    let text = String::from_utf8_lossy(json).replace("&quot;", "\\&quot;");
    format!("<html><body><textarea>{}</textarea></body></html>", text).into_bytes()
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value, RouterError> {
    serde_json::to_value(value).map_err(|e| RouterError::Codec(CodecError::Encode(e.to_string())))
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
