use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::context::Arguments;
use crate::error::HandlerError;
use crate::method::{CallKind, ParamType, ParameterDescriptor};

pub(crate) type HandlerFn = Arc<dyn Fn(&Arguments) -> Result<Value, HandlerError> + Send + Sync>;

/// What a handler returns, as far as the router needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReturnShape {
    /// Any JSON value.
    #[default]
    Value,
    /// Nothing; the router synthesizes the reply.
    Unit,
    /// A `FormPostResult`.
    FormPostResult,
}

/// One method of an action: its markers, parameters and closure.
#[derive(Clone)]
pub struct MethodDefinition {
    name: String,
    markers: Vec<CallKind>,
    params: Vec<ParameterDescriptor>,
    group: Option<String>,
    synchronize_on_session: bool,
    stream_response: bool,
    batched: bool,
    event: Option<String>,
    entry_type: Option<ParamType>,
    returns: ReturnShape,
    handler: HandlerFn,
}

impl MethodDefinition {
    /// Create an unmarked method. It is not callable until a kind marker is added.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            markers: Vec::new(),
            params: Vec::new(),
            group: None,
            synchronize_on_session: false,
            stream_response: false,
            batched: true,
            event: None,
            entry_type: None,
            returns: ReturnShape::Value,
            handler: Arc::new(handler),
        }
    }

    /// Add a call-kind marker.
    pub fn kind(mut self, kind: CallKind) -> Self {
        if !self.markers.contains(&kind) {
            self.markers.push(kind);
        }
        self
    }

    pub fn simple(self) -> Self {
        self.kind(CallKind::Simple)
    }

    pub fn simple_named(self) -> Self {
        self.kind(CallKind::SimpleNamed)
    }

    pub fn form_load(self) -> Self {
        self.kind(CallKind::FormLoad)
    }

    pub fn store_read(self) -> Self {
        self.kind(CallKind::StoreRead)
    }

    pub fn store_modify(self) -> Self {
        self.kind(CallKind::StoreModify)
    }

    pub fn form_post(self) -> Self {
        self.kind(CallKind::FormPost)
    }

    pub fn form_post_json(self) -> Self {
        self.kind(CallKind::FormPostJson)
    }

    pub fn tree_load(self) -> Self {
        self.kind(CallKind::TreeLoad)
    }

    pub fn poll(self) -> Self {
        self.kind(CallKind::Poll)
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = ParameterDescriptor>) -> Self {
        self.params.extend(params);
        self
    }

    /// Comma-separated API groups this method belongs to.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn synchronize_on_session(mut self) -> Self {
        self.synchronize_on_session = true;
        self
    }

    pub fn stream_response(mut self) -> Self {
        self.stream_response = true;
        self
    }

    pub fn batched(mut self, batched: bool) -> Self {
        self.batched = batched;
        self
    }

    /// Event name of a POLL method. Defaults to the method name.
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Element type of the record list of a STORE_MODIFY method.
    pub fn entry_type(mut self, ty: ParamType) -> Self {
        self.entry_type = Some(ty);
        self
    }

    pub fn returns(mut self, shape: ReturnShape) -> Self {
        self.returns = shape;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn markers(&self) -> &[CallKind] {
        &self.markers
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.params
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref()
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronize_on_session
    }

    pub fn is_streamed(&self) -> bool {
        self.stream_response
    }

    pub fn is_batched(&self) -> bool {
        self.batched
    }

    pub fn event_name(&self) -> Option<&str> {
        self.event.as_deref()
    }

    pub fn entry(&self) -> Option<&ParamType> {
        self.entry_type.as_ref()
    }

    pub fn return_shape(&self) -> ReturnShape {
        self.returns
    }

    pub fn call(&self, args: &Arguments) -> Result<Value, HandlerError> {
        (self.handler)(args)
    }
}

impl fmt::Debug for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDefinition")
            .field("name", &self.name)
            .field("markers", &self.markers)
            .field("params", &self.params)
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// A named action and its methods, in declaration order.
#[derive(Debug, Clone)]
pub struct HandlerDefinition {
    name: String,
    methods: Vec<MethodDefinition>,
}

impl HandlerDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.methods.push(method);
        self
    }

    pub fn methods(mut self, methods: impl IntoIterator<Item = MethodDefinition>) -> Self {
        self.methods.extend(methods);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_definitions(&self) -> &[MethodDefinition] {
        &self.methods
    }

    /// Look up a method by name.
    pub fn find_method(&self, name: &str) -> Option<&MethodDefinition> {
        self.methods.iter().find(|m| m.name == name)
    }
}
