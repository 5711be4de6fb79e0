use serde_json::Value;

use super::types::{ParamType, RecordSchema};

/// Ambient values a handler can ask for instead of reading them from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InjectedKind {
    Request,
    Response,
    Session,
    Locale,
    Principal,
}

impl InjectedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjectedKind::Request => "request",
            InjectedKind::Response => "response",
            InjectedKind::Session => "session",
            InjectedKind::Locale => "locale",
            InjectedKind::Principal => "principal",
        }
    }
}

/// Where a parameter's value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    /// Taken from the call payload, by name if the payload is named,
    /// otherwise by position.
    Payload,
    /// Named request parameter: the named payload map for JSON calls,
    /// form fields or query parameters otherwise.
    RequestParam,
    /// HTTP request header.
    Header,
    Injected(InjectedKind),
    /// The structured read request of a STORE_READ call.
    StoreRead,
    /// The record list of a STORE_MODIFY call.
    Records,
    /// Form fields bound into a record.
    Form,
    /// Per-field errors collected while binding `Form` parameters.
    BindingErrors,
    /// Uploaded file of a multipart form post.
    Upload,
}

/// One declared parameter of a handler method.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    name: String,
    ty: ParamType,
    binding: Binding,
    required: bool,
    default: Option<Value>,
}

impl ParameterDescriptor {
    fn new(name: impl Into<String>, ty: ParamType, binding: Binding) -> Self {
        Self {
            name: name.into(),
            ty,
            binding,
            required: true,
            default: None,
        }
    }

    /// Payload parameter.
    pub fn payload(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, Binding::Payload)
    }

    pub fn request_param(name: impl Into<String>, ty: ParamType) -> Self {
        Self::new(name, ty, Binding::RequestParam)
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::String, Binding::Header)
    }

    pub fn injected(kind: InjectedKind) -> Self {
        Self::new(kind.as_str(), ParamType::Any, Binding::Injected(kind))
    }

    pub fn store_read(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Object, Binding::StoreRead)
    }

    /// Record list of a STORE_MODIFY call; `element` types each record.
    pub fn records(name: impl Into<String>, element: ParamType) -> Self {
        Self::new(name, ParamType::list(element), Binding::Records)
    }

    pub fn form(name: impl Into<String>, schema: RecordSchema) -> Self {
        Self::new(name, ParamType::record(schema), Binding::Form)
    }

    pub fn binding_errors(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Object, Binding::BindingErrors)
    }

    pub fn upload(name: impl Into<String>) -> Self {
        Self::new(name, ParamType::Any, Binding::Upload)
    }

    /// A missing value resolves to `null` instead of failing.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Value used when the parameter is absent. Implies `optional`.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &ParamType {
        &self.ty
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// True for parameters the client supplies through the call payload.
    pub fn is_payload(&self) -> bool {
        self.binding == Binding::Payload
    }

    pub fn is_injected(&self) -> bool {
        matches!(self.binding, Binding::Injected(_))
    }
}
