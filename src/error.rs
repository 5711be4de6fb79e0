//! Error types for routing, parameter resolution and handler invocation.
//!
//! Every failure that concerns a single call (`RouterError` minus `Codec`)
//! is contained by the router and rendered into an exception envelope. Only a
//! body the codec cannot read aborts a whole request.

use std::error::Error;
use std::fmt;

use crate::lock::LockError;

/// Error type returned by handler closures.
#[derive(Debug)]
pub enum HandlerError {
    /// An argument could not be deserialized into the handler's type.
    DecodeFailed(String),
    /// Business logic rejected the call (validation, invariant violation).
    Rejected(String),
    /// A requested resource does not exist.
    NotFound(String),
    /// Missing or invalid authentication / authorization.
    Unauthorized(String),
    /// Application-defined error with its own kind for message mapping.
    Custom {
        kind: String,
        message: Option<String>,
    },
    /// Other error.
    Other(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    /// Create an application-defined error of the given kind.
    pub fn custom(kind: impl Into<String>, message: impl Into<String>) -> Self {
        HandlerError::Custom {
            kind: kind.into(),
            message: Some(message.into()),
        }
    }

    /// Stable kind name, used as the key of the exception-to-message table.
    pub fn kind(&self) -> &str {
        match self {
            HandlerError::DecodeFailed(_) => "DecodeFailed",
            HandlerError::Rejected(_) => "Rejected",
            HandlerError::NotFound(_) => "NotFound",
            HandlerError::Unauthorized(_) => "Unauthorized",
            HandlerError::Custom { kind, .. } => kind,
            HandlerError::Other(_) => "Other",
        }
    }

    /// The error's own message, without the kind prefix used by `Display`.
    pub fn message(&self) -> Option<String> {
        match self {
            HandlerError::DecodeFailed(msg)
            | HandlerError::Rejected(msg)
            | HandlerError::NotFound(msg)
            | HandlerError::Unauthorized(msg) => Some(msg.clone()),
            HandlerError::Custom { message, .. } => message.clone(),
            HandlerError::Other(e) => Some(e.to_string()),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerError::DecodeFailed(msg) => write!(f, "decode failed: {}", msg),
            HandlerError::Rejected(msg) => write!(f, "rejected: {}", msg),
            HandlerError::NotFound(what) => write!(f, "not found: {}", what),
            HandlerError::Unauthorized(msg) => write!(f, "unauthorized: {}", msg),
            HandlerError::Custom { kind, message } => match message {
                Some(msg) => write!(f, "{}: {}", kind, msg),
                None => write!(f, "{}", kind),
            },
            HandlerError::Other(e) => write!(f, "handler error: {}", e),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            HandlerError::Other(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}

/// Failure to turn a call payload into handler arguments.
///
/// `message()` is safe to show to clients: it names the parameter but never
/// the declared type. `detail()` carries the full reason for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// Positional payload length differs from the declared parameter count.
    ArityMismatch { expected: usize, actual: usize },
    /// A required parameter has no value and no default.
    MissingParameter { name: String },
    /// A required request header is absent.
    MissingHeader { name: String },
    /// A value could not be coerced to the parameter's type.
    InvalidValue { name: String, detail: String },
    /// The payload has the wrong overall shape for the method's kind.
    UnexpectedPayload { detail: String },
    /// The method exists but cannot be reached through this entry point.
    UnsupportedCall { detail: String },
}

impl ResolutionError {
    /// Name of the offending parameter, when there is one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            ResolutionError::MissingParameter { name }
            | ResolutionError::MissingHeader { name }
            | ResolutionError::InvalidValue { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Client-facing message.
    pub fn message(&self) -> String {
        match self {
            ResolutionError::ArityMismatch { expected, actual } => format!(
                "Parameter mismatch: expected {} parameter(s) but received {}",
                expected, actual
            ),
            ResolutionError::MissingParameter { name } => {
                format!("Missing parameter '{}'", name)
            }
            ResolutionError::MissingHeader { name } => format!("Missing header '{}'", name),
            ResolutionError::InvalidValue { name, .. } => {
                format!("Invalid value for parameter '{}'", name)
            }
            ResolutionError::UnexpectedPayload { .. } => "Unexpected request data".to_string(),
            ResolutionError::UnsupportedCall { .. } => "Unsupported call".to_string(),
        }
    }

    /// Diagnostic detail, may mention declared types.
    pub fn detail(&self) -> String {
        match self {
            ResolutionError::InvalidValue { name, detail } => {
                format!("parameter '{}': {}", name, detail)
            }
            ResolutionError::UnexpectedPayload { detail }
            | ResolutionError::UnsupportedCall { detail } => detail.clone(),
            other => other.message(),
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail())
    }
}

impl Error for ResolutionError {}

/// Failure to read a request body or render a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    Decode(String),
    Encode(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Decode(msg) => write!(f, "decode error: {}", msg),
            CodecError::Encode(msg) => write!(f, "encode error: {}", msg),
        }
    }
}

impl Error for CodecError {}

/// Error type for routing a single call.
#[derive(Debug)]
pub enum RouterError {
    /// No handler is registered under the action name.
    ActionNotFound(String),
    /// The action exists but has no method of that name.
    MethodNotFound { action: String, method: String },
    /// The method exists but carries no call-kind marker, or failed its
    /// kind's validity rule at classification time.
    MethodNotExposed { action: String, method: String },
    /// Parameter resolution failed.
    Resolution(ResolutionError),
    /// The handler itself failed.
    Invocation(HandlerError),
    /// The per-session lock could not be taken.
    Lock(LockError),
    /// The request body could not be decoded or the reply encoded.
    Codec(CodecError),
}

impl RouterError {
    /// Stable kind name, used as the key of the exception-to-message table.
    pub fn kind(&self) -> &str {
        match self {
            RouterError::ActionNotFound(_) => "ActionNotFound",
            RouterError::MethodNotFound { .. } => "MethodNotFound",
            RouterError::MethodNotExposed { .. } => "MethodNotExposed",
            RouterError::Resolution(_) => "ResolutionError",
            RouterError::Invocation(e) => e.kind(),
            RouterError::Lock(_) => "LockError",
            RouterError::Codec(_) => "CodecError",
        }
    }

    /// True for failures that happen before a handler was selected.
    pub fn is_routing(&self) -> bool {
        matches!(
            self,
            RouterError::ActionNotFound(_)
                | RouterError::MethodNotFound { .. }
                | RouterError::MethodNotExposed { .. }
        )
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::ActionNotFound(action) => write!(f, "action '{}' not found", action),
            RouterError::MethodNotFound { action, method } => {
                write!(f, "method '{}.{}' not found", action, method)
            }
            RouterError::MethodNotExposed { action, method } => {
                write!(f, "method '{}.{}' is not exposed", action, method)
            }
            RouterError::Resolution(e) => write!(f, "resolution error: {}", e),
            RouterError::Invocation(e) => write!(f, "invocation error: {}", e),
            RouterError::Lock(e) => write!(f, "session lock error: {}", e),
            RouterError::Codec(e) => write!(f, "{}", e),
        }
    }
}

impl Error for RouterError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RouterError::Resolution(e) => Some(e),
            RouterError::Invocation(e) => Some(e),
            RouterError::Lock(e) => Some(e),
            RouterError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ResolutionError> for RouterError {
    fn from(err: ResolutionError) -> Self {
        RouterError::Resolution(err)
    }
}

impl From<HandlerError> for RouterError {
    fn from(err: HandlerError) -> Self {
        RouterError::Invocation(err)
    }
}

impl From<LockError> for RouterError {
    fn from(err: LockError) -> Self {
        RouterError::Lock(err)
    }
}

impl From<CodecError> for RouterError {
    fn from(err: CodecError) -> Self {
        RouterError::Codec(err)
    }
}

/// Startup-time registration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two handlers were registered under the same action name.
    DuplicateAction(String),
    /// Two methods of one action share a name.
    DuplicateMethod { action: String, method: String },
    /// An action or method was registered with an empty name.
    EmptyName,
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::DuplicateAction(action) => {
                write!(f, "action '{}' registered more than once", action)
            }
            CatalogError::DuplicateMethod { action, method } => {
                write!(f, "method '{}.{}' registered more than once", action, method)
            }
            CatalogError::EmptyName => write!(f, "action and method names must not be empty"),
        }
    }
}

impl Error for CatalogError {}

/// Error loading a `RouterConfig`.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config io error: {}", e),
            ConfigError::Parse(msg) => write!(f, "config parse error: {}", msg),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}
