//! Router configuration.
//!
//! Every option has a default, so an empty TOML document is a valid
//! configuration. Keys use the camelCase names client-side tooling knows:
//!
//! ```toml
//! defaultExceptionMessage = "Server Error"
//! sendExceptionMessage = false
//! sendStacktrace = false
//! batchedMethodsExecutionPolicy = "CONCURRENT"
//! enableBuffer = 20
//!
//! [exceptionToMessage]
//! NotFound = "No such record"
//! Rejected = ""
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigError;

/// How the calls of one batch are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionPolicy {
    #[default]
    Sequential,
    Concurrent,
}

/// Client-side batching: on/off or a buffer window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EnableBuffer {
    Enabled(bool),
    Millis(u64),
}

impl<'de> Deserialize<'de> for EnableBuffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bool(bool),
            Number(u64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Bool(b) => Ok(EnableBuffer::Enabled(b)),
            Raw::Number(n) => Ok(EnableBuffer::Millis(n)),
            Raw::Text(text) => EnableBuffer::parse(&text).ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "enableBuffer must be true, false or a number, got '{}'",
                    text
                ))
            }),
        }
    }
}

impl EnableBuffer {
    /// Parse `"true"`, `"false"` or a millisecond count.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.eq_ignore_ascii_case("true") {
            Some(EnableBuffer::Enabled(true))
        } else if text.eq_ignore_ascii_case("false") {
            Some(EnableBuffer::Enabled(false))
        } else {
            text.parse().ok().map(EnableBuffer::Millis)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterConfig {
    /// Message sent when nothing more specific applies.
    pub default_exception_message: String,
    /// Send a failing handler's own message when the table has no entry.
    pub send_exception_message: bool,
    /// Fill the `where` field of exception envelopes with diagnostics.
    pub send_stacktrace: bool,
    /// Error kind to client message. An empty text means "use the error's
    /// own message".
    pub exception_to_message: BTreeMap<String, String>,
    /// Wrap every store result into `{records, success}`.
    pub always_wrap_store_response: bool,
    /// Serialize all calls that share a session.
    pub synchronize_on_session: bool,
    /// Write router replies without a content length.
    pub stream_response: bool,
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
    pub enable_buffer: Option<EnableBuffer>,
    pub buffer_limit: Option<u32>,
    pub batched_methods_execution_policy: ExecutionPolicy,
    /// Worker count for the concurrent policy.
    pub batch_threads: usize,
    /// Maximum number of rendered API descriptors kept.
    pub api_cache_capacity: usize,
    pub js_content_type: String,
    pub provider_type: String,
    /// Request header read as the principal name.
    pub principal_header: Option<String>,
    /// Request header carrying the session id.
    pub session_header: String,
    /// Cookie carrying the session id when the header is absent.
    pub session_cookie: String,
    /// Maximum number of sessions kept; the oldest is dropped beyond it.
    pub session_capacity: usize,
    /// Largest JSON request body the HTTP transport reads.
    pub max_body_bytes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            default_exception_message: "Server Error".to_string(),
            send_exception_message: false,
            send_stacktrace: false,
            exception_to_message: BTreeMap::new(),
            always_wrap_store_response: false,
            synchronize_on_session: false,
            stream_response: false,
            timeout: None,
            max_retries: None,
            enable_buffer: None,
            buffer_limit: None,
            batched_methods_execution_policy: ExecutionPolicy::Sequential,
            batch_threads: 5,
            api_cache_capacity: 64,
            js_content_type: "application/javascript".to_string(),
            provider_type: "remoting".to_string(),
            principal_header: None,
            session_header: "x-session-id".to_string(),
            session_cookie: "DIRECTSESSIONID".to_string(),
            session_capacity: 10_000,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl RouterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn with_default_exception_message(mut self, message: impl Into<String>) -> Self {
        self.default_exception_message = message.into();
        self
    }

    pub fn with_send_exception_message(mut self, send: bool) -> Self {
        self.send_exception_message = send;
        self
    }

    pub fn with_send_stacktrace(mut self, send: bool) -> Self {
        self.send_stacktrace = send;
        self
    }

    pub fn with_exception_message(mut self, kind: impl Into<String>, message: impl Into<String>) -> Self {
        self.exception_to_message.insert(kind.into(), message.into());
        self
    }

    pub fn with_always_wrap_store_response(mut self, wrap: bool) -> Self {
        self.always_wrap_store_response = wrap;
        self
    }

    pub fn with_synchronize_on_session(mut self, synchronize: bool) -> Self {
        self.synchronize_on_session = synchronize;
        self
    }

    pub fn with_stream_response(mut self, stream: bool) -> Self {
        self.stream_response = stream;
        self
    }

    pub fn with_timeout(mut self, millis: u64) -> Self {
        self.timeout = Some(millis);
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn with_enable_buffer(mut self, buffer: EnableBuffer) -> Self {
        self.enable_buffer = Some(buffer);
        self
    }

    pub fn with_buffer_limit(mut self, limit: u32) -> Self {
        self.buffer_limit = Some(limit);
        self
    }

    pub fn with_execution_policy(mut self, policy: ExecutionPolicy) -> Self {
        self.batched_methods_execution_policy = policy;
        self
    }

    pub fn with_batch_threads(mut self, threads: usize) -> Self {
        self.batch_threads = threads;
        self
    }

    pub fn with_api_cache_capacity(mut self, capacity: usize) -> Self {
        self.api_cache_capacity = capacity;
        self
    }

    pub fn with_session_capacity(mut self, capacity: usize) -> Self {
        self.session_capacity = capacity;
        self
    }

    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }

    pub fn with_principal_header(mut self, header: impl Into<String>) -> Self {
        self.principal_header = Some(header.into());
        self
    }

    /// Client message for an error of `kind` whose own message is `own`.
    ///
    /// The table wins; an empty table entry selects the own message. Without
    /// an entry the own message is used only if `expose` is set.
    pub fn message_for(&self, kind: &str, own: Option<String>, expose: bool) -> String {
        let own = own.filter(|m| !m.is_empty());
        match self.exception_to_message.get(kind) {
            Some(text) if !text.is_empty() => text.clone(),
            Some(_) => own.unwrap_or_else(|| self.default_exception_message.clone()),
            None if expose => own.unwrap_or_else(|| self.default_exception_message.clone()),
            None => self.default_exception_message.clone(),
        }
    }
}
