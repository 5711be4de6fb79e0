//! Transport-neutral request and response types.
//!
//! The router never sees an HTTP library type. The `http` feature maps axum
//! requests onto `IncomingCall` and `OutgoingResponse` back onto axum
//! responses; tests and other transports build them directly.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::CodecError;
use crate::session::Session;

pub const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";
pub const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

/// Request line, headers and parameters of the incoming request.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInfo {
    method: String,
    path: String,
    headers: BTreeMap<String, String>,
    params: BTreeMap<String, String>,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn insert_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }

    pub fn insert_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    pub fn http_method(&self) -> &str {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Header value, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Query or form parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

/// File part of a multipart form post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub field_name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(field_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: None,
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One request as seen by the router.
#[derive(Debug, Clone, Default)]
pub struct IncomingCall {
    request: RequestInfo,
    body: Vec<u8>,
    uploads: Vec<UploadedFile>,
    session: Option<Session>,
    locale: Option<String>,
    principal: Option<String>,
    multipart: bool,
}

impl IncomingCall {
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            request: RequestInfo::new(method, path),
            ..Self::default()
        }
    }

    pub fn post(path: &str) -> Self {
        Self::new("POST", path)
    }

    pub fn get(path: &str) -> Self {
        Self::new("GET", path)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the request body.
    pub fn json(self, value: &Value) -> Self {
        let body = value.to_string().into_bytes();
        self.header("content-type", "application/json").body(body)
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.request.insert_header(name, value);
        self
    }

    /// Add a query or form parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.insert_param(name, value);
        self
    }

    /// Attach an uploaded file. Marks the call as multipart.
    pub fn upload(mut self, file: UploadedFile) -> Self {
        self.uploads.push(file);
        self.multipart = true;
        self
    }

    pub fn multipart(mut self, multipart: bool) -> Self {
        self.multipart = multipart;
        self
    }

    pub fn session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn body_bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn uploads(&self) -> &[UploadedFile] {
        &self.uploads
    }

    pub fn session_ref(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn locale_ref(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn principal_ref(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub fn is_multipart(&self) -> bool {
        self.multipart
    }
}

/// Fully rendered reply.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
    /// Written without a content length.
    pub streamed: bool,
}

impl OutgoingResponse {
    pub fn new(status: u16, content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: content_type.into(),
            body: body.into(),
            headers: Vec::new(),
            streamed: false,
        }
    }

    pub fn ok(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self::new(200, content_type, body)
    }

    /// `Content-Length` to send, `None` when the body is streamed.
    pub fn content_length(&self) -> Option<usize> {
        if self.streamed {
            None
        } else {
            Some(self.body.len())
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }

    pub fn body_json(&self) -> Result<Value, CodecError> {
        serde_json::from_slice(&self.body).map_err(|e| CodecError::Decode(e.to_string()))
    }
}
