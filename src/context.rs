//! Per-request ambient state and the resolved arguments handed to handlers.
//!
//! A `CallContext` is built once per incoming request and shared by every
//! call of a batch. `Arguments` is built per call by the parameter resolver,
//! one `Argument` per declared parameter, in declaration order.

use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::HandlerError;
use crate::method::InjectedKind;
use crate::resolver::{BindingErrors, StoreReadRequest};
use crate::session::Session;
use crate::transport::{IncomingCall, RequestInfo, UploadedFile};

/// Handle through which handlers add headers to the reply.
#[derive(Debug, Clone, Default)]
pub struct ResponseHandle {
    headers: Arc<Mutex<Vec<(String, String)>>>,
}

impl ResponseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_header(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut headers = match self.headers.lock() {
            Ok(headers) => headers,
            Err(poisoned) => poisoned.into_inner(),
        };
        headers.push((name.into(), value.into()));
    }

    pub fn headers(&self) -> Vec<(String, String)> {
        self.headers
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }
}

/// Ambient state of one incoming request.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    request: Arc<RequestInfo>,
    response: ResponseHandle,
    session: Option<Session>,
    locale: Option<String>,
    principal: Option<String>,
    uploads: Arc<Vec<UploadedFile>>,
}

impl CallContext {
    pub fn new(request: RequestInfo) -> Self {
        Self {
            request: Arc::new(request),
            ..Self::default()
        }
    }

    pub fn from_incoming(call: &IncomingCall) -> Self {
        Self {
            request: Arc::new(call.request().clone()),
            response: ResponseHandle::new(),
            session: call.session_ref().cloned(),
            locale: call.locale_ref().map(str::to_string),
            principal: call.principal_ref().map(str::to_string),
            uploads: Arc::new(call.uploads().to_vec()),
        }
    }

    pub fn with_session(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Some(principal.into());
        self
    }

    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// First upload whose form field is `field`.
    pub fn upload(&self, field: &str) -> Option<&UploadedFile> {
        self.uploads.iter().find(|u| u.field_name == field)
    }

    pub fn inject(&self, kind: InjectedKind) -> Injected {
        match kind {
            InjectedKind::Request => Injected::Request(Arc::clone(&self.request)),
            InjectedKind::Response => Injected::Response(self.response.clone()),
            InjectedKind::Session => Injected::Session(self.session.clone()),
            InjectedKind::Locale => Injected::Locale(self.locale.clone()),
            InjectedKind::Principal => Injected::Principal(self.principal.clone()),
        }
    }
}

/// An ambient value supplied in place of a payload value.
#[derive(Debug, Clone)]
pub enum Injected {
    Request(Arc<RequestInfo>),
    Response(ResponseHandle),
    Session(Option<Session>),
    Locale(Option<String>),
    Principal(Option<String>),
}

/// One resolved handler argument.
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Value),
    StoreRead(StoreReadRequest),
    Records(Vec<Value>),
    BindingErrors(BindingErrors),
    Upload(Option<UploadedFile>),
    Injected(Injected),
}

/// Resolved arguments of one call, in parameter declaration order.
#[derive(Debug, Clone)]
pub struct Arguments {
    action: String,
    method: String,
    values: Vec<Argument>,
}

impl Arguments {
    pub fn new(action: impl Into<String>, method: impl Into<String>, values: Vec<Argument>) -> Self {
        Self {
            action: action.into(),
            method: method.into(),
            values,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.values.iter()
    }

    /// Raw JSON value of the argument at `index`.
    pub fn value(&self, index: usize) -> Option<&Value> {
        match self.values.get(index) {
            Some(Argument::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Deserialize the argument at `index` into a typed value.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, HandlerError> {
        let value = match self.values.get(index) {
            Some(Argument::Value(v)) => v.clone(),
            Some(Argument::Records(records)) => Value::Array(records.clone()),
            Some(_) => {
                return Err(HandlerError::DecodeFailed(format!(
                    "argument {} is not a payload value",
                    index
                )))
            }
            None => {
                return Err(HandlerError::DecodeFailed(format!(
                    "no argument at index {}",
                    index
                )))
            }
        };
        serde_json::from_value(value).map_err(|e| HandlerError::DecodeFailed(e.to_string()))
    }

    pub fn store_read(&self) -> Option<&StoreReadRequest> {
        self.values.iter().find_map(|a| match a {
            Argument::StoreRead(r) => Some(r),
            _ => None,
        })
    }

    pub fn raw_records(&self) -> Option<&[Value]> {
        self.values.iter().find_map(|a| match a {
            Argument::Records(r) => Some(r.as_slice()),
            _ => None,
        })
    }

    /// Deserialize the record list of a STORE_MODIFY call.
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>, HandlerError> {
        let records = self
            .raw_records()
            .ok_or_else(|| HandlerError::DecodeFailed("call carries no records".into()))?;
        records
            .iter()
            .map(|r| serde_json::from_value(r.clone()).map_err(HandlerError::from))
            .collect()
    }

    pub fn binding_errors(&self) -> Option<&BindingErrors> {
        self.values.iter().find_map(|a| match a {
            Argument::BindingErrors(e) => Some(e),
            _ => None,
        })
    }

    /// Uploaded files bound to upload parameters.
    pub fn uploads(&self) -> impl Iterator<Item = &UploadedFile> {
        self.values.iter().filter_map(|a| match a {
            Argument::Upload(Some(f)) => Some(f),
            _ => None,
        })
    }

    fn injected(&self) -> impl Iterator<Item = &Injected> {
        self.values.iter().filter_map(|a| match a {
            Argument::Injected(i) => Some(i),
            _ => None,
        })
    }

    pub fn request(&self) -> Option<&RequestInfo> {
        self.injected().find_map(|i| match i {
            Injected::Request(r) => Some(r.as_ref()),
            _ => None,
        })
    }

    pub fn response(&self) -> Option<&ResponseHandle> {
        self.injected().find_map(|i| match i {
            Injected::Response(r) => Some(r),
            _ => None,
        })
    }

    pub fn session(&self) -> Option<&Session> {
        self.injected().find_map(|i| match i {
            Injected::Session(s) => s.as_ref(),
            _ => None,
        })
    }

    /// Session, or `Unauthorized` if the method was called without one.
    pub fn require_session(&self) -> Result<&Session, HandlerError> {
        self.session()
            .ok_or_else(|| HandlerError::Unauthorized("missing session".into()))
    }

    pub fn locale(&self) -> Option<&str> {
        self.injected().find_map(|i| match i {
            Injected::Locale(l) => l.as_deref(),
            _ => None,
        })
    }

    pub fn principal(&self) -> Option<&str> {
        self.injected().find_map(|i| match i {
            Injected::Principal(p) => p.as_deref(),
            _ => None,
        })
    }
}
