use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_call_type() -> String {
    "rpc".to_string()
}

/// One call as sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub action: String,
    pub method: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(rename = "type", default = "default_call_type")]
    pub kind: String,
    #[serde(default)]
    pub tid: i64,
}

impl CallEnvelope {
    pub fn new(action: impl Into<String>, method: impl Into<String>, tid: i64) -> Self {
        Self {
            action: action.into(),
            method: method.into(),
            data: None,
            kind: default_call_type(),
            tid,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Best-effort identity of a malformed envelope, so the exception reply
    /// can still be correlated by the client.
    pub(crate) fn salvage(raw: &Value) -> Self {
        let text = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let tid = raw
            .get("tid")
            .and_then(|t| t.as_i64().or_else(|| t.as_str().and_then(|s| s.parse().ok())))
            .unwrap_or_default();
        Self::new(text("action"), text("method"), tid)
    }
}

/// Reply to one `CallEnvelope`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub action: String,
    pub method: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub tid: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip)]
    pub stream_response: bool,
}

impl ResponseEnvelope {
    pub fn success(call: &CallEnvelope, result: Option<Value>) -> Self {
        Self {
            action: call.action.clone(),
            method: call.method.clone(),
            kind: call.kind.clone(),
            tid: call.tid,
            result,
            message: None,
            location: None,
            stream_response: false,
        }
    }

    pub fn exception(call: &CallEnvelope, message: String, location: Option<String>) -> Self {
        Self {
            action: call.action.clone(),
            method: call.method.clone(),
            kind: "exception".to_string(),
            tid: call.tid,
            result: None,
            message: Some(message),
            location,
            stream_response: false,
        }
    }

    pub fn is_exception(&self) -> bool {
        self.kind == "exception"
    }
}

/// Reply of a polling call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl PollResponse {
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        Self {
            kind: "event".to_string(),
            name: name.into(),
            data: Some(data),
            message: None,
            location: None,
        }
    }

    pub fn exception(name: impl Into<String>, message: String, location: Option<String>) -> Self {
        Self {
            kind: "exception".to_string(),
            name: name.into(),
            data: None,
            message: Some(message),
            location,
        }
    }

    pub fn is_exception(&self) -> bool {
        self.kind == "exception"
    }
}
