//! Result helper types and the per-kind shaping of handler results.

use serde_json::{json, Map, Value};

use crate::method::CallKind;
use crate::resolver::BindingErrors;

/// Store reply `{metaData?, total?, records, success}`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResult {
    pub records: Vec<Value>,
    pub total: Option<i64>,
    pub success: bool,
    pub meta_data: Option<Value>,
}

impl StoreResult {
    pub fn new(records: Vec<Value>) -> Self {
        Self {
            records,
            total: None,
            success: true,
            meta_data: None,
        }
    }

    pub fn with_total(mut self, total: i64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn with_meta_data(mut self, meta_data: Value) -> Self {
        self.meta_data = Some(meta_data);
        self
    }

    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

impl From<StoreResult> for Value {
    fn from(result: StoreResult) -> Self {
        let mut map = Map::new();
        if let Some(meta) = result.meta_data {
            map.insert("metaData".into(), meta);
        }
        if let Some(total) = result.total {
            map.insert("total".into(), json!(total));
        }
        map.insert("records".into(), Value::Array(result.records));
        map.insert("success".into(), Value::Bool(result.success));
        Value::Object(map)
    }
}

/// Form submit reply `{success, errors?, ...}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPostResult {
    pub success: bool,
    pub errors: BindingErrors,
    pub extra: Map<String, Value>,
}

impl FormPostResult {
    pub fn new(success: bool) -> Self {
        Self {
            success,
            ..Self::default()
        }
    }

    /// Successful unless `errors` holds anything.
    pub fn from_errors(errors: BindingErrors) -> Self {
        Self {
            success: errors.is_empty(),
            errors,
            extra: Map::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
        self.success = false;
    }

    pub fn add_result_property(&mut self, key: impl Into<String>, value: Value) {
        self.extra.insert(key.into(), value);
    }
}

impl From<FormPostResult> for Value {
    fn from(result: FormPostResult) -> Self {
        let mut map = result.extra;
        map.insert("success".into(), Value::Bool(result.success));
        if !result.errors.is_empty() {
            let errors: Map<String, Value> = result
                .errors
                .iter()
                .map(|(field, messages)| (field.to_string(), json!(messages)))
                .collect();
            map.insert("errors".into(), Value::Object(errors));
        }
        Value::Object(map)
    }
}

/// Form load reply `{success, data}`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormLoadResult {
    pub success: bool,
    pub data: Value,
}

impl FormLoadResult {
    pub fn new(data: Value) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

impl From<FormLoadResult> for Value {
    fn from(result: FormLoadResult) -> Self {
        json!({ "success": result.success, "data": result.data })
    }
}

fn is_store_envelope(value: &Value) -> bool {
    value.get("records").map_or(false, Value::is_array)
}

fn is_form_load_envelope(value: &Value) -> bool {
    value.get("success").map_or(false, Value::is_boolean) && value.get("data").is_some()
}

/// Shape a handler result for its call kind. `None` omits `result`.
pub(crate) fn shape_result(kind: CallKind, result: Value, always_wrap_store: bool) -> Option<Value> {
    match kind {
        CallKind::StoreRead | CallKind::StoreModify => {
            let result = if result.is_null() {
                Value::Array(Vec::new())
            } else {
                result
            };
            if !always_wrap_store || is_store_envelope(&result) {
                return Some(result);
            }
            let records = match result {
                Value::Array(items) => items,
                single => vec![single],
            };
            Some(StoreResult::new(records).into())
        }
        CallKind::FormLoad if is_form_load_envelope(&result) => Some(result),
        CallKind::FormLoad => Some(FormLoadResult::new(result).into()),
        CallKind::TreeLoad => match result {
            Value::Null => None,
            Value::Array(_) => Some(result),
            single => Some(Value::Array(vec![single])),
        },
        _ if result.is_null() => None,
        _ => Some(result),
    }
}
