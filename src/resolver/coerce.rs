//! Conversion of JSON payload values to declared parameter types.
//!
//! Errors are plain strings naming the expected type; the resolver wraps
//! them into `ResolutionError::InvalidValue` with the parameter name.

use serde_json::{Map, Number, Value};
use time::format_description::{self, well_known::Rfc3339};
use time::{Date, OffsetDateTime, PrimitiveDateTime};

use crate::method::{ParamType, RecordSchema};

use super::form::BindingErrors;

/// Coerce `value` to `ty`. `null` passes through for every type.
pub fn coerce(value: &Value, ty: &ParamType) -> Result<Value, String> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match ty {
        ParamType::Any => Ok(value.clone()),
        ParamType::String => to_string(value),
        ParamType::Integer => to_integer(value),
        ParamType::Float => to_float(value),
        ParamType::Boolean => to_boolean(value),
        ParamType::Date => to_date(value),
        ParamType::Object => match value {
            Value::Object(_) => Ok(value.clone()),
            other => Err(mismatch("Object", other)),
        },
        ParamType::List(element) => match value {
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| coerce(item, element).map_err(|e| format!("element {}: {}", i, e)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            single => Ok(Value::Array(vec![coerce(single, element)?])),
        },
        ParamType::Record(schema) => match value {
            Value::Object(map) => coerce_record(map, schema),
            other => Err(mismatch(schema.name(), other)),
        },
    }
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {}, got {}", expected, value)
}

fn to_string(value: &Value) -> Result<Value, String> {
    match value {
        Value::String(_) => Ok(value.clone()),
        Value::Number(n) => Ok(Value::String(n.to_string())),
        Value::Bool(b) => Ok(Value::String(b.to_string())),
        other => Err(mismatch("String", other)),
    }
}

fn to_integer(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                Ok(Value::from(f as i64))
            }
            _ => Err(mismatch("Integer", value)),
        },
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| mismatch("Integer", value)),
        other => Err(mismatch("Integer", other)),
    }
}

fn to_float(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| mismatch("Float", value)),
        other => Err(mismatch("Float", other)),
    }
}

fn to_boolean(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "off" | "no" | "0" => Ok(Value::Bool(false)),
            _ => Err(mismatch("Boolean", value)),
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(Value::Bool(true)),
            Some(0) => Ok(Value::Bool(false)),
            _ => Err(mismatch("Boolean", value)),
        },
        other => Err(mismatch("Boolean", other)),
    }
}

/// Epoch milliseconds are kept as numbers; strings must parse as an
/// RFC 3339 date-time, a local date-time or a calendar date and are kept
/// verbatim.
fn to_date(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        Value::String(s) if is_date_string(s.trim()) => Ok(value.clone()),
        other => Err(mismatch("Date", other)),
    }
}

fn is_date_string(s: &str) -> bool {
    if OffsetDateTime::parse(s, &Rfc3339).is_ok() {
        return true;
    }
    let local = format_description::parse("[year]-[month]-[day]T[hour]:[minute]:[second]")
        .map(|format| PrimitiveDateTime::parse(s, &format).is_ok())
        .unwrap_or(false);
    local
        || format_description::parse("[year]-[month]-[day]")
            .map(|format| Date::parse(s, &format).is_ok())
            .unwrap_or(false)
}

fn coerce_record(map: &Map<String, Value>, schema: &RecordSchema) -> Result<Value, String> {
    let mut errors = BindingErrors::default();
    let bound = bind_record(map, schema, &mut errors);
    match errors.first() {
        None => Ok(bound),
        Some((field, message)) => Err(format!("{}.{}: {}", schema.name(), field, message)),
    }
}

/// Bind `fields` into a record, collecting one error per bad field.
///
/// Undeclared fields are copied through unchanged. Fields that fail to
/// coerce keep their raw value so the handler can echo them back.
pub fn bind_record(
    fields: &Map<String, Value>,
    schema: &RecordSchema,
    errors: &mut BindingErrors,
) -> Value {
    let mut bound = fields.clone();
    for spec in schema.fields() {
        match fields.get(&spec.name) {
            Some(raw) if !raw.is_null() => match coerce(raw, &spec.ty) {
                Ok(value) => {
                    bound.insert(spec.name.clone(), value);
                }
                Err(detail) => errors.add(&spec.name, detail),
            },
            _ if spec.required => errors.add(&spec.name, "must not be empty"),
            _ => {}
        }
    }
    Value::Object(bound)
}
