//! Parameter resolution: turning a call payload plus ambient request state
//! into the ordered `Arguments` a handler receives.
//!
//! Each call kind shapes the payload differently:
//!
//! - `SIMPLE`: `data` is a positional list whose length must equal the
//!   number of payload parameters.
//! - `SIMPLE_NAMED`: `data` is a map keyed by parameter name.
//! - `STORE_READ`, `FORM_LOAD`, `TREE_LOAD`, `FORM_POST_JSON`: `data[0]` may
//!   be a map of named values (for STORE_READ, the read request), later
//!   elements are positional.
//! - `STORE_MODIFY`: `data[0]` is a record list, a map with a `records`
//!   entry, or a single record.
//! - `POLL`, `FORM_POST`: named values come from request parameters.

mod coerce;
mod form;
mod store_read;

use serde_json::{Map, Value};

use crate::context::{Argument, Arguments, CallContext};
use crate::error::ResolutionError;
use crate::method::{Binding, CallKind, MethodDescriptor, ParamType, ParameterDescriptor};

pub use coerce::{bind_record, coerce};
pub use form::BindingErrors;
pub use store_read::{
    Comparison, Filter, GroupInfo, SortDirection, SortInfo, StoreReadRequest,
};

/// Fields a form submit uses to address the call; never bound to parameters.
pub const FORM_CONTROL_FIELDS: [&str; 5] = ["extAction", "extMethod", "extTID", "extType", "extUpload"];

/// Payload split into its named and positional parts.
#[derive(Default)]
struct Payload {
    named: Option<Map<String, Value>>,
    positional: Vec<Value>,
    next: usize,
    store_read: Option<StoreReadRequest>,
    records: Option<Vec<Value>>,
}

impl Payload {
    fn named_value(&self, name: &str) -> Option<&Value> {
        self.named.as_ref().and_then(|m| m.get(name))
    }

    fn take_positional(&mut self) -> Option<Value> {
        let value = self.positional.get(self.next).cloned()?;
        self.next += 1;
        Some(value)
    }
}

/// Resolves handler arguments for every entry point.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParameterResolver;

impl ParameterResolver {
    pub fn new() -> Self {
        Self
    }

    /// Arguments for a call arriving through the JSON router.
    pub fn resolve(
        &self,
        descriptor: &MethodDescriptor,
        data: Option<&Value>,
        ctx: &CallContext,
    ) -> Result<Arguments, ResolutionError> {
        let payload = match descriptor.kind() {
            CallKind::Simple => simple_payload(descriptor, data)?,
            CallKind::SimpleNamed => named_payload(data)?,
            CallKind::StoreRead
            | CallKind::FormLoad
            | CallKind::TreeLoad
            | CallKind::FormPostJson => leading_map_payload(descriptor.kind(), data)?,
            CallKind::StoreModify => store_modify_payload(descriptor, data)?,
            CallKind::Poll | CallKind::FormPost => {
                return Err(ResolutionError::UnsupportedCall {
                    detail: format!(
                        "{} method '{}' cannot be called through the router",
                        descriptor.kind(),
                        descriptor.qualified_name()
                    ),
                })
            }
        };
        self.bind(descriptor, payload, ctx)
    }

    /// Arguments for a POLL or FORM_POST call, whose named values are the
    /// request's query or form parameters.
    pub fn resolve_from_params(
        &self,
        descriptor: &MethodDescriptor,
        ctx: &CallContext,
    ) -> Result<Arguments, ResolutionError> {
        let named: Map<String, Value> = ctx
            .request()
            .params()
            .iter()
            .filter(|(k, _)| !FORM_CONTROL_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let payload = Payload {
            named: Some(named),
            ..Payload::default()
        };
        self.bind(descriptor, payload, ctx)
    }

    fn bind(
        &self,
        descriptor: &MethodDescriptor,
        mut payload: Payload,
        ctx: &CallContext,
    ) -> Result<Arguments, ResolutionError> {
        let mut values = Vec::with_capacity(descriptor.parameters().len());
        let mut binding_errors = BindingErrors::new();
        let mut error_slots = Vec::new();

        for param in descriptor.parameters() {
            let argument = match param.binding() {
                Binding::Injected(kind) => Argument::Injected(ctx.inject(*kind)),
                Binding::StoreRead => {
                    Argument::StoreRead(payload.store_read.clone().unwrap_or_default())
                }
                Binding::Records => match payload.records.take() {
                    Some(records) => Argument::Records(records),
                    None if !param.is_required() => Argument::Records(Vec::new()),
                    None => return Err(missing(param)),
                },
                Binding::RequestParam => {
                    Argument::Value(fallback(param, payload.named_value(param.name()).cloned())?)
                }
                Binding::Header => {
                    let raw = ctx
                        .request()
                        .header(param.name())
                        .map(|h| Value::String(h.to_string()));
                    match (raw, param.default()) {
                        (Some(v), _) => Argument::Value(convert(param, &v)?),
                        (None, Some(default)) => Argument::Value(default.clone()),
                        (None, None) if param.is_required() => {
                            return Err(ResolutionError::MissingHeader {
                                name: param.name().to_string(),
                            })
                        }
                        (None, None) => Argument::Value(Value::Null),
                    }
                }
                Binding::Form => {
                    let fields = payload.named.clone().unwrap_or_default();
                    let bound = match param.ty() {
                        ParamType::Record(schema) => {
                            bind_record(&fields, schema, &mut binding_errors)
                        }
                        _ => Value::Object(fields),
                    };
                    Argument::Value(bound)
                }
                Binding::BindingErrors => {
                    error_slots.push(values.len());
                    Argument::BindingErrors(BindingErrors::new())
                }
                Binding::Upload => match ctx.upload(param.name()) {
                    Some(file) => Argument::Upload(Some(file.clone())),
                    None if param.is_required() => return Err(missing(param)),
                    None => Argument::Upload(None),
                },
                Binding::Payload => {
                    let raw = match payload.named_value(param.name()).cloned() {
                        Some(v) => Some(v),
                        None => payload.take_positional(),
                    };
                    Argument::Value(fallback(param, raw)?)
                }
            };
            values.push(argument);
        }

        if error_slots.is_empty() {
            if let Some((field, message)) = binding_errors.first() {
                return Err(ResolutionError::InvalidValue {
                    name: field.to_string(),
                    detail: message.to_string(),
                });
            }
        }
        for slot in error_slots {
            values[slot] = Argument::BindingErrors(binding_errors.clone());
        }

        Ok(Arguments::new(
            descriptor.action(),
            descriptor.method(),
            values,
        ))
    }
}

fn missing(param: &ParameterDescriptor) -> ResolutionError {
    ResolutionError::MissingParameter {
        name: param.name().to_string(),
    }
}

fn convert(param: &ParameterDescriptor, value: &Value) -> Result<Value, ResolutionError> {
    coerce(value, param.ty()).map_err(|detail| ResolutionError::InvalidValue {
        name: param.name().to_string(),
        detail,
    })
}

/// Value, then default, then `null` or a missing-parameter error.
fn fallback(param: &ParameterDescriptor, raw: Option<Value>) -> Result<Value, ResolutionError> {
    match (raw, param.default()) {
        (Some(v), _) => convert(param, &v),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) if param.is_required() => Err(missing(param)),
        (None, None) => Ok(Value::Null),
    }
}

fn as_list(data: Option<&Value>) -> Vec<Value> {
    match data {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(single) => vec![single.clone()],
    }
}

fn simple_payload(
    descriptor: &MethodDescriptor,
    data: Option<&Value>,
) -> Result<Payload, ResolutionError> {
    let positional = as_list(data);
    let expected = descriptor.payload_arity();
    if positional.len() != expected {
        return Err(ResolutionError::ArityMismatch {
            expected,
            actual: positional.len(),
        });
    }
    Ok(Payload {
        positional,
        ..Payload::default()
    })
}

fn named_payload(data: Option<&Value>) -> Result<Payload, ResolutionError> {
    let named = match data {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map.clone(),
        // Some clients wrap the named map in a one-element list.
        Some(Value::Array(items)) if items.len() == 1 && items[0].is_object() => {
            items[0].as_object().cloned().unwrap_or_default()
        }
        Some(other) => {
            return Err(ResolutionError::UnexpectedPayload {
                detail: format!("SIMPLE_NAMED call expects a map, got {}", other),
            })
        }
    };
    Ok(Payload {
        named: Some(named),
        ..Payload::default()
    })
}

fn leading_map_payload(kind: CallKind, data: Option<&Value>) -> Result<Payload, ResolutionError> {
    let list = as_list(data);
    let mut payload = Payload::default();
    match list.first() {
        Some(Value::Object(first)) => {
            if kind == CallKind::StoreRead {
                let request = StoreReadRequest::from_map(first)?;
                payload.named = Some(request.params.clone());
                payload.store_read = Some(request);
            } else {
                payload.named = Some(first.clone());
            }
            payload.positional = list[1..].to_vec();
        }
        _ => payload.positional = list,
    }
    Ok(payload)
}

fn store_modify_payload(
    descriptor: &MethodDescriptor,
    data: Option<&Value>,
) -> Result<Payload, ResolutionError> {
    let list = as_list(data);
    let mut payload = Payload::default();
    let Some(first) = list.first() else {
        return Ok(payload);
    };

    let records = match first {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("records") {
            Some(Value::Array(items)) => {
                payload.named = Some(without_records(map));
                items.clone()
            }
            Some(Value::Null) | None => vec![first.clone()],
            Some(single) => {
                payload.named = Some(without_records(map));
                vec![single.clone()]
            }
        },
        other => {
            return Err(ResolutionError::UnexpectedPayload {
                detail: format!("STORE_MODIFY call expects records, got {}", other),
            })
        }
    };
    if records.is_empty() {
        return Err(ResolutionError::UnexpectedPayload {
            detail: "STORE_MODIFY call carries an empty record list".to_string(),
        });
    }

    let element = descriptor
        .collection_element_type()
        .cloned()
        .unwrap_or(ParamType::Any);
    let name = descriptor
        .parameters()
        .iter()
        .find(|p| *p.binding() == Binding::Records)
        .map(|p| p.name().to_string())
        .unwrap_or_else(|| "records".to_string());
    let records = records
        .iter()
        .enumerate()
        .map(|(i, record)| {
            coerce(record, &element).map_err(|detail| ResolutionError::InvalidValue {
                name: name.clone(),
                detail: format!("record {}: {}", i, detail),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    payload.records = Some(records);
    payload.positional = list[1..].to_vec();
    Ok(payload)
}

fn without_records(map: &Map<String, Value>) -> Map<String, Value> {
    let mut rest = map.clone();
    rest.remove("records");
    rest
}
