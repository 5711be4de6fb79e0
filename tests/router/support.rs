//! Test catalog: a handful of actions covering every call kind, registered
//! through the `register_actions!` module convention.

use serde_json::{json, Value};

use direct_router::{
    register_actions, InMemoryCatalog, IncomingCall, Remoting, RouterConfig,
};

pub mod calc {
    use std::thread;
    use std::time::Duration;

    use direct_router::method::InjectedKind;
    use direct_router::{HandlerError, MethodDefinition, ParamType, ParameterDescriptor};
    use serde_json::{json, Value};

    pub const ACTION: &str = "calc";

    pub fn methods() -> Vec<MethodDefinition> {
        vec![
            MethodDefinition::new("add", |args| {
                let a: i64 = args.arg(0)?;
                let b: i64 = args.arg(1)?;
                Ok(json!(a + b))
            })
            .simple()
            .param(ParameterDescriptor::payload("a", ParamType::Integer))
            .param(ParameterDescriptor::payload("b", ParamType::Integer)),
            MethodDefinition::new("divide", |args| {
                let a: f64 = args.arg(0)?;
                let b: f64 = args.arg(1)?;
                if b == 0.0 {
                    return Err(HandlerError::Rejected("division by zero".into()));
                }
                Ok(json!(a / b))
            })
            .simple()
            .param(ParameterDescriptor::payload("a", ParamType::Float))
            .param(ParameterDescriptor::payload("b", ParamType::Float)),
            MethodDefinition::new("greet", |args| {
                let name: String = args.arg(0)?;
                let greeting: String = args.arg(1)?;
                Ok(json!(format!("{}, {}!", greeting, name)))
            })
            .simple_named()
            .param(ParameterDescriptor::payload("name", ParamType::String))
            .param(ParameterDescriptor::payload("greeting", ParamType::String).default_value("Hello")),
            MethodDefinition::new("boom", |_| panic!("handler exploded")).simple(),
            MethodDefinition::new("nothing", |_| Ok(Value::Null)).simple(),
            MethodDefinition::new("whoami", |args| {
                Ok(json!({ "principal": args.principal(), "locale": args.locale() }))
            })
            .simple()
            .param(ParameterDescriptor::injected(InjectedKind::Principal))
            .param(ParameterDescriptor::injected(InjectedKind::Locale)),
            MethodDefinition::new("visit", |args| {
                let session = args.require_session()?;
                let visits = session.get("visits").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
                session.set("visits", json!(visits));
                Ok(json!(visits))
            })
            .simple()
            .param(ParameterDescriptor::injected(InjectedKind::Session)),
            MethodDefinition::new("stamp", |args| {
                if let Some(response) = args.response() {
                    response.add_header("x-stamped", "yes");
                }
                Ok(json!(true))
            })
            .simple()
            .param(ParameterDescriptor::injected(InjectedKind::Response)),
            MethodDefinition::new("nap", |args| {
                let millis: u64 = args.arg(0)?;
                thread::sleep(Duration::from_millis(millis));
                Ok(json!(millis))
            })
            .simple()
            .param(ParameterDescriptor::payload("millis", ParamType::Integer)),
        ]
    }
}

pub mod people {
    use direct_router::method::InjectedKind;
    use direct_router::resolver::{Comparison, Filter, SortDirection};
    use direct_router::{
        FormPostResult, HandlerError, MethodDefinition, ParamType, ParameterDescriptor,
        RecordSchema, ReturnShape, StoreResult,
    };
    use serde_json::{json, Value};

    pub const ACTION: &str = "people";

    pub fn schema() -> RecordSchema {
        RecordSchema::new("Person")
            .field("id", ParamType::Integer)
            .required("name", ParamType::String)
            .field("age", ParamType::Integer)
    }

    pub fn everyone() -> Vec<Value> {
        vec![
            json!({"id": 1, "name": "Ada", "age": 36}),
            json!({"id": 2, "name": "Grace", "age": 45}),
            json!({"id": 3, "name": "Linus", "age": 21}),
            json!({"id": 4, "name": "Barbara", "age": 52}),
            json!({"id": 5, "name": "Ken", "age": 30}),
        ]
    }

    fn age(person: &Value) -> i64 {
        person["age"].as_i64().unwrap_or_default()
    }

    pub fn methods() -> Vec<MethodDefinition> {
        vec![
            MethodDefinition::new("list", |args| {
                let request = args
                    .store_read()
                    .ok_or_else(|| HandlerError::DecodeFailed("no read request".into()))?;
                let mut rows = everyone();
                for filter in &request.filters {
                    if let Filter::Numeric {
                        field,
                        value,
                        comparison,
                    } = filter
                    {
                        let bound = value.as_f64().unwrap_or_default();
                        rows.retain(|p| {
                            let actual = p[field].as_f64().unwrap_or_default();
                            match comparison {
                                Some(Comparison::Gt) => actual > bound,
                                Some(Comparison::Lt) => actual < bound,
                                _ => actual == bound,
                            }
                        });
                    }
                }
                if let Some(sort) = request.sorters.first() {
                    if sort.property == "age" {
                        rows.sort_by_key(age);
                    }
                    if sort.direction == Some(SortDirection::Descending) {
                        rows.reverse();
                    }
                }
                let total = rows.len() as i64;
                let start = request.start.unwrap_or(0).max(0) as usize;
                let limit = request.limit.unwrap_or(total).max(0) as usize;
                let page: Vec<Value> = rows.into_iter().skip(start).take(limit).collect();
                Ok(StoreResult::new(page).with_total(total).into())
            })
            .store_read()
            .param(ParameterDescriptor::store_read("request")),
            MethodDefinition::new("names", |args| {
                let prefix: Option<String> = args.arg(1)?;
                let names: Vec<Value> = everyone()
                    .into_iter()
                    .map(|p| p["name"].clone())
                    .filter(|n| match &prefix {
                        Some(prefix) => n.as_str().map_or(false, |n| n.starts_with(prefix.as_str())),
                        None => true,
                    })
                    .collect();
                Ok(Value::Array(names))
            })
            .store_read()
            .param(ParameterDescriptor::store_read("request"))
            .param(ParameterDescriptor::payload("prefix", ParamType::String).optional()),
            MethodDefinition::new("empty", |_| Ok(Value::Null))
                .store_read()
                .param(ParameterDescriptor::store_read("request")),
            MethodDefinition::new("update", |args| {
                let records = args.raw_records().unwrap_or_default();
                let updated: Vec<Value> = records
                    .iter()
                    .map(|r| {
                        let mut r = r.clone();
                        r["updated"] = json!(true);
                        r
                    })
                    .collect();
                Ok(Value::Array(updated))
            })
            .store_modify()
            .param(ParameterDescriptor::records("people", ParamType::record(schema()))),
            MethodDefinition::new("load", |args| {
                let id: i64 = args.arg(0)?;
                everyone()
                    .into_iter()
                    .find(|p| p["id"] == json!(id))
                    .ok_or_else(|| HandlerError::NotFound(format!("person {}", id)))
            })
            .form_load()
            .param(ParameterDescriptor::payload("id", ParamType::Integer)),
            MethodDefinition::new("save", |args| {
                let errors = args.binding_errors().cloned().unwrap_or_default();
                if !errors.is_empty() {
                    return Ok(FormPostResult::from_errors(errors).into());
                }
                let person: Value = args.arg(0)?;
                let mut result = FormPostResult::new(true);
                result.add_result_property("name", person["name"].clone());
                if let Some(avatar) = args.uploads().next() {
                    result.add_result_property("avatarSize", json!(avatar.size()));
                }
                Ok(result.into())
            })
            .form_post()
            .param(ParameterDescriptor::form("person", schema()))
            .param(ParameterDescriptor::binding_errors("errors"))
            .param(ParameterDescriptor::upload("avatar").optional())
            .returns(ReturnShape::FormPostResult),
            MethodDefinition::new("touch", |_| Ok(Value::Null))
                .form_post()
                .param(ParameterDescriptor::form("person", schema()))
                .param(ParameterDescriptor::binding_errors("errors"))
                .returns(ReturnShape::Unit),
            MethodDefinition::new("saveJson", |args| {
                let person: Value = args.arg(0)?;
                Ok(json!({ "success": true, "name": person["name"] }))
            })
            .form_post_json()
            .param(ParameterDescriptor::form("person", schema()))
            .param(ParameterDescriptor::binding_errors("errors")),
            MethodDefinition::new("owner", |args| Ok(json!(args.principal())))
                .simple()
                .param(ParameterDescriptor::injected(InjectedKind::Principal))
                .group("admin"),
        ]
    }
}

pub mod tree {
    use direct_router::{MethodDefinition, ParamType, ParameterDescriptor};
    use serde_json::json;

    pub const ACTION: &str = "tree";

    pub fn methods() -> Vec<MethodDefinition> {
        vec![
            MethodDefinition::new("children", |args| {
                let node: String = args.arg(0)?;
                if node == "root" {
                    Ok(json!([
                        {"id": "a", "text": "A", "leaf": false},
                        {"id": "b", "text": "B", "leaf": true}
                    ]))
                } else {
                    Ok(json!({"id": format!("{}.1", node), "text": "child", "leaf": true}))
                }
            })
            .tree_load()
            .param(ParameterDescriptor::payload("node", ParamType::String)),
        ]
    }
}

pub mod clock {
    use direct_router::{HandlerError, MethodDefinition, ParamType, ParameterDescriptor};
    use serde_json::json;

    pub const ACTION: &str = "clock";

    pub fn methods() -> Vec<MethodDefinition> {
        vec![
            MethodDefinition::new("now", |args| {
                let zone: String = args.arg(0)?;
                Ok(json!(format!("12:00 {}", zone)))
            })
            .poll()
            .event("tick")
            .param(ParameterDescriptor::request_param("zone", ParamType::String).default_value("UTC")),
            MethodDefinition::new("heartbeat", |_| Ok(json!("alive"))).poll(),
            MethodDefinition::new("broken", |_| {
                Err(HandlerError::custom("ClockStopped", "the clock stopped"))
            })
            .poll()
            .group("admin"),
        ]
    }
}

pub fn catalog() -> InMemoryCatalog {
    register_actions!(InMemoryCatalog::builder(), calc, people, tree, clock)
        .build()
        .unwrap()
}

pub fn remoting(config: RouterConfig) -> Remoting {
    Remoting::new(catalog(), config)
}

/// One call envelope.
pub fn call(action: &str, method: &str, data: Value, tid: i64) -> Value {
    json!({ "action": action, "method": method, "data": data, "type": "rpc", "tid": tid })
}

/// Route a JSON body and decode the reply.
pub fn send(remoting: &Remoting, body: &Value) -> Value {
    let response = remoting.router().route(&IncomingCall::post("/router").json(body)).unwrap();
    response.body_json().unwrap()
}
