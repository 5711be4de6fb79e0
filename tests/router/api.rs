//! API descriptor generation.

use direct_router::{ApiFormat, ApiRequest, EnableBuffer, RouterConfig};
use serde_json::{json, Value};

use crate::support::remoting;

/// The JSON document assigned to `var` in a script descriptor.
fn assigned(script: &str, var: &str) -> Value {
    let start = script.find(&format!("{} = ", var)).unwrap() + var.len() + 3;
    let rest = &script[start..];
    let end = rest.find("};").unwrap() + 1;
    serde_json::from_str(&rest[..end]).unwrap()
}

#[test]
fn descriptor_lists_every_exposed_method() {
    let remoting = remoting(RouterConfig::default());
    let script = remoting.api().build(&ApiRequest::new()).unwrap();
    assert!(script.starts_with("Ext.ns('Ext.app');"));

    let api = assigned(&script, "Ext.app.REMOTING_API");
    assert_eq!(api["type"], "remoting");
    assert_eq!(api["url"], "/router");
    assert_eq!(
        api["actions"]["calc"][0],
        json!({"name": "add", "len": 2})
    );
    assert_eq!(
        api["actions"]["calc"][2],
        json!({"name": "greet", "params": ["name", "greeting"]})
    );
    let people: Vec<&str> = api["actions"]["people"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        people,
        vec!["list", "names", "empty", "update", "load", "save", "touch", "saveJson", "owner"]
    );
    assert_eq!(api["actions"]["people"][0]["len"], 1);
    assert_eq!(
        api["actions"]["people"][5],
        json!({"name": "save", "len": 0, "formHandler": true})
    );
    assert!(api["actions"].get("clock").is_none());

    let urls = assigned(&script, "Ext.app.POLLING_URLS");
    assert_eq!(
        urls,
        json!({
            "tick": "/poll/clock/now/tick",
            "heartbeat": "/poll/clock/heartbeat/heartbeat",
            "broken": "/poll/clock/broken/broken"
        })
    );
}

#[test]
fn injected_parameters_do_not_count() {
    let remoting = remoting(RouterConfig::default());
    let api = assigned(
        &remoting.api().build(&ApiRequest::new()).unwrap(),
        "Ext.app.REMOTING_API",
    );
    let whoami = api["actions"]["calc"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["name"] == "whoami")
        .cloned()
        .unwrap();
    assert_eq!(whoami, json!({"name": "whoami", "len": 0}));
}

#[test]
fn group_filter_selects_methods() {
    let remoting = remoting(RouterConfig::default());
    let request = ApiRequest::new().with_group(Some("admin"));
    let script = remoting.api().build(&request).unwrap();
    let api = assigned(&script, "Ext.app.REMOTING_API");
    assert_eq!(api["actions"], json!({"people": [{"name": "owner", "len": 0}]}));
    assert_eq!(
        assigned(&script, "Ext.app.POLLING_URLS"),
        json!({"broken": "/poll/clock/broken/broken"})
    );

    let none = remoting
        .api()
        .build(&ApiRequest::new().with_group(Some("nobody")))
        .unwrap();
    assert!(!none.contains("POLLING_URLS"));
}

#[test]
fn builds_are_byte_identical() {
    let first = remoting(RouterConfig::default())
        .api()
        .build(&ApiRequest::for_path("/api-debug.js"))
        .unwrap();
    let second = remoting(RouterConfig::default())
        .api()
        .build(&ApiRequest::for_path("/api-debug.js"))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn client_hints_are_echoed() {
    let config = RouterConfig::from_toml_str(
        r#"
        timeout = 12000
        maxRetries = 2
        enableBuffer = "15"
        bufferLimit = 4
        "#,
    )
    .unwrap();
    assert_eq!(config.enable_buffer, Some(EnableBuffer::Millis(15)));
    let remoting = remoting(config);
    let api = assigned(
        &remoting.api().build(&ApiRequest::new()).unwrap(),
        "Ext.app.REMOTING_API",
    );
    assert_eq!(api["timeout"], 12000);
    assert_eq!(api["maxRetries"], 2);
    assert_eq!(api["enableBuffer"], 15);
    assert_eq!(api["bufferLimit"], 4);
}

#[test]
fn namespaces_and_variable_names() {
    let remoting = remoting(RouterConfig::default());
    let request = ApiRequest::new()
        .with_api_ns(Some("App.direct"))
        .with_action_ns(Some("App.actions"))
        .with_remoting_api_var("API")
        .with_polling_urls_var("POLLS");
    let script = remoting.api().build(&request).unwrap();
    assert!(script.starts_with("Ext.ns('App.direct');Ext.ns('App.actions');App.direct.API = "));
    assert!(script.contains("App.direct.POLLS = {"));
    assert_eq!(assigned(&script, "App.direct.API")["namespace"], "App.actions");

    let bare = remoting
        .api()
        .build(&ApiRequest::new().with_api_ns(None))
        .unwrap();
    assert!(bare.starts_with("REMOTING_API = "));
}

#[test]
fn json_format() {
    let remoting = remoting(RouterConfig::default());
    let request = ApiRequest::for_path("/direct/api.js").with_format(ApiFormat::Json);
    let response = remoting.api().respond(&request).unwrap();
    assert!(response.content_type.starts_with("application/json"));
    let doc = response.body_json().unwrap();
    assert_eq!(doc["descriptor"], "Ext.app.REMOTING_API");
    assert_eq!(doc["url"], "/direct/router");
    assert!(doc["actions"]["calc"].is_array());
}

#[test]
fn script_content_type_is_configurable() {
    let remoting = remoting(RouterConfig {
        js_content_type: "text/javascript".to_string(),
        ..RouterConfig::default()
    });
    let response = remoting.api().respond(&ApiRequest::new()).unwrap();
    assert_eq!(response.content_type, "text/javascript");
}
