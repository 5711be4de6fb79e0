//! Form submits, uploads and JSON form posts.

use direct_router::{IncomingCall, RouterConfig, UploadedFile};
use serde_json::{json, Value};

use crate::support::{call, remoting, send};

fn form_post(method: &str) -> IncomingCall {
    IncomingCall::post("/router")
        .header("content-type", "application/x-www-form-urlencoded")
        .param("extAction", "people")
        .param("extMethod", method)
        .param("extTID", "3")
        .param("extType", "rpc")
}

fn textarea_json(body: &str) -> Value {
    let inner = body
        .strip_prefix("<html><body><textarea>")
        .and_then(|rest| rest.strip_suffix("</textarea></body></html>"))
        .unwrap();
    serde_json::from_str(inner).unwrap()
}

#[test]
fn form_post_binds_fields() {
    let remoting = remoting(RouterConfig::default());
    let incoming = form_post("save").param("name", "Ada").param("age", "36");
    let reply = remoting.router().route_form_post(&incoming).unwrap().body_json().unwrap();
    assert_eq!(
        reply,
        json!({
            "action": "people",
            "method": "save",
            "type": "rpc",
            "tid": 3,
            "result": {"success": true, "name": "Ada"}
        })
    );
}

#[test]
fn form_post_reports_field_errors() {
    let remoting = remoting(RouterConfig::default());
    let incoming = form_post("save").param("age", "old");
    let reply = remoting.router().route_form_post(&incoming).unwrap().body_json().unwrap();
    let result = &reply["result"];
    assert_eq!(result["success"], false);
    assert_eq!(result["errors"]["name"], json!(["must not be empty"]));
    assert!(result["errors"]["age"].is_array());
    assert!(result["errors"].get("extAction").is_none());
}

#[test]
fn unit_form_post_answers_collected_errors() {
    let remoting = remoting(RouterConfig::default());
    let ok = form_post("touch").param("name", "Ada");
    let reply = remoting.router().route_form_post(&ok).unwrap().body_json().unwrap();
    assert_eq!(reply["result"], json!({"success": true}));

    let bad = form_post("touch");
    let reply = remoting.router().route_form_post(&bad).unwrap().body_json().unwrap();
    assert_eq!(
        reply["result"],
        json!({"success": false, "errors": {"name": ["must not be empty"]}})
    );
}

#[test]
fn upload_reply_is_wrapped_in_html() {
    let remoting = remoting(RouterConfig::default());
    let incoming = form_post("save")
        .param("name", "Ada")
        .upload(UploadedFile::new("avatar", vec![1u8, 2, 3]).with_file_name("ada.png"));
    let response = remoting.router().route_form_post(&incoming).unwrap();
    assert!(response.content_type.starts_with("text/html"));
    let reply = textarea_json(response.body_str());
    assert_eq!(reply["result"]["avatarSize"], 3);
    assert_eq!(reply["tid"], 3);
}

#[test]
fn ext_upload_flag_wraps_without_files() {
    let remoting = remoting(RouterConfig::default());
    let incoming = form_post("save").param("name", "Ada").param("extUpload", "true");
    let response = remoting.router().route_form_post(&incoming).unwrap();
    assert!(response.content_type.starts_with("text/html"));
    assert_eq!(textarea_json(response.body_str())["result"]["success"], true);
}

#[test]
fn form_post_requires_post() {
    let remoting = remoting(RouterConfig::default());
    let incoming = IncomingCall::get("/router")
        .param("extAction", "people")
        .param("extMethod", "save")
        .param("extTID", "8")
        .param("name", "Ada");
    let reply = remoting.router().route_form_post(&incoming).unwrap().body_json().unwrap();
    assert_eq!(reply["type"], "exception");
    assert_eq!(reply["tid"], 8);
    assert_eq!(reply["result"], json!({"success": false}));
}

#[test]
fn only_form_post_methods_take_form_submits() {
    let remoting = remoting(RouterConfig::default());
    let incoming = form_post("list");
    let reply = remoting.router().route_form_post(&incoming).unwrap().body_json().unwrap();
    assert_eq!(reply["type"], "exception");
    assert_eq!(reply["message"], "Unsupported call");

    let reply = send(&remoting, &call("people", "save", json!([{"name": "Ada"}]), 1));
    assert_eq!(reply["type"], "exception");
}

#[test]
fn form_post_json_goes_through_the_router() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(
        &remoting,
        &call("people", "saveJson", json!([{"name": "Ada", "age": "36"}]), 4),
    );
    assert_eq!(reply["type"], "rpc");
    assert_eq!(reply["result"], json!({"success": true, "name": "Ada"}));
}

#[test]
fn unknown_form_target_keeps_identity() {
    let remoting = remoting(RouterConfig::default());
    let incoming = form_post("missing");
    let reply = remoting.router().route_form_post(&incoming).unwrap().body_json().unwrap();
    assert_eq!(reply["action"], "people");
    assert_eq!(reply["method"], "missing");
    assert_eq!(reply["message"], "Server Error");
}
