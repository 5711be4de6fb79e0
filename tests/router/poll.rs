//! Polling providers.

use direct_router::{CallContext, IncomingCall, RequestInfo, RouterConfig};
use serde_json::json;

use crate::support::remoting;

#[test]
fn poll_answers_an_event() {
    let remoting = remoting(RouterConfig::default());
    let response = remoting
        .poller()
        .dispatch("clock", "now", "tick", &IncomingCall::get("/poll/clock/now/tick"))
        .unwrap();
    assert_eq!(
        response.body_json().unwrap(),
        json!({"type": "event", "name": "tick", "data": "12:00 UTC"})
    );
}

#[test]
fn poll_binds_request_params() {
    let remoting = remoting(RouterConfig::default());
    let incoming = IncomingCall::get("/poll/clock/now/tick").param("zone", "CET");
    let reply = remoting
        .poller()
        .dispatch("clock", "now", "tick", &incoming)
        .unwrap()
        .body_json()
        .unwrap();
    assert_eq!(reply["data"], "12:00 CET");
}

#[test]
fn event_name_defaults_to_method_name() {
    let remoting = remoting(RouterConfig::default());
    let descriptor = remoting.registry().resolve("clock", "heartbeat").unwrap();
    assert_eq!(descriptor.event_name(), Some("heartbeat"));

    let event = remoting.poller().poll(
        "clock",
        "heartbeat",
        "heartbeat",
        &CallContext::new(RequestInfo::new("GET", "/poll")),
    );
    assert_eq!(event.name, "heartbeat");
    assert_eq!(event.data, Some(json!("alive")));
}

#[test]
fn failures_become_exception_events() {
    let remoting = remoting(
        RouterConfig::default().with_exception_message("ClockStopped", ""),
    );
    let ctx = CallContext::default();
    let event = remoting.poller().poll("clock", "broken", "broken", &ctx);
    assert!(event.is_exception());
    assert_eq!(event.message.as_deref(), Some("the clock stopped"));

    let event = remoting.poller().poll("clock", "missing", "x", &ctx);
    assert!(event.is_exception());
    assert_eq!(event.message.as_deref(), Some("Server Error"));
}

#[test]
fn only_poll_methods_can_be_polled() {
    let remoting = remoting(RouterConfig::default().with_send_stacktrace(true));
    let event = remoting
        .poller()
        .poll("calc", "add", "sum", &CallContext::default());
    assert!(event.is_exception());
    assert_eq!(event.message.as_deref(), Some("Unsupported call"));
    assert!(event.location.unwrap().contains("not a polling provider"));
}
