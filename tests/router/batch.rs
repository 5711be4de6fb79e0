//! JSON routing: single calls, batches and failure containment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use direct_router::method::InjectedKind;
use direct_router::{
    ExecutionPolicy, HandlerDefinition, InMemoryCatalog, IncomingCall, MethodDefinition,
    ParameterDescriptor, Remoting, RouterConfig, RouterError, Session,
};
use serde_json::json;

use crate::support::{call, remoting, send};

#[test]
fn single_call_gets_single_reply() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("calc", "add", json!([1, 2]), 7));
    assert_eq!(
        reply,
        json!({"action": "calc", "method": "add", "type": "rpc", "tid": 7, "result": 3})
    );
}

#[test]
fn batch_replies_in_request_order() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(
        &remoting,
        &json!([
            call("calc", "add", json!([1, 2]), 1),
            call("calc", "divide", json!([1, 0]), 2),
            call("calc", "add", json!(["3", 4]), 3),
        ]),
    );
    let items = reply.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["result"], 3);
    assert_eq!(items[1]["type"], "exception");
    assert_eq!(items[1]["tid"], 2);
    assert_eq!(items[2]["result"], 7);
}

#[test]
fn null_result_is_omitted() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("calc", "nothing", json!(null), 1));
    assert_eq!(reply["type"], "rpc");
    assert!(reply.get("result").is_none());
}

#[test]
fn simple_named_uses_defaults() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("calc", "greet", json!({"name": "Ada"}), 1));
    assert_eq!(reply["result"], "Hello, Ada!");
    let reply = send(
        &remoting,
        &call("calc", "greet", json!({"name": "Ada", "greeting": "Hi"}), 2),
    );
    assert_eq!(reply["result"], "Hi, Ada!");
}

#[test]
fn arity_mismatch_is_reported_per_call() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("calc", "add", json!([1]), 5));
    assert_eq!(reply["type"], "exception");
    assert_eq!(
        reply["message"],
        "Parameter mismatch: expected 2 parameter(s) but received 1"
    );
    assert!(reply.get("where").is_none());
}

#[test]
fn invalid_value_hides_type_unless_diagnostics() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("calc", "add", json!(["x", 1]), 1));
    assert_eq!(reply["message"], "Invalid value for parameter 'a'");
    assert!(reply.get("where").is_none());

    let remoting = crate::support::remoting(RouterConfig::default().with_send_stacktrace(true));
    let reply = send(&remoting, &call("calc", "add", json!(["x", 1]), 1));
    assert!(reply["where"].as_str().unwrap().starts_with("parameter 'a'"));
}

#[test]
fn unknown_method_uses_default_message() {
    let remoting = remoting(RouterConfig::default().with_send_exception_message(true));
    let reply = send(&remoting, &call("calc", "pow", json!([]), 9));
    assert_eq!(
        reply,
        json!({"action": "calc", "method": "pow", "type": "exception", "tid": 9, "message": "Server Error"})
    );
    let reply = send(&remoting, &call("nobody", "pow", json!([]), 10));
    assert_eq!(reply["message"], "Server Error");
}

#[test]
fn handler_errors_map_through_the_table() {
    let config = RouterConfig::default()
        .with_exception_message("Rejected", "Cannot do that")
        .with_exception_message("Panic", "");
    let remoting = remoting(config);
    let reply = send(&remoting, &call("calc", "divide", json!([1, 0]), 1));
    assert_eq!(reply["message"], "Cannot do that");
    let reply = send(&remoting, &call("calc", "boom", json!([]), 2));
    assert_eq!(reply["type"], "exception");
    assert_eq!(reply["message"], "handler exploded");
}

#[test]
fn exception_message_sent_when_enabled() {
    let remoting = remoting(RouterConfig::default().with_send_exception_message(true));
    let reply = send(&remoting, &call("calc", "divide", json!([1, 0]), 1));
    assert_eq!(reply["message"], "division by zero");
}

#[test]
fn malformed_envelope_keeps_its_tid() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(
        &remoting,
        &json!([
            {"action": "calc", "tid": 4},
            call("calc", "add", json!([2, 2]), 5),
        ]),
    );
    assert_eq!(reply[0]["type"], "exception");
    assert_eq!(reply[0]["tid"], 4);
    assert_eq!(reply[0]["action"], "calc");
    assert_eq!(reply[1]["result"], 4);
}

#[test]
fn unreadable_body_fails_the_request() {
    let remoting = remoting(RouterConfig::default());
    let err = remoting
        .router()
        .route(&IncomingCall::post("/router").body("not json"))
        .unwrap_err();
    assert!(matches!(err, RouterError::Codec(_)));
    let err = remoting
        .router()
        .route(&IncomingCall::post("/router").json(&json!(42)))
        .unwrap_err();
    assert!(matches!(err, RouterError::Codec(_)));
}

#[test]
fn poll_methods_are_not_routable() {
    let remoting = remoting(RouterConfig::default().with_send_stacktrace(true));
    let reply = send(&remoting, &call("clock", "now", json!([]), 1));
    assert_eq!(reply["type"], "exception");
    assert_eq!(reply["message"], "Unsupported call");
}

#[test]
fn injected_values_come_from_the_call() {
    let remoting = remoting(RouterConfig::default());
    let incoming = IncomingCall::post("/router")
        .json(&call("calc", "whoami", json!(null), 1))
        .principal("ada")
        .locale("de-CH");
    let reply = remoting.router().route(&incoming).unwrap().body_json().unwrap();
    assert_eq!(reply["result"], json!({"principal": "ada", "locale": "de-CH"}));
}

#[test]
fn session_variables_persist_across_calls() {
    let remoting = remoting(RouterConfig::default());
    let session = Session::new("s1");
    for expected in 1..=3 {
        let incoming = IncomingCall::post("/router")
            .json(&call("calc", "visit", json!([]), expected))
            .session(session.clone());
        let reply = remoting.router().route(&incoming).unwrap().body_json().unwrap();
        assert_eq!(reply["result"], expected);
    }
    assert_eq!(session.get("visits"), Some(json!(3)));

    let reply = send(&remoting, &call("calc", "visit", json!([]), 9));
    assert_eq!(reply["type"], "exception");
}

#[test]
fn response_headers_reach_the_reply() {
    let remoting = remoting(RouterConfig::default());
    let response = remoting
        .router()
        .route(&IncomingCall::post("/router").json(&call("calc", "stamp", json!([]), 1)))
        .unwrap();
    assert_eq!(response.header("x-stamped"), Some("yes"));
}

#[test]
fn concurrent_batches_keep_order() {
    let remoting = remoting(
        RouterConfig::default()
            .with_execution_policy(ExecutionPolicy::Concurrent)
            .with_batch_threads(3),
    );
    let reply = send(
        &remoting,
        &json!([
            call("calc", "nap", json!([40]), 1),
            call("calc", "nap", json!([1]), 2),
            call("calc", "nap", json!([20]), 3),
            call("calc", "add", json!([1, 1]), 4),
        ]),
    );
    let tids: Vec<i64> = reply
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["tid"].as_i64().unwrap())
        .collect();
    assert_eq!(tids, vec![1, 2, 3, 4]);
    assert_eq!(reply[0]["result"], 40);
    assert_eq!(reply[3]["result"], 2);
}

fn tracked(inflight: Arc<AtomicUsize>, peak: Arc<AtomicUsize>) -> Remoting {
    let catalog = InMemoryCatalog::builder()
        .action(
            HandlerDefinition::new("work").method(
                MethodDefinition::new("step", move |_| {
                    let now = inflight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(15));
                    inflight.fetch_sub(1, Ordering::SeqCst);
                    Ok(json!(now))
                })
                .simple()
                .synchronize_on_session()
                .param(ParameterDescriptor::injected(InjectedKind::Session)),
            ),
        )
        .build()
        .unwrap();
    Remoting::new(
        catalog,
        RouterConfig::default()
            .with_execution_policy(ExecutionPolicy::Concurrent)
            .with_batch_threads(4),
    )
}

#[test]
fn synchronized_calls_of_one_session_never_overlap() {
    let inflight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let remoting = tracked(Arc::clone(&inflight), Arc::clone(&peak));

    let batch = json!([
        call("work", "step", json!([]), 1),
        call("work", "step", json!([]), 2),
        call("work", "step", json!([]), 3),
        call("work", "step", json!([]), 4),
    ]);
    let incoming = IncomingCall::post("/router")
        .json(&batch)
        .session(Session::new("shared"));
    let reply = remoting.router().route(&incoming).unwrap().body_json().unwrap();

    assert_eq!(reply.as_array().unwrap().len(), 4);
    assert!(reply.as_array().unwrap().iter().all(|r| r["type"] == "rpc"));
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[test]
fn different_sessions_run_side_by_side() {
    let inflight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let remoting = tracked(Arc::clone(&inflight), Arc::clone(&peak));

    thread::scope(|scope| {
        for id in ["a", "b"] {
            let remoting = &remoting;
            scope.spawn(move || {
                let incoming = IncomingCall::post("/router")
                    .json(&call("work", "step", json!([]), 1))
                    .session(Session::new(id));
                remoting.router().route(&incoming).unwrap();
            });
        }
    });
    assert_eq!(peak.load(Ordering::SeqCst), 2);
}
