//! Store, form load and tree calls.

use direct_router::RouterConfig;
use serde_json::json;

use crate::support::{call, remoting, send};

#[test]
fn store_read_pages_and_sorts() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(
        &remoting,
        &call(
            "people",
            "list",
            json!([{"page": 2, "limit": 2, "sort": [{"property": "age", "direction": "DESC"}]}]),
            1,
        ),
    );
    let result = &reply["result"];
    assert_eq!(result["total"], 5);
    assert_eq!(result["success"], true);
    let names: Vec<&str> = result["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ada", "Ken"]);
}

#[test]
fn store_read_folds_legacy_sort_and_filters() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(
        &remoting,
        &call(
            "people",
            "list",
            json!([{
                "sort": "age",
                "dir": "ASC",
                "filter": [{"type": "numeric", "field": "age", "value": "35", "comparison": "gt"}]
            }]),
            2,
        ),
    );
    let ages: Vec<i64> = reply["result"]["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["age"].as_i64().unwrap())
        .collect();
    assert_eq!(ages, vec![36, 45, 52]);
}

#[test]
fn store_read_extra_keys_bind_named_parameters() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("people", "names", json!([{"prefix": "Gr"}]), 1));
    assert_eq!(reply["result"], json!(["Grace"]));
    let reply = send(&remoting, &call("people", "names", json!([{}, "L"]), 2));
    assert_eq!(reply["result"], json!(["Linus"]));
}

#[test]
fn store_read_rejects_bad_paging() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("people", "list", json!([{"limit": "many"}]), 1));
    assert_eq!(reply["type"], "exception");
    assert_eq!(reply["message"], "Invalid value for parameter 'limit'");
}

#[test]
fn null_store_result_is_an_empty_list() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("people", "empty", json!([{}]), 1));
    assert_eq!(reply["result"], json!([]));

    let remoting = crate::support::remoting(RouterConfig::default().with_always_wrap_store_response(true));
    let reply = send(&remoting, &call("people", "empty", json!([{}]), 1));
    assert_eq!(reply["result"], json!({"records": [], "success": true}));
}

#[test]
fn store_modify_accepts_each_record_shape() {
    let remoting = remoting(RouterConfig::default());
    let shapes = [
        json!([[{"id": 1, "name": "Ada"}, {"id": "2", "name": "Grace"}]]),
        json!([{"records": [{"id": 1, "name": "Ada"}, {"id": 2, "name": "Grace"}]}]),
    ];
    for data in shapes {
        let reply = send(&remoting, &call("people", "update", data, 1));
        let records = reply["result"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], 2);
        assert_eq!(records[1]["updated"], true);
    }

    let reply = send(&remoting, &call("people", "update", json!([{"id": 3, "name": "Linus"}]), 2));
    assert_eq!(reply["result"], json!([{"id": 3, "name": "Linus", "updated": true}]));
}

#[test]
fn store_modify_wraps_when_configured() {
    let remoting = remoting(RouterConfig::default().with_always_wrap_store_response(true));
    let reply = send(&remoting, &call("people", "update", json!([{"id": 3, "name": "Linus"}]), 1));
    assert_eq!(
        reply["result"],
        json!({"records": [{"id": 3, "name": "Linus", "updated": true}], "success": true})
    );
}

#[test]
fn store_modify_rejects_bad_records() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("people", "update", json!([[]]), 1));
    assert_eq!(reply["message"], "Unexpected request data");
    let reply = send(&remoting, &call("people", "update", json!([[{"id": "x", "name": "A"}]]), 2));
    assert_eq!(reply["message"], "Invalid value for parameter 'people'");
}

#[test]
fn form_load_wraps_result() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("people", "load", json!([{"id": 2}]), 1));
    assert_eq!(
        reply["result"],
        json!({"success": true, "data": {"id": 2, "name": "Grace", "age": 45}})
    );
    let reply = send(&remoting, &call("people", "load", json!([{"id": 99}]), 2));
    assert_eq!(reply["type"], "exception");
}

#[test]
fn tree_load_always_answers_a_list() {
    let remoting = remoting(RouterConfig::default());
    let reply = send(&remoting, &call("tree", "children", json!([{"node": "root"}]), 1));
    assert_eq!(reply["result"].as_array().unwrap().len(), 2);
    let reply = send(&remoting, &call("tree", "children", json!([{"node": "a"}]), 2));
    assert_eq!(
        reply["result"],
        json!([{"id": "a.1", "text": "child", "leaf": true}])
    );
}

#[test]
fn paging_overflow_fails_only_its_own_call() {
    let remoting = remoting(RouterConfig::default().with_send_stacktrace(true));
    let reply = send(
        &remoting,
        &json!([
            call("people", "list", json!([{"limit": 4611686018427387904i64, "page": 4}]), 1),
            call("calc", "add", json!([1, 2]), 2),
            call("people", "list", json!([{"limit": 1, "start": i64::MAX}]), 3),
        ]),
    );
    assert_eq!(reply[0]["type"], "exception");
    assert_eq!(reply[0]["message"], "Invalid value for parameter 'page'");
    assert!(reply[0]["where"].as_str().unwrap().contains("overflows"));
    assert_eq!(reply[1]["result"], 3);
    assert_eq!(reply[2]["type"], "exception");
    assert_eq!(reply[2]["tid"], 3);
}
