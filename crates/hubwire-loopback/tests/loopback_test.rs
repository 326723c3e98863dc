use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use hubwire_core::{HubError, HubProxy, Value};
use hubwire_loopback::LoopbackHub;
use serde_json::json;

fn calculator() -> LoopbackHub {
    let hub = LoopbackHub::new("calc");
    hub.method_fn("Add", |ctx| {
        let a = ctx.arg(0)?.as_i64().unwrap_or_default();
        let b = ctx.arg(1)?.as_i64().unwrap_or_default();
        Ok(json!(a + b))
    });
    hub
}

#[tokio::test]
async fn test_invoke_runs_registered_method() {
    let hub = calculator();
    let result = hub.invoke("Add", vec![json!(2), json!(3)]).await.unwrap();
    assert_eq!(result, json!(5));

    let log = hub.invocations();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].method(), "Add");
    assert_eq!(log[0].args(), &[json!(2), json!(3)]);
}

#[tokio::test]
async fn test_method_names_ignore_case_by_default() {
    let hub = calculator();
    assert_eq!(hub.invoke("add", vec![json!(1), json!(1)]).await.unwrap(), json!(2));

    let strict = LoopbackHub::builder().case_sensitive(true).build();
    strict.method_fn("Add", |_| Ok(Value::Null));
    let err = strict.invoke("add", vec![]).await.unwrap_err();
    assert_eq!(err, HubError::MethodNotFound("add".to_string()));
}

#[tokio::test]
async fn test_unknown_method_is_still_recorded() {
    let hub = calculator();
    let err = hub.invoke("Missing", vec![json!(1)]).await.unwrap_err();
    assert!(matches!(err, HubError::MethodNotFound(name) if name == "Missing"));
    assert_eq!(hub.invocations().len(), 1);

    hub.clear_invocations();
    assert!(hub.invocations().is_empty());
}

#[tokio::test]
async fn test_missing_argument_is_a_remote_error() {
    let hub = calculator();
    let err = hub.invoke("Add", vec![json!(2)]).await.unwrap_err();
    assert!(matches!(err, HubError::Remote { method, .. } if method == "Add"));
}

#[tokio::test]
async fn test_disconnected_hub_rejects_invocations() {
    let hub = calculator();
    hub.disconnect();
    let err = hub.invoke("Add", vec![json!(1), json!(2)]).await.unwrap_err();
    assert_eq!(err, HubError::Disconnected);

    hub.reconnect();
    assert!(hub.invoke("Add", vec![json!(1), json!(2)]).await.is_ok());
}

#[tokio::test]
async fn test_invoke_timeout() {
    let hub = LoopbackHub::builder()
        .hub_name("slow")
        .invoke_timeout(Duration::from_millis(20))
        .build();
    hub.method("Stall", |_ctx| async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(Value::Null)
    });

    let err = hub.invoke("Stall", vec![]).await.unwrap_err();
    assert_eq!(err, HubError::Timeout("Stall".to_string()));
}

#[tokio::test]
async fn test_progress_reaches_caller() {
    let hub = LoopbackHub::new("jobs");
    hub.method("Run", |ctx| async move {
        for step in [25, 50, 100] {
            ctx.report_progress(json!(step));
        }
        Ok(json!("done"))
    });

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let result = hub
        .invoke_with_progress(
            "Run",
            Arc::new(move |value| sink.lock().unwrap().push(value)),
            vec![],
        )
        .await
        .unwrap();

    assert_eq!(result, json!("done"));
    assert_eq!(*seen.lock().unwrap(), vec![json!(25), json!(50), json!(100)]);
}

#[test]
fn test_push_reaches_subscribers() {
    let hub = LoopbackHub::new("chat");
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let subscription = hub.subscribe("Message");
    let handle = subscription.add_handler(Arc::new(move |args: &[Value]| {
        assert_eq!(args, &[json!("hi")]);
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(hub.handler_count("message"), 1);

    hub.push("MESSAGE", vec![json!("hi")]);
    hub.invoke_event("Message", vec![json!("hi")]);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    handle.dispose();
    hub.push("Message", vec![json!("hi")]);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(hub.handler_count("Message"), 0);
}

#[test]
fn test_released_subscriptions_are_pruned() {
    let hub = LoopbackHub::new("chat");
    for round in 0..50 {
        let handle = hub
            .subscribe(&format!("Event{round}"))
            .add_handler(Arc::new(|_args: &[Value]| {}));
        drop(handle);
    }
    assert!(hub.subscription_count() <= 1);

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let kept = hub.subscribe("Kept").add_handler(Arc::new(move |_args: &[Value]| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    let pending = hub.subscribe("Pending");
    hub.subscribe("Other");
    assert_eq!(hub.subscription_count(), 3);

    let late = pending.add_handler(Arc::new(|_args: &[Value]| {}));
    assert_eq!(hub.handler_count("Pending"), 1);
    hub.push("Kept", vec![]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    drop((kept, late, pending));
    hub.subscribe("Other");
    assert_eq!(hub.subscription_count(), 1);
}

#[test]
fn test_push_without_subscribers_is_silent() {
    let hub = LoopbackHub::new("chat");
    hub.push("Nobody", vec![json!(1)]);
    assert_eq!(hub.handler_count("Nobody"), 0);
}

#[test]
fn test_state_round_trips() {
    let hub = LoopbackHub::new("chat");
    assert_eq!(hub.state("user"), None);
    hub.set_state("User", json!("ana"));
    assert_eq!(hub.state("user"), Some(json!("ana")));
}
