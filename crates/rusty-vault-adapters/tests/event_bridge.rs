mod common;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use rusty_vault_runtime::{ComponentDefinition, HostTree, Notification};
use serde_json::{json, Value};

use common::{first, runtime};

fn shell() -> rusty_vault_runtime::Runtime<rusty_vault_adapters::Document> {
    runtime(
        "<x-app><x-send-form><button></button></x-send-form></x-app>",
        vec![
            ComponentDefinition::new("XSendForm"),
            ComponentDefinition::new("XApp").child("XSendForm"),
        ],
    )
}

#[test]
fn emitted_notifications_bubble_to_ancestors() {
    let rt = shell();
    let app = rt.mount("XApp", &Value::Null).expect("mount");
    let form = app.child("$sendForm").expect("form");

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    rt.host()
        .subscribe(
            app.node(),
            "submit",
            Arc::new(move |n: &Notification| {
                sink.lock().expect("sink").push((n.target, n.detail.clone()));
            }),
        )
        .expect("subscribe");

    rt.emit(form, "submit", json!({"amount": "1"}), true)
        .expect("emit bubbling");
    rt.emit(form, "submit", json!({"amount": "2"}), false)
        .expect("emit local");

    assert_eq!(
        *received.lock().expect("sink"),
        vec![(form.node(), json!({"amount": "1"}))]
    );
}

#[test]
fn listen_once_fires_exactly_once() {
    let rt = shell();
    let button = first(rt.host(), "button");
    let count = Arc::new(Mutex::new(0usize));
    let hits = Arc::clone(&count);

    let subscription = rt
        .listen_once(button, "click", move |_| {
            *hits.lock().expect("hits") += 1;
        })
        .expect("listen");
    assert!(subscription.is_active());
    assert_eq!(rt.host().listener_count().expect("count"), 1);

    for _ in 0..3 {
        rt.host()
            .dispatch(Notification::new("click", button))
            .expect("dispatch");
    }
    assert_eq!(*count.lock().expect("hits"), 1);
    assert!(!subscription.is_active());
    assert_eq!(rt.host().listener_count().expect("count"), 0);
}

#[test]
fn dropping_the_subscription_unregisters_the_listener() {
    let rt = shell();
    let button = first(rt.host(), "button");
    let fired = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&fired);

    let subscription = rt
        .listen_once(button, "click", move |_| {
            *flag.lock().expect("flag") = true;
        })
        .expect("listen");
    drop(subscription);
    assert_eq!(rt.host().listener_count().expect("count"), 0);

    rt.host()
        .dispatch(Notification::new("click", button))
        .expect("dispatch");
    assert!(!*fired.lock().expect("flag"));
}

#[test]
fn panicking_callback_still_unregisters() {
    let rt = shell();
    let button = first(rt.host(), "button");
    let _subscription = rt
        .listen_once(button, "click", |_| panic!("handler failure"))
        .expect("listen");

    let document = rt.host().clone();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        document.dispatch(Notification::new("click", button))
    }));
    assert!(outcome.is_err());
    assert_eq!(rt.host().listener_count().expect("count"), 0);
}
