use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use rusty_vault_adapters::StateStore;
use rusty_vault_runtime::{StateStorePort, StoreListener};

#[test]
fn dispatch_stores_value_and_notifies_key_subscribers() {
    let store = StateStore::new();
    let seen = Arc::new(Mutex::new(Vec::<(String, Value)>::new()));
    let sink = Arc::clone(&seen);
    let listener: StoreListener = Arc::new(move |key: &str, value: &Value| {
        sink.lock()
            .expect("sink")
            .push((key.to_owned(), value.clone()));
    });

    let id = store.subscribe("accounts", listener).expect("subscribe");
    store
        .dispatch("accounts", json!([{"profile": "alice"}]))
        .expect("dispatch accounts");
    store
        .dispatch("theme", json!("dark"))
        .expect("dispatch theme");

    assert_eq!(
        *seen.lock().expect("sink"),
        vec![("accounts".to_owned(), json!([{"profile": "alice"}]))]
    );
    assert_eq!(store.get("theme").expect("get"), Some(json!("dark")));
    assert_eq!(store.keys().expect("keys"), vec!["accounts", "theme"]);

    store.unsubscribe(id).expect("unsubscribe");
    store
        .dispatch("accounts", json!([]))
        .expect("dispatch after unsubscribe");
    assert_eq!(seen.lock().expect("sink").len(), 1);
    assert!(store.unsubscribe(id).is_err());
}

#[test]
fn listeners_may_read_the_store_during_dispatch() {
    let store = StateStore::new();
    let observed = Arc::new(Mutex::new(None));
    let reader = store.clone();
    let slot = Arc::clone(&observed);
    store
        .subscribe(
            "session",
            Arc::new(move |key: &str, _: &Value| {
                *slot.lock().expect("slot") = reader.get(key).expect("get in listener");
            }),
        )
        .expect("subscribe");

    store
        .dispatch("session", json!({"active": true}))
        .expect("dispatch");
    assert_eq!(
        *observed.lock().expect("slot"),
        Some(json!({"active": true}))
    );
}
