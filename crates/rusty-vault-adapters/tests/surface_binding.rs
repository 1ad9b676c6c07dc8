mod common;

use rusty_vault_adapters::Document;
use rusty_vault_runtime::{
    ComponentDefinition, DefinitionRegistry, HostTree, Owner, Runtime, RuntimeError,
};
use serde_json::Value;

use common::{all, first, is_claimed, registry, runtime};

#[test]
fn mount_claims_first_unclaimed_node_in_document_order() {
    let rt = runtime(
        "<x-card data-claimed></x-card><x-card></x-card><x-card></x-card>",
        vec![ComponentDefinition::new("XCard")],
    );
    let cards = all(rt.host(), "x-card");

    let instance = rt.mount("XCard", &Value::Null).expect("mount");
    assert_eq!(instance.node(), cards[1]);
    assert!(is_claimed(rt.host(), cards[1]));
    assert!(!is_claimed(rt.host(), cards[2]));

    let second = rt.mount("XCard", &Value::Null).expect("second mount");
    assert_eq!(second.node(), cards[2]);
}

#[test]
fn styles_are_applied_base_first_without_removing_existing() {
    let rt = runtime(
        r#"<b class="preset"></b>"#,
        vec![
            ComponentDefinition::new("A").styles(["a1"]),
            ComponentDefinition::new("B").extends("A").styles(["b1"]),
        ],
    );
    let instance = rt.mount("B", &Value::Null).expect("mount");
    let styles = rt.host().styles(instance.node()).expect("styles");
    assert_eq!(styles, vec!["preset", "a1", "b1"]);
}

#[test]
fn missing_node_is_a_binding_error_naming_tag_and_parent() {
    let rt = runtime("<x-other></x-other>", vec![ComponentDefinition::new("XCard")]);
    let err = rt.mount("XCard", &Value::Null).expect_err("no x-card");
    assert!(err.is_binding());
    let message = err.to_string();
    assert!(message.contains("<x-card>"), "{message}");
    assert!(message.contains("document root"), "{message}");
}

#[test]
fn direct_adoption_claims_once() {
    let rt = runtime(
        "<x-card></x-card><x-card></x-card>",
        vec![ComponentDefinition::new("XCard")],
    );
    let cards = all(rt.host(), "x-card");

    let adopted = rt.adopt("XCard", cards[0], &Value::Null).expect("adopt");
    assert_eq!(adopted.node(), cards[0]);
    assert!(is_claimed(rt.host(), cards[0]));

    let err = rt
        .adopt("XCard", cards[0], &Value::Null)
        .expect_err("second adoption");
    assert!(matches!(err, RuntimeError::AlreadyClaimed { .. }));
    assert!(is_claimed(rt.host(), cards[0]));

    let searched = rt.mount("XCard", &Value::Null).expect("search mount");
    assert_eq!(searched.node(), cards[1]);
}

#[test]
fn parent_owner_searches_only_its_descendants() {
    let rt = runtime(
        "<x-row></x-row><x-table><x-row></x-row></x-table>",
        vec![
            ComponentDefinition::new("XRow"),
            ComponentDefinition::new("XTable").no_children(),
        ],
    );
    let table = rt.mount("XTable", &Value::Null).expect("table");
    let row = rt
        .construct("XRow", Owner::Parent(&table), &Value::Null)
        .expect("row under table");
    assert_eq!(rt.host().parent(row.node()).expect("parent"), Some(table.node()));
    assert!(!is_claimed(rt.host(), first(rt.host(), "x-row")));
}

#[test]
fn create_detached_builds_over_a_fresh_unparented_node() {
    let rt = Runtime::new(
        Document::new(),
        registry(vec![ComponentDefinition::new("XToast")
            .styles(["toast"])
            .template("<span>saved</span>")]),
    );
    let toast = rt.create_detached("XToast", &Value::Null).expect("detached");
    let document = rt.host();
    assert_eq!(document.tag_name(toast.node()).expect("tag"), "x-toast");
    assert!(!document.is_attached(toast.node()).expect("attached"));
    assert_eq!(document.text_content(toast.node()).expect("text"), "saved");
    assert_eq!(document.styles(toast.node()).expect("styles"), vec!["toast"]);
}

#[test]
fn unknown_definition_is_reported() {
    let rt = Runtime::new(Document::new(), DefinitionRegistry::new());
    let err = rt.mount("XMissing", &Value::Null).expect_err("unknown");
    assert!(matches!(err, RuntimeError::UnknownDefinition(ref n) if n == "XMissing"));
}
