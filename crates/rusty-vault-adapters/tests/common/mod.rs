#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rusty_vault_adapters::Document;
use rusty_vault_runtime::{
    ComponentDefinition, DefinitionRegistry, Diagnostic, DiagnosticSink, HostTree, NodeId,
    Runtime,
};

pub fn registry(definitions: Vec<ComponentDefinition>) -> DefinitionRegistry {
    let mut registry = DefinitionRegistry::new();
    for definition in definitions {
        registry.register(definition).expect("register definition");
    }
    registry
}

pub fn runtime(markup: &str, definitions: Vec<ComponentDefinition>) -> Runtime<Document> {
    let document = Document::parse(markup).expect("parse markup");
    Runtime::new(document, registry(definitions))
}

pub fn collecting_sink() -> (DiagnosticSink, Arc<Mutex<Vec<Diagnostic>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink: DiagnosticSink = Arc::new(move |d: &Diagnostic| {
        sink_seen.lock().expect("diagnostics lock").push(d.clone());
    });
    (sink, seen)
}

pub fn all(document: &Document, tag: &str) -> Vec<NodeId> {
    let root = document.root().expect("root");
    document.descendants_by_tag(root, tag).expect("descendants")
}

pub fn first(document: &Document, tag: &str) -> NodeId {
    document
        .find_first(tag)
        .expect("lookup")
        .unwrap_or_else(|| panic!("no <{tag}> in document"))
}

pub fn is_claimed(document: &Document, node: NodeId) -> bool {
    document
        .attribute(node, "data-claimed")
        .expect("attribute")
        .is_some()
}
