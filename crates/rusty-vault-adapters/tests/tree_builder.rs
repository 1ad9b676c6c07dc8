mod common;

use std::sync::{Arc, Mutex};

use rusty_vault_runtime::{ComponentDefinition, Diagnostic, HostTree, RuntimeError};
use serde_json::{json, Value};

use common::{all, collecting_sink, first, is_claimed, runtime};

#[test]
fn repeated_children_bind_every_unclaimed_node_in_order() {
    let rt = runtime(
        "<x-ledger>\
           <row></row><row data-claimed></row><row></row>\
           <row></row><row data-claimed></row><row></row><row></row>\
         </x-ledger>",
        vec![
            ComponentDefinition::new("Row"),
            ComponentDefinition::new("XLedger").repeated("Row"),
        ],
    );
    let rows = all(rt.host(), "row");
    let unclaimed: Vec<_> = rows
        .iter()
        .copied()
        .filter(|n| !is_claimed(rt.host(), *n))
        .collect();
    assert_eq!(unclaimed.len(), 5);

    let ledger = rt.mount("XLedger", &Value::Null).expect("mount");
    let built: Vec<_> = ledger.children("$rows").iter().map(|r| r.node()).collect();
    assert_eq!(built, unclaimed);
    assert!(rows.iter().all(|n| is_claimed(rt.host(), *n)));
}

#[test]
fn repeated_children_with_no_matches_yield_empty_sequence() {
    let rt = runtime(
        "<x-ledger></x-ledger>",
        vec![
            ComponentDefinition::new("Row"),
            ComponentDefinition::new("XLedger").repeated("Row"),
        ],
    );
    let ledger = rt.mount("XLedger", &Value::Null).expect("mount");
    assert!(ledger.field("$rows").expect("field assigned").is_empty());
}

#[test]
fn earlier_subtrees_shrink_later_sibling_pools() {
    let rt = runtime(
        "<x-wallet><x-panel><x-badge></x-badge></x-panel><x-badge></x-badge></x-wallet>",
        vec![
            ComponentDefinition::new("XBadge"),
            ComponentDefinition::new("XPanel").child("XBadge"),
            ComponentDefinition::new("XWallet")
                .child("XPanel")
                .child("XBadge"),
        ],
    );
    let badges = all(rt.host(), "x-badge");
    let wallet = rt.mount("XWallet", &Value::Null).expect("mount");

    let panel = wallet.child("$panel").expect("panel");
    assert_eq!(panel.child("$badge").expect("nested badge").node(), badges[0]);
    assert_eq!(wallet.child("$badge").expect("wallet badge").node(), badges[1]);
    assert_eq!(
        wallet.field_names().collect::<Vec<_>>(),
        vec!["$panel", "$badge"]
    );
}

#[test]
fn first_match_wins_and_missing_singular_child_aborts_construction() {
    let rt = runtime(
        "<x-wallet><x-panel><x-badge></x-badge></x-panel><x-badge></x-badge></x-wallet>",
        vec![
            ComponentDefinition::new("XBadge"),
            ComponentDefinition::new("XPanel").child("XBadge"),
            ComponentDefinition::new("XWallet")
                .child("XBadge")
                .child("XPanel"),
        ],
    );
    // The wallet's own badge takes the nested one, leaving the panel without a match.
    let err = rt.mount("XWallet", &Value::Null).expect_err("panel badge missing");
    match err {
        RuntimeError::Binding(binding) => {
            assert_eq!(binding.tag, "x-badge");
            assert!(binding.parent.contains("<x-panel>"), "{}", binding.parent);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn creation_hook_runs_after_children_with_constructor_args() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let hook_seen = Arc::clone(&seen);
    let rt = runtime(
        "<x-account-list><x-account-row></x-account-row></x-account-list>",
        vec![
            ComponentDefinition::new("XAccountRow"),
            ComponentDefinition::new("XAccountList")
                .repeated("XAccountRow")
                .on_create(move |instance, args| {
                    hook_seen.lock().expect("hook").push((
                        instance.children("$accountRows").len(),
                        args.clone(),
                    ));
                }),
        ],
    );
    rt.mount("XAccountList", &json!({"chainId": 1}))
        .expect("mount");
    assert_eq!(
        *seen.lock().expect("hook"),
        vec![(1, json!({"chainId": 1}))]
    );
}

#[test]
fn rebuild_section_appends_newly_available_nodes() {
    let rt = runtime(
        "<x-ledger><row></row></x-ledger>",
        vec![
            ComponentDefinition::new("Row").styles(["row"]),
            ComponentDefinition::new("XLedger").repeated("Row"),
        ],
    );
    let mut ledger = rt.mount("XLedger", &Value::Null).expect("mount");
    assert_eq!(ledger.children("$rows").len(), 1);

    rt.host()
        .append_markup(ledger.node(), "<row></row><row></row>")
        .expect("append rows");
    let added = rt.rebuild_section(&mut ledger, "Row").expect("rebuild");
    assert_eq!(added, 2);
    assert_eq!(ledger.children("$rows").len(), 3);
    for row in ledger.children("$rows") {
        assert_eq!(rt.host().styles(row.node()).expect("styles"), vec!["row"]);
    }

    let added = rt.rebuild_section(&mut ledger, "Row").expect("rebuild noop");
    assert_eq!(added, 0);
    assert_eq!(ledger.children("$rows").len(), 3);
}

#[test]
fn rebuild_section_failure_leaves_owner_untouched() {
    let rt = runtime(
        "<x-ledger><row></row></x-ledger>",
        vec![
            ComponentDefinition::new("Cell"),
            ComponentDefinition::new("Row").child("Cell"),
            ComponentDefinition::new("XLedger").repeated("Row"),
        ],
    );
    // The initial row lacks a cell, so the whole mount fails.
    assert!(rt.mount("XLedger", &Value::Null).is_err());

    let rt = runtime(
        "<x-ledger><row><cell></cell></row></x-ledger>",
        vec![
            ComponentDefinition::new("Cell"),
            ComponentDefinition::new("Row").child("Cell"),
            ComponentDefinition::new("XLedger").repeated("Row"),
        ],
    );
    let mut ledger = rt.mount("XLedger", &Value::Null).expect("mount");
    rt.host()
        .append_markup(ledger.node(), "<row></row>")
        .expect("append broken row");
    let err = rt
        .rebuild_section(&mut ledger, "Row")
        .expect_err("broken row");
    assert!(err.is_binding());
    assert_eq!(ledger.children("$rows").len(), 1);

    let err = rt
        .rebuild_section(&mut ledger, "Cell")
        .expect_err("not a repeated child");
    assert!(matches!(err, RuntimeError::UnknownChild { .. }));
}

#[test]
fn rebuild_section_failure_releases_claims_for_a_later_retry() {
    let rt = runtime(
        "<x-ledger><row><cell></cell></row></x-ledger>",
        vec![
            ComponentDefinition::new("Cell"),
            ComponentDefinition::new("Row").styles(["row"]).child("Cell"),
            ComponentDefinition::new("XLedger").repeated("Row"),
        ],
    );
    let mut ledger = rt.mount("XLedger", &Value::Null).expect("mount");
    let document = rt.host();
    document
        .append_markup(ledger.node(), "<row><cell></cell></row><row></row>")
        .expect("append rows");

    let err = rt
        .rebuild_section(&mut ledger, "Row")
        .expect_err("second new row has no cell");
    assert!(err.is_binding());
    assert_eq!(ledger.children("$rows").len(), 1);

    let rows = all(document, "row");
    let cells = all(document, "cell");
    assert_eq!(
        rows.iter().map(|r| is_claimed(document, *r)).collect::<Vec<_>>(),
        vec![true, false, false]
    );
    assert_eq!(
        cells.iter().map(|c| is_claimed(document, *c)).collect::<Vec<_>>(),
        vec![true, false]
    );
    assert!(document.styles(rows[1]).expect("styles").is_empty());

    document
        .append_markup(rows[2], "<cell></cell>")
        .expect("repair row");
    let added = rt.rebuild_section(&mut ledger, "Row").expect("retry");
    assert_eq!(added, 2);
    assert_eq!(ledger.children("$rows").len(), 3);
    for row in all(document, "row") {
        assert!(is_claimed(document, row));
        assert_eq!(document.styles(row).expect("styles"), vec!["row"]);
    }
}

#[test]
fn failed_construction_keeps_styles_the_node_already_had() {
    let rt = runtime(
        r#"<x-ledger class="row"></x-ledger>"#,
        vec![
            ComponentDefinition::new("Cell"),
            ComponentDefinition::new("XLedger")
                .styles(["row", "ledger"])
                .child("Cell"),
        ],
    );
    assert!(rt.mount("XLedger", &Value::Null).is_err());
    let ledger = first(rt.host(), "x-ledger");
    assert!(!is_claimed(rt.host(), ledger));
    assert_eq!(rt.host().styles(ledger).expect("styles"), vec!["row"]);
}

#[test]
fn children_built_diagnostics_follow_declaration_order() {
    let (sink, seen) = collecting_sink();
    let rt = runtime(
        "<x-shell><x-header></x-header><row></row><row></row></x-shell>",
        vec![
            ComponentDefinition::new("XHeader"),
            ComponentDefinition::new("Row"),
            ComponentDefinition::new("XShell").child("XHeader").repeated("Row"),
        ],
    )
    .with_diagnostics(sink);
    rt.mount("XShell", &Value::Null).expect("mount");

    let built: Vec<_> = seen
        .lock()
        .expect("diagnostics")
        .iter()
        .filter_map(|d| match d {
            Diagnostic::ChildrenBuilt { field, count, .. } => Some((field.clone(), *count)),
            _ => None,
        })
        .collect();
    assert_eq!(
        built,
        vec![("$header".to_owned(), 1), ("$rows".to_owned(), 2)]
    );
    assert!(is_claimed(rt.host(), first(rt.host(), "x-header")));
}
