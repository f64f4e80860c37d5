#![allow(
    clippy::unwrap_used,
    clippy::tests_outside_test_module,
    reason = "integration tests unwrap freely and live outside test modules"
)]

use actions::{
    ActionBatch, ActionKind, ChangeAction, ElementId, HookKind, PageId, ProtocolError, APPEND_INDEX,
    decode_actions, decode_batch, encode_batch,
};
use serde_json::json;

#[test]
fn nested_unknown_kind_rejects_whole_batch() {
    let text = json!({
        "page": 1,
        "actions": [
            { "kind": "preCreateBody" },
            { "kind": "add", "targetId": 1, "parentId": -2, "tagName": "div",
              "children": [ { "kind": "explode", "targetId": 2 } ] }
        ]
    })
    .to_string();
    assert!(matches!(
        decode_batch(&text),
        Err(ProtocolError::UnknownActionKind(name)) if name == "explode"
    ));
}

#[test]
fn missing_fields_take_protocol_defaults() {
    let actions = decode_actions(r#"[{"kind":"add","targetId":7,"parentId":-2,"tagName":"text"}]"#).unwrap();
    assert_eq!(actions.len(), 1);
    let add = &actions[0];
    assert_eq!(add.kind, ActionKind::Add);
    assert_eq!(add.index, APPEND_INDEX);
    assert!(add.attributes.is_empty());
    assert!(add.children.is_empty());
    assert!(add.extra.is_null());
}

#[test]
fn batch_preserves_children_and_attribute_order() {
    let tree = ChangeAction::add(ElementId::BODY, 0, ElementId(1), "list")
        .with_attr("zeta", "1")
        .with_attr("alpha", "2")
        .with_hook(HookKind::Mounted)
        .with_child(ChangeAction::add(ElementId(1), APPEND_INDEX, ElementId(3), "list-item"))
        .with_child(ChangeAction::add(ElementId(1), APPEND_INDEX, ElementId(2), "list-item"))
        .with_extra(json!({ "trace": "abc" }));
    let batch = ActionBatch::new(PageId(4), vec![tree.clone(), ChangeAction::remove(ElementId(1))]);

    let text = encode_batch(&batch).unwrap();
    let decoded = decode_batch(&text).unwrap();
    assert_eq!(decoded, batch);

    let keys: Vec<&str> = decoded.actions[0].attributes.keys().collect();
    assert_eq!(keys, vec!["zeta", "alpha"]);
    let child_ids: Vec<i64> = decoded.actions[0].children.iter().map(|child| child.target_id.0).collect();
    assert_eq!(child_ids, vec![3, 2]);
}

#[test]
fn missing_kind_is_reported() {
    assert!(matches!(decode_actions(r#"[{"targetId":1}]"#), Err(ProtocolError::MissingKind)));
}

#[test]
fn decoding_keeps_the_sender_attribute_order() {
    let text = r#"{"page":2,"actions":[{"kind":"updateAttrs","targetId":5,
        "attributes":{"value":"3","type":"range","max":"10","id":"knob"},
        "styles":{"width":"4px","color":"red"},
        "extra":{"zulu":1,"alpha":2}}]}"#;
    let decoded = decode_batch(text).unwrap();
    let update = &decoded.actions[0];
    let attrs: Vec<&str> = update.attributes.keys().collect();
    assert_eq!(attrs, vec!["value", "type", "max", "id"]);
    let styles: Vec<&str> = update.styles.keys().collect();
    assert_eq!(styles, vec!["width", "color"]);
    let extra: Vec<&String> = update.extra.as_object().unwrap().keys().collect();
    assert_eq!(extra, vec!["zulu", "alpha"]);
}
