#![allow(
    clippy::unwrap_used,
    clippy::tests_outside_test_module,
    reason = "integration tests unwrap freely and live outside test modules"
)]

use actions::{AttrMap, ChangeAction, ElementId, HookKind, PageId};
use vdom::headless::HeadlessKit;
use vdom::{Document, DocumentOptions, RenderHandle, ShapeKey, apply};

const LIST: ElementId = ElementId(10);

fn handle(document: &Document, id: i64) -> RenderHandle {
    document.element(ElementId(id)).unwrap().render_handle().unwrap()
}

fn row(index: i64) -> ChangeAction {
    let id = ElementId(100 + index);
    ChangeAction::add(LIST, -1, id, "list-item").with_child(
        ChangeAction::add(id, -1, ElementId(1000 + index), "text").with_attr("value", index.to_string()),
    )
}

fn input_row(index: i64, kind: &str) -> ChangeAction {
    ChangeAction::add(LIST, -1, ElementId(200 + index), "input").with_attr("type", kind)
}

fn list_document(kit: &HeadlessKit, options: DocumentOptions) -> Document {
    let mut document = kit.document(PageId(1), options).unwrap();
    apply(&mut document, ChangeAction::add(ElementId::BODY, -1, LIST, "list")).unwrap();
    document
}

fn hundred_rows() -> (HeadlessKit, Document) {
    let kit = HeadlessKit::new();
    let mut document = list_document(&kit, DocumentOptions::default());
    for index in 0..100 {
        apply(&mut document, row(index)).unwrap();
    }
    (kit, document)
}

#[test]
fn only_the_visible_window_is_constructed() {
    let (kit, document) = hundred_rows();
    assert_eq!(kit.host.constructed("list-item"), 12);
    assert_eq!(kit.host.constructed("text"), 12);
    assert_eq!(document.recycler(LIST).unwrap().constructed(), 24);

    let visible: Vec<RenderHandle> = (100..112).map(|id| handle(&document, id)).collect();
    assert_eq!(kit.host.children_of(handle(&document, LIST.0)), visible);
    assert!(!document.element(ElementId(112)).unwrap().is_realized());
    assert!(!document.element(ElementId(1012)).unwrap().is_realized());
    assert_eq!(document.registry().len(), 2 + 1 + 200);
}

#[test]
fn scrolling_reuses_pooled_renderables() {
    let (kit, mut document) = hundred_rows();
    let before = kit.host.total_constructed();

    assert!(document.set_visible_range(LIST, 50..62));
    assert_eq!(kit.host.total_constructed(), before);

    let visible: Vec<RenderHandle> = (150..162).map(|id| handle(&document, id)).collect();
    assert_eq!(kit.host.children_of(handle(&document, LIST.0)), visible);
    assert!(!document.element(ElementId(100)).unwrap().is_realized());

    let text = kit.host.node(handle(&document, 1050)).unwrap();
    assert_eq!(text.attrs.get("value"), Some("50"));
    let row = handle(&document, 150);
    assert_eq!(kit.host.children_of(row), vec![handle(&document, 1050)]);
}

#[test]
fn set_visible_range_ignores_plain_containers() {
    let (_kit, mut document) = hundred_rows();
    assert!(!document.set_visible_range(ElementId::BODY, 0..3));
    assert!(!document.set_visible_range(ElementId(100), 0..3));
}

#[test]
fn removing_a_visible_row_pulls_the_next_one_in() {
    let (kit, mut document) = hundred_rows();
    apply(&mut document, ChangeAction::remove(ElementId(100))).unwrap();

    assert!(!document.registry().contains(ElementId(100)));
    assert!(!document.registry().contains(ElementId(1000)));
    assert!(document.element(ElementId(112)).unwrap().is_realized());
    assert_eq!(kit.host.constructed("list-item"), 12);
    let visible: Vec<RenderHandle> = (101..113).map(|id| handle(&document, id)).collect();
    assert_eq!(kit.host.children_of(handle(&document, LIST.0)), visible);
}

#[test]
fn moving_rows_within_the_list_keeps_host_order() {
    let (kit, mut document) = hundred_rows();
    apply(&mut document, ChangeAction::move_to(ElementId(150), LIST, 0)).unwrap();

    assert!(document.element(ElementId(150)).unwrap().is_realized());
    assert!(!document.element(ElementId(111)).unwrap().is_realized());
    let mut expected = vec![handle(&document, 150)];
    expected.extend((100..111).map(|id| handle(&document, id)));
    assert_eq!(kit.host.children_of(handle(&document, LIST.0)), expected);
    assert_eq!(kit.host.constructed("list-item"), 12);
}

#[test]
fn moving_a_row_out_of_the_list_renders_it_directly() {
    let (kit, mut document) = hundred_rows();
    apply(&mut document, ChangeAction::move_to(ElementId(105), ElementId::BODY, -1)).unwrap();

    let moved = document.element(ElementId(105)).unwrap();
    assert_eq!(moved.item_container(), None);
    assert_eq!(moved.parent(), Some(ElementId::BODY));
    assert_eq!(kit.host.constructed("list-item"), 13);
    assert_eq!(
        kit.host.children_of(handle(&document, ElementId::BODY.0)),
        vec![handle(&document, LIST.0), handle(&document, 105)]
    );
    assert_eq!(
        kit.host.node(handle(&document, 1005)).unwrap().attrs.get("value"),
        Some("5")
    );
    assert!(document.element(ElementId(112)).unwrap().is_realized());
}

#[test]
fn shape_change_only_builds_the_new_shape() {
    let kit = HeadlessKit::new();
    let options = DocumentOptions {
        recycler_window: 2,
        ..DocumentOptions::default()
    };
    let mut document = list_document(&kit, options);
    for (index, kind) in (0..).zip(["text", "number", "text", "number"]) {
        apply(&mut document, input_row(index, kind)).unwrap();
    }
    assert!(document.set_visible_range(LIST, 2..4));
    assert_eq!(kit.host.constructed("input.text"), 1);
    assert_eq!(kit.host.constructed("input.number"), 1);

    apply(
        &mut document,
        ChangeAction::update_attrs(ElementId(202)).with_attr("type", "number"),
    )
    .unwrap();
    assert_eq!(kit.host.constructed("input.number"), 2);
    assert_eq!(kit.host.constructed("input.text"), 1);
    assert_eq!(document.element(ElementId(202)).unwrap().class().name, "input.number");
    assert_eq!(
        kit.host.children_of(handle(&document, LIST.0)),
        vec![handle(&document, 202), handle(&document, 203)]
    );

    let pool = document.recycler(LIST).unwrap();
    let number = pool.template(&ShapeKey("input|type=number".to_owned())).unwrap();
    assert_eq!(number.bound(), 3);
    assert_eq!(number.in_use(), 2);
    let text = pool.template(&ShapeKey("input|type=text".to_owned())).unwrap();
    assert_eq!(text.bound(), 1);
    assert_eq!(text.idle(), 1);
}

#[test]
fn pooled_renderables_of_the_wrong_class_are_discarded() {
    let kit = HeadlessKit::new();
    let host = kit
        .document_host()
        .with_classifier(Box::new(|_tag: &str, _attrs: &AttrMap| ShapeKey("row".to_owned())));
    let options = DocumentOptions {
        recycler_window: 1,
        ..DocumentOptions::default()
    };
    let mut document = Document::new(PageId(1), host, options).unwrap();
    apply(&mut document, ChangeAction::add(ElementId::BODY, -1, LIST, "list")).unwrap();
    apply(&mut document, input_row(0, "text")).unwrap();
    apply(&mut document, input_row(1, "number")).unwrap();
    let first = handle(&document, 200);

    assert!(document.set_visible_range(LIST, 1..2));
    assert!(kit.host.node(first).unwrap().destroyed);
    assert_eq!(kit.host.constructed("input.number"), 1);
    assert_eq!(
        kit.host.node(handle(&document, 201)).unwrap().class,
        "input.number"
    );
}

#[test]
fn removing_the_list_destroys_its_pool() {
    let (kit, mut document) = hundred_rows();
    assert!(document.set_visible_range(LIST, 20..32));
    apply(&mut document, ChangeAction::remove(LIST)).unwrap();

    assert!(document.recycler(LIST).is_none());
    assert_eq!(document.registry().len(), 2);
    assert_eq!(kit.host.live(), 2);
}

#[test]
fn dropping_the_document_destroys_every_renderable() {
    let (kit, mut document) = hundred_rows();
    assert!(document.set_visible_range(LIST, 40..52));
    assert!(kit.host.live() > 0);
    drop(document);
    assert_eq!(kit.host.live(), 0);
}

#[test]
fn moving_across_the_list_boundary_does_not_mount_again() {
    let kit = HeadlessKit::new();
    let mut document = list_document(&kit, DocumentOptions::default());
    let card = ChangeAction::add(ElementId::BODY, -1, ElementId(7), "div")
        .with_hook(HookKind::Mounted)
        .with_child(ChangeAction::add(ElementId(7), -1, ElementId(8), "text").with_hook(HookKind::Mounted));
    apply(&mut document, card).unwrap();
    assert_eq!(kit.sink.take().len(), 2);

    apply(&mut document, ChangeAction::move_to(ElementId(7), LIST, -1)).unwrap();
    assert!(kit.sink.events().is_empty());
    assert_eq!(document.element(ElementId(7)).unwrap().item_container(), Some(LIST));

    apply(&mut document, ChangeAction::move_to(ElementId(7), ElementId::BODY, 0)).unwrap();
    assert!(kit.sink.events().is_empty());
    assert!(document.element(ElementId(8)).unwrap().is_realized());
    assert_eq!(document.element(ElementId::BODY).unwrap().children()[0], ElementId(7));
    assert_eq!(document.stats().dropped, 0);
}
