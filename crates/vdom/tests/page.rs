#![allow(
    clippy::unwrap_used,
    clippy::tests_outside_test_module,
    reason = "integration tests unwrap freely and live outside test modules"
)]

use actions::{ActionKind, ChangeAction, ElementId, HookKind, PageId};
use serde_json::json;
use vdom::headless::{DelegateCall, HeadlessKit};
use vdom::{Document, DocumentOptions, ScrollRequest, apply};

fn setup() -> (HeadlessKit, Document) {
    let kit = HeadlessKit::new();
    let document = kit.document(PageId(3), DocumentOptions::default()).unwrap();
    (kit, document)
}

#[test]
fn create_finish_notifies_the_delegate_once() {
    let (kit, mut document) = setup();
    let finish = ChangeAction::new(ActionKind::CreateFinish).with_hook(HookKind::PageCreateFinished);
    apply(&mut document, finish.clone()).unwrap();
    apply(&mut document, finish).unwrap();

    assert!(document.create_finished());
    assert_eq!(kit.delegate.calls(), vec![DelegateCall::PageCreated(PageId(3))]);
    let events = kit.sink.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|event| {
        event.hook == HookKind::PageCreateFinished && event.element == ElementId::DOCUMENT && event.page == PageId(3)
    }));
}

#[test]
fn update_finish_only_fires_when_requested() {
    let (kit, mut document) = setup();
    apply(&mut document, ChangeAction::new(ActionKind::UpdateFinish)).unwrap();
    assert!(kit.sink.events().is_empty());

    apply(
        &mut document,
        ChangeAction::new(ActionKind::UpdateFinish).with_hook(HookKind::PageUpdateFinished),
    )
    .unwrap();
    assert_eq!(kit.sink.events().len(), 1);
}

#[test]
fn chrome_actions_reach_the_delegate() {
    let (kit, mut document) = setup();
    apply(
        &mut document,
        ChangeAction::add(ElementId::BODY, -1, ElementId(4), "text"),
    )
    .unwrap();
    let actions = [
        ChangeAction::new(ActionKind::UpdateTitleBar).with_attr("title", "Cart"),
        ChangeAction::new(ActionKind::UpdateStatusBar).with_attr("style", "dark"),
        ChangeAction::new(ActionKind::ExitFullscreen),
        ChangeAction::new(ActionKind::SetSecure).with_attr("secure", "no"),
        ChangeAction::new(ActionKind::ScrollTo)
            .targeting(ElementId(4))
            .with_attr("top", "120")
            .with_attr("behavior", "smooth"),
        ChangeAction::new(ActionKind::ScrollTo)
            .targeting(ElementId(99))
            .with_attr("left", "8"),
    ];
    for action in actions {
        apply(&mut document, action).unwrap();
    }

    let calls = kit.delegate.calls();
    assert_eq!(calls.len(), 6);
    assert!(matches!(&calls[0], DelegateCall::TitleBar(attrs) if attrs.get("title") == Some("Cart")));
    assert!(matches!(&calls[1], DelegateCall::StatusBar(attrs) if attrs.get("style") == Some("dark")));
    assert_eq!(calls[2], DelegateCall::ExitFullscreen);
    assert_eq!(calls[3], DelegateCall::Secure(false));
    assert_eq!(
        calls[4],
        DelegateCall::ScrollTo(ScrollRequest {
            target: Some(ElementId(4)),
            top: Some(120.0),
            left: None,
            smooth: true,
        })
    );
    assert_eq!(
        calls[5],
        DelegateCall::ScrollTo(ScrollRequest {
            target: None,
            top: None,
            left: Some(8.0),
            smooth: false,
        })
    );
}

#[test]
fn delegate_actions_without_a_delegate_are_dropped() {
    let kit = HeadlessKit::new();
    let host = vdom::DocumentHost::new(Box::new(kit.host.factory()), Box::new(kit.sink.clone()));
    let mut document = Document::new(PageId(1), host, DocumentOptions::default()).unwrap();

    apply(&mut document, ChangeAction::new(ActionKind::ExitFullscreen)).unwrap();
    let stats = document.stats();
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.applied, 0);
}

#[test]
fn statistics_forward_clicks_on_known_elements() {
    let (kit, mut document) = setup();
    apply(
        &mut document,
        ChangeAction::add(ElementId::BODY, -1, ElementId(4), "image"),
    )
    .unwrap();
    let stats = ChangeAction::new(ActionKind::Statistics).with_extra(json!({
        "events": [
            {"type": "click", "ref": 4},
            {"type": "click", "ref": "77"},
            {"type": "expose", "ref": 4},
            {"type": "click", "ref": "4"}
        ]
    }));
    apply(&mut document, stats).unwrap();

    let clicks = kit.telemetry.clicks();
    assert_eq!(clicks.len(), 2);
    let handle = document.element(ElementId(4)).unwrap().render_handle();
    for click in clicks {
        assert_eq!(click.page, PageId(3));
        assert_eq!(click.element, ElementId(4));
        assert_eq!(click.tag, "image");
        assert_eq!(click.handle, handle);
        assert_eq!(click.event, "click");
    }
}

#[test]
fn hide_skeleton_is_idempotent_and_wins_over_the_host() {
    let (kit, mut document) = setup();
    assert!(document.host_hide_skeleton());

    apply(&mut document, ChangeAction::new(ActionKind::HideSkeleton)).unwrap();
    apply(&mut document, ChangeAction::new(ActionKind::HideSkeleton)).unwrap();
    assert!(document.hide_skeleton_requested());
    assert!(!document.host_hide_skeleton());

    let hides = kit
        .delegate
        .calls()
        .into_iter()
        .filter(|call| *call == DelegateCall::HideSkeleton)
        .count();
    assert_eq!(hides, 2);
}

#[test]
fn snapshot_lists_elements_in_pre_order() {
    let (_kit, mut document) = setup();
    apply(
        &mut document,
        ChangeAction::add(ElementId::BODY, -1, ElementId(1), "div")
            .with_child(ChangeAction::add(ElementId(1), -1, ElementId(2), "text")),
    )
    .unwrap();
    apply(
        &mut document,
        ChangeAction::add(ElementId::BODY, -1, ElementId(3), "span"),
    )
    .unwrap();

    let ids: Vec<ElementId> = document.snapshot().into_iter().map(|snapshot| snapshot.id).collect();
    assert_eq!(
        ids,
        vec![ElementId::DOCUMENT, ElementId::BODY, ElementId(1), ElementId(2), ElementId(3)]
    );
}
