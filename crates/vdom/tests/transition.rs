#![allow(
    clippy::unwrap_used,
    clippy::tests_outside_test_module,
    reason = "integration tests unwrap freely and live outside test modules"
)]

use actions::PageId;
use std::sync::{Arc, Mutex};
use vdom::headless::{DEFAULT_WINDOW_WIDTH, HeadlessKit};
use vdom::{
    Document, DocumentHost, DocumentOptions, PaneLayout, PaneRole, Transform, TransitionError, TransitionListener,
    TransitionRequest, TransitionState, WindowMode,
};

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<(&'static str, TransitionState)>>>);

impl Recorder {
    fn entries(&self) -> Vec<(&'static str, TransitionState)> {
        self.0.lock().unwrap().clone()
    }
}

impl TransitionListener for Recorder {
    fn on_start(&mut self, state: TransitionState) {
        self.0.lock().unwrap().push(("start", state));
    }

    fn on_end(&mut self, state: TransitionState) {
        self.0.lock().unwrap().push(("end", state));
    }
}

fn animated(mode: WindowMode, role: PaneRole) -> TransitionRequest {
    TransitionRequest {
        mode,
        role,
        animated: true,
    }
}

fn instant() -> TransitionRequest {
    TransitionRequest::default()
}

fn page(kit: &HeadlessKit, id: u32) -> Document {
    kit.document(PageId(id), DocumentOptions::default()).unwrap()
}

#[test]
fn animated_open_and_close() {
    let kit = HeadlessKit::new();
    let mut document = page(&kit, 1);
    let root = document.root_handle().unwrap();
    let recorder = Recorder::default();

    document
        .open(animated(WindowMode::Single, PaneRole::Secondary), Some(Box::new(recorder.clone())))
        .unwrap();
    assert_eq!(document.transition_state(), TransitionState::Attaching);
    assert_eq!(kit.window.children(), vec![root]);
    let opening = kit.animator.last().unwrap();
    assert_eq!(
        kit.animator.bounds(opening),
        Some((Transform::shifted_x(DEFAULT_WINDOW_WIDTH), Transform::IDENTITY))
    );

    assert!(document.animation_finished(opening));
    assert_eq!(document.transition_state(), TransitionState::Attached);
    assert_eq!(kit.window.transform(root), Some(Transform::IDENTITY));
    assert_eq!(
        recorder.entries(),
        vec![("start", TransitionState::Attaching), ("end", TransitionState::Attached)]
    );

    document.close(true, Some(Box::new(recorder.clone()))).unwrap();
    assert_eq!(document.transition_state(), TransitionState::Detaching);
    assert_eq!(kit.window.focus_clears(), 1);
    assert_eq!(kit.window.children(), vec![root]);
    let closing = kit.animator.last().unwrap();
    assert_ne!(closing, opening);

    assert!(document.animation_finished(closing));
    assert_eq!(document.transition_state(), TransitionState::Closed);
    assert!(kit.window.children().is_empty());
    assert_eq!(recorder.entries().last(), Some(&("end", TransitionState::Closed)));
}

#[test]
fn unanimated_transitions_complete_immediately() {
    let kit = HeadlessKit::new();
    let mut document = page(&kit, 1);
    let recorder = Recorder::default();

    document.open(instant(), Some(Box::new(recorder.clone()))).unwrap();
    assert_eq!(document.transition_state(), TransitionState::Attached);
    assert!(kit.animator.last().is_none());
    assert_eq!(
        recorder.entries(),
        vec![("start", TransitionState::Attaching), ("end", TransitionState::Attached)]
    );

    document.close(false, None).unwrap();
    assert_eq!(document.transition_state(), TransitionState::Closed);
    assert!(kit.window.children().is_empty());
}

#[test]
fn abort_jumps_to_the_terminal_state() {
    let kit = HeadlessKit::new();
    let mut document = page(&kit, 1);
    let recorder = Recorder::default();
    document
        .open(animated(WindowMode::Single, PaneRole::Secondary), Some(Box::new(recorder.clone())))
        .unwrap();
    let opening = kit.animator.last().unwrap();

    assert!(document.abort_transition());
    assert_eq!(document.transition_state(), TransitionState::Attached);
    assert_eq!(kit.animator.cancelled(), vec![opening]);
    assert_eq!(recorder.entries().last(), Some(&("end", TransitionState::Attached)));

    assert!(!document.animation_finished(opening));
    assert!(!document.abort_transition());
}

#[test]
fn transitions_reject_invalid_states() {
    let kit = HeadlessKit::new();
    let mut document = page(&kit, 1);
    assert_eq!(
        document.close(false, None),
        Err(TransitionError::InvalidState {
            operation: "detach",
            state: TransitionState::Closed,
        })
    );

    document
        .open(animated(WindowMode::Single, PaneRole::Secondary), None)
        .unwrap();
    assert!(matches!(
        document.open(instant(), None),
        Err(TransitionError::InvalidState { operation: "attach", .. })
    ));
    assert!(matches!(
        document.bring_to_front(false, None),
        Err(TransitionError::InvalidState { operation: "move", .. })
    ));
}

#[test]
fn opening_without_a_window_fails() {
    let kit = HeadlessKit::new();
    let host: DocumentHost = kit.document_host();
    let mut document = Document::new(PageId(1), host, DocumentOptions::default()).unwrap();
    assert!(!document.is_ready());
    assert_eq!(document.open(instant(), None), Err(TransitionError::NoWindow));
    assert_eq!(document.transition_state(), TransitionState::Closed);
}

#[test]
fn primary_pane_is_placed_beneath_secondary_pages() {
    let kit = HeadlessKit::new();
    let mode = WindowMode::MultiPane {
        layout: PaneLayout::Shopping,
        pane_width: 200.0,
    };
    let mut detail = page(&kit, 1);
    let mut home = page(&kit, 2);

    detail.open(animated(mode, PaneRole::Secondary), None).unwrap();
    let sliding = kit.animator.last().unwrap();
    assert_eq!(
        kit.animator.bounds(sliding),
        Some((Transform::shifted_x(200.0), Transform::IDENTITY))
    );
    assert!(detail.animation_finished(sliding));

    home.open(animated(mode, PaneRole::Primary), None).unwrap();
    assert_eq!(home.transition_state(), TransitionState::Attached);
    assert_eq!(
        kit.window.children(),
        vec![home.root_handle().unwrap(), detail.root_handle().unwrap()]
    );

    home.close(true, None).unwrap();
    let fading = kit.animator.last().unwrap();
    assert_eq!(kit.animator.bounds(fading), Some((Transform::IDENTITY, Transform::faded())));
}

#[test]
fn navigation_layout_fades_secondary_pages_in() {
    let kit = HeadlessKit::new();
    let mode = WindowMode::MultiPane {
        layout: PaneLayout::Navigation,
        pane_width: 320.0,
    };
    let mut document = page(&kit, 1);
    document.open(animated(mode, PaneRole::Secondary), None).unwrap();
    let fading = kit.animator.last().unwrap();
    assert_eq!(kit.animator.bounds(fading), Some((Transform::faded(), Transform::IDENTITY)));
}

#[test]
fn bring_to_front_raises_the_page() {
    let kit = HeadlessKit::new();
    let mut first = page(&kit, 1);
    let mut second = page(&kit, 2);
    first.open(instant(), None).unwrap();
    second.open(instant(), None).unwrap();
    let (first_root, second_root) = (first.root_handle().unwrap(), second.root_handle().unwrap());
    assert_eq!(kit.window.children(), vec![first_root, second_root]);

    first.bring_to_front(false, None).unwrap();
    assert_eq!(kit.window.children(), vec![second_root, first_root]);
    assert_eq!(first.transition_state(), TransitionState::Attached);
}
