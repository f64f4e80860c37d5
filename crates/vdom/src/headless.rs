//! In-memory collaborators.
//!
//! Every collaborator shares its state behind an `Arc<Mutex<_>>`, so a clone
//! kept by a test or the replay tool can observe what the document did after
//! the originals were moved into a [`crate::DocumentHost`].

use crate::document::{Document, DocumentHost, DocumentOptions};
use crate::error::FactoryError;
use crate::host::{
    AnimationId, Animator, CallbackSink, ClickRecord, ComponentClass, ElementFactory, HostSurface, PageDelegate,
    RenderHandle, Renderable, ScrollRequest, TelemetrySink, WindowSurface,
};
use crate::transition::Transform;
use actions::{AttrMap, ElementId, HookEvent, PageId};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<Inner>(mutex: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One call made on a headless renderable, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    Create {
        handle: RenderHandle,
        class: String,
        element: ElementId,
    },
    Insert {
        parent: RenderHandle,
        child: RenderHandle,
        index: usize,
    },
    Remove {
        parent: RenderHandle,
        child: RenderHandle,
    },
    Reorder {
        parent: RenderHandle,
        child: RenderHandle,
        index: usize,
    },
    Attrs {
        handle: RenderHandle,
        attrs: AttrMap,
    },
    Styles {
        handle: RenderHandle,
        styles: AttrMap,
    },
    BindEvent {
        handle: RenderHandle,
        event: String,
    },
    UnbindEvent {
        handle: RenderHandle,
        event: String,
    },
    Recycle {
        handle: RenderHandle,
    },
    Destroy {
        handle: RenderHandle,
    },
}

/// Current state of one headless renderable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostNode {
    pub class: String,
    /// Element the renderable was constructed for; pooled objects keep
    /// serving other elements afterwards.
    pub element: ElementId,
    pub attrs: AttrMap,
    pub styles: AttrMap,
    pub events: BTreeSet<String>,
    pub children: Vec<RenderHandle>,
    pub destroyed: bool,
}

#[derive(Debug, Default)]
struct HostState {
    next_handle: u64,
    ops: Vec<HostOp>,
    nodes: HashMap<RenderHandle, HostNode>,
    constructed: HashMap<String, usize>,
    failing: HashSet<String>,
}

/// Shared handle on the headless host: the factory it hands out and the
/// renderables that factory builds all log into the same state.
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    state: Arc<Mutex<HostState>>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> HeadlessFactory {
        HeadlessFactory {
            state: Arc::clone(&self.state),
        }
    }

    pub fn ops(&self) -> Vec<HostOp> {
        lock(&self.state).ops.clone()
    }

    pub fn clear_ops(&self) {
        lock(&self.state).ops.clear();
    }

    pub fn node(&self, handle: RenderHandle) -> Option<HostNode> {
        lock(&self.state).nodes.get(&handle).cloned()
    }

    pub fn children_of(&self, handle: RenderHandle) -> Vec<RenderHandle> {
        lock(&self.state)
            .nodes
            .get(&handle)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Constructions of `class` so far.
    pub fn constructed(&self, class: &str) -> usize {
        lock(&self.state).constructed.get(class).copied().unwrap_or_default()
    }

    pub fn total_constructed(&self) -> usize {
        lock(&self.state).constructed.values().sum()
    }

    /// Renderables built and not yet destroyed.
    pub fn live(&self) -> usize {
        lock(&self.state).nodes.values().filter(|node| !node.destroyed).count()
    }

    /// Make every later construction of `class` fail.
    pub fn fail_class(&self, class: impl Into<String>) {
        lock(&self.state).failing.insert(class.into());
    }
}

/// Tag table of the headless host.
///
/// | tag | class |
/// |---|---|
/// | `document`, `div`, `list-item` | container |
/// | `stack` | container `stack.<type>` (`type` defaults to `vertical`) |
/// | `list` | recyclable container |
/// | `text`, `image`, `span` | leaf |
/// | `input` | leaf `input.<type>` (`type` defaults to `text`) |
#[derive(Debug, Clone)]
pub struct HeadlessFactory {
    state: Arc<Mutex<HostState>>,
}

impl ElementFactory for HeadlessFactory {
    fn resolve(&self, tag: &str, attrs: &AttrMap) -> Option<ComponentClass> {
        match tag {
            "document" | "div" | "list-item" => Some(ComponentClass::container(tag)),
            "stack" => Some(ComponentClass::container(format!(
                "stack.{}",
                attrs.get("type").unwrap_or("vertical")
            ))),
            "list" => Some(ComponentClass::recycler(tag)),
            "text" | "image" | "span" => Some(ComponentClass::leaf(tag)),
            "input" => Some(ComponentClass::leaf(format!(
                "input.{}",
                attrs.get("type").unwrap_or("text")
            ))),
            _ => None,
        }
    }

    fn create(
        &mut self,
        tag: &str,
        _parent: Option<RenderHandle>,
        id: ElementId,
        attrs: &AttrMap,
    ) -> Result<Box<dyn Renderable>, FactoryError> {
        let class = self
            .resolve(tag, attrs)
            .ok_or_else(|| FactoryError::UnknownTag(tag.to_owned()))?;
        let mut state = lock(&self.state);
        if state.failing.contains(&class.name) {
            return Err(FactoryError::Construction {
                class: class.name,
                reason: "construction disabled".to_owned(),
            });
        }
        state.next_handle += 1;
        let handle = RenderHandle(state.next_handle);
        *state.constructed.entry(class.name.clone()).or_default() += 1;
        state.ops.push(HostOp::Create {
            handle,
            class: class.name.clone(),
            element: id,
        });
        state.nodes.insert(
            handle,
            HostNode {
                class: class.name.clone(),
                element: id,
                ..HostNode::default()
            },
        );
        drop(state);

        Ok(Box::new(HeadlessRenderable {
            handle,
            class: class.name,
            container: class.container,
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct HeadlessRenderable {
    handle: RenderHandle,
    class: String,
    container: bool,
    state: Arc<Mutex<HostState>>,
}

impl HeadlessRenderable {
    fn with_node(&self, op: HostOp, update: impl FnOnce(&mut HostNode)) {
        let mut state = lock(&self.state);
        state.ops.push(op);
        if let Some(node) = state.nodes.get_mut(&self.handle) {
            update(node);
        }
    }
}

impl Renderable for HeadlessRenderable {
    fn handle(&self) -> RenderHandle {
        self.handle
    }

    fn class_name(&self) -> &str {
        &self.class
    }

    fn apply_attrs(&mut self, attrs: &AttrMap) {
        self.with_node(
            HostOp::Attrs {
                handle: self.handle,
                attrs: attrs.clone(),
            },
            |node| node.attrs.merge(attrs),
        );
    }

    fn apply_styles(&mut self, styles: &AttrMap) {
        self.with_node(
            HostOp::Styles {
                handle: self.handle,
                styles: styles.clone(),
            },
            |node| node.styles.merge(styles),
        );
    }

    fn bind_event(&mut self, event: &str) {
        self.with_node(
            HostOp::BindEvent {
                handle: self.handle,
                event: event.to_owned(),
            },
            |node| {
                node.events.insert(event.to_owned());
            },
        );
    }

    fn unbind_event(&mut self, event: &str) {
        self.with_node(
            HostOp::UnbindEvent {
                handle: self.handle,
                event: event.to_owned(),
            },
            |node| {
                node.events.remove(event);
            },
        );
    }

    fn surface_mut(&mut self) -> Option<&mut dyn HostSurface> {
        self.container.then_some(self as &mut dyn HostSurface)
    }

    fn recycle(&mut self) {
        self.with_node(HostOp::Recycle { handle: self.handle }, |node| {
            node.attrs = AttrMap::new();
            node.styles = AttrMap::new();
            node.events.clear();
        });
    }

    fn destroy(&mut self) {
        self.with_node(HostOp::Destroy { handle: self.handle }, |node| {
            node.destroyed = true;
            node.children.clear();
        });
    }
}

impl HostSurface for HeadlessRenderable {
    fn insert_child(&mut self, child: RenderHandle, index: usize) {
        self.with_node(
            HostOp::Insert {
                parent: self.handle,
                child,
                index,
            },
            |node| {
                let index = index.min(node.children.len());
                node.children.insert(index, child);
            },
        );
    }

    fn remove_child(&mut self, child: RenderHandle) {
        self.with_node(
            HostOp::Remove {
                parent: self.handle,
                child,
            },
            |node| node.children.retain(|existing| *existing != child),
        );
    }

    fn reorder_child(&mut self, child: RenderHandle, index: usize) {
        self.with_node(
            HostOp::Reorder {
                parent: self.handle,
                child,
                index,
            },
            |node| {
                node.children.retain(|existing| *existing != child);
                let index = index.min(node.children.len());
                node.children.insert(index, child);
            },
        );
    }
}

/// Collects hook events in delivery order.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<HookEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<HookEvent> {
        lock(&self.events).clone()
    }

    pub fn take(&self) -> Vec<HookEvent> {
        mem::take(&mut *lock(&self.events))
    }
}

impl CallbackSink for RecordingSink {
    fn notify(&mut self, event: HookEvent) {
        lock(&self.events).push(event);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingTelemetry {
    clicks: Arc<Mutex<Vec<ClickRecord>>>,
}

impl RecordingTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clicks(&self) -> Vec<ClickRecord> {
        lock(&self.clicks).clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record_click(&mut self, click: ClickRecord) {
        lock(&self.clicks).push(click);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DelegateCall {
    TitleBar(AttrMap),
    StatusBar(AttrMap),
    ExitFullscreen,
    Secure(bool),
    ScrollTo(ScrollRequest),
    HideSkeleton,
    PageCreated(PageId),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingDelegate {
    calls: Arc<Mutex<Vec<DelegateCall>>>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DelegateCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: DelegateCall) {
        lock(&self.calls).push(call);
    }
}

impl PageDelegate for RecordingDelegate {
    fn update_title_bar(&mut self, attrs: &AttrMap) {
        self.record(DelegateCall::TitleBar(attrs.clone()));
    }

    fn update_status_bar(&mut self, attrs: &AttrMap) {
        self.record(DelegateCall::StatusBar(attrs.clone()));
    }

    fn exit_fullscreen(&mut self) {
        self.record(DelegateCall::ExitFullscreen);
    }

    fn set_secure(&mut self, secure: bool) {
        self.record(DelegateCall::Secure(secure));
    }

    fn scroll_to(&mut self, request: &ScrollRequest) {
        self.record(DelegateCall::ScrollTo(request.clone()));
    }

    fn hide_skeleton(&mut self) {
        self.record(DelegateCall::HideSkeleton);
    }

    fn page_created(&mut self, page: PageId) {
        self.record(DelegateCall::PageCreated(page));
    }
}

#[derive(Debug, Default)]
struct WindowState {
    children: Vec<RenderHandle>,
    transforms: HashMap<RenderHandle, Transform>,
    focus_clears: usize,
}

/// Window surface with a fixed width.
#[derive(Debug, Clone)]
pub struct HeadlessWindow {
    width: f32,
    state: Arc<Mutex<WindowState>>,
}

impl HeadlessWindow {
    pub fn new(width: f32) -> Self {
        Self {
            width,
            state: Arc::default(),
        }
    }

    pub fn children(&self) -> Vec<RenderHandle> {
        lock(&self.state).children.clone()
    }

    pub fn transform(&self, handle: RenderHandle) -> Option<Transform> {
        lock(&self.state).transforms.get(&handle).copied()
    }

    pub fn focus_clears(&self) -> usize {
        lock(&self.state).focus_clears
    }
}

impl HostSurface for HeadlessWindow {
    fn insert_child(&mut self, child: RenderHandle, index: usize) {
        let mut state = lock(&self.state);
        let index = index.min(state.children.len());
        state.children.insert(index, child);
    }

    fn remove_child(&mut self, child: RenderHandle) {
        let mut state = lock(&self.state);
        state.children.retain(|existing| *existing != child);
        state.transforms.remove(&child);
    }

    fn reorder_child(&mut self, child: RenderHandle, index: usize) {
        let mut state = lock(&self.state);
        state.children.retain(|existing| *existing != child);
        let index = index.min(state.children.len());
        state.children.insert(index, child);
    }
}

impl WindowSurface for HeadlessWindow {
    fn child_count(&self) -> usize {
        lock(&self.state).children.len()
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn bring_to_front(&mut self, child: RenderHandle) {
        let len = self.child_count();
        self.reorder_child(child, len);
    }

    fn set_transform(&mut self, child: RenderHandle, transform: Transform) {
        lock(&self.state).transforms.insert(child, transform);
    }

    fn clear_focus(&mut self) {
        lock(&self.state).focus_clears += 1;
    }
}

#[derive(Debug, Default)]
struct AnimatorState {
    next: u64,
    running: Vec<(AnimationId, RenderHandle, Transform, Transform)>,
    cancelled: Vec<AnimationId>,
}

/// Animations only finish when the test says so through
/// [`crate::Document::animation_finished`].
#[derive(Debug, Clone, Default)]
pub struct ManualAnimator {
    state: Arc<Mutex<AnimatorState>>,
}

impl ManualAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently started animation still running.
    pub fn last(&self) -> Option<AnimationId> {
        lock(&self.state).running.last().map(|(id, ..)| *id)
    }

    /// Start and end transforms of `id`.
    pub fn bounds(&self, id: AnimationId) -> Option<(Transform, Transform)> {
        lock(&self.state)
            .running
            .iter()
            .find(|(running, ..)| *running == id)
            .map(|(_, _, from, to)| (*from, *to))
    }

    pub fn cancelled(&self) -> Vec<AnimationId> {
        lock(&self.state).cancelled.clone()
    }
}

impl Animator for ManualAnimator {
    fn start(&mut self, target: RenderHandle, from: Transform, to: Transform) -> AnimationId {
        let mut state = lock(&self.state);
        state.next += 1;
        let id = AnimationId(state.next);
        state.running.push((id, target, from, to));
        id
    }

    fn cancel(&mut self, id: AnimationId) {
        let mut state = lock(&self.state);
        state.running.retain(|(running, ..)| *running != id);
        state.cancelled.push(id);
    }
}

/// A full set of headless collaborators, with clones kept for inspection.
#[derive(Debug, Clone)]
pub struct HeadlessKit {
    pub host: HeadlessHost,
    pub sink: RecordingSink,
    pub telemetry: RecordingTelemetry,
    pub delegate: RecordingDelegate,
    pub window: HeadlessWindow,
    pub animator: ManualAnimator,
}

impl Default for HeadlessKit {
    fn default() -> Self {
        Self {
            host: HeadlessHost::new(),
            sink: RecordingSink::new(),
            telemetry: RecordingTelemetry::new(),
            delegate: RecordingDelegate::new(),
            window: HeadlessWindow::new(DEFAULT_WINDOW_WIDTH),
            animator: ManualAnimator::new(),
        }
    }
}

pub const DEFAULT_WINDOW_WIDTH: f32 = 390.0;

impl HeadlessKit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collaborators for one document, all wired to this kit.
    pub fn document_host(&self) -> DocumentHost {
        DocumentHost::new(Box::new(self.host.factory()), Box::new(self.sink.clone()))
            .with_telemetry(Box::new(self.telemetry.clone()))
            .with_delegate(Box::new(self.delegate.clone()))
            .with_animator(Box::new(self.animator.clone()))
    }

    /// A document bound to this kit's window, ready to accept actions.
    pub fn document(&self, page: PageId, options: DocumentOptions) -> Result<Document, FactoryError> {
        let mut document = Document::new(page, self.document_host(), options)?;
        document.bind_window(Box::new(self.window.clone()));
        Ok(document)
    }
}
