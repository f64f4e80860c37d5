//! Document root: one page's virtual tree plus everything that lives exactly
//! as long as the page.

use crate::element::{Binding, ElementState, VirtualElement};
use crate::error::{FactoryError, TransitionError};
use crate::host::{
    AnimationId, Animator, CallbackSink, ComponentClass, ElementFactory, HostSurface, PageDelegate, RenderHandle,
    TelemetrySink, WindowSurface,
};
use crate::recycler::{self, KeyedShapeClassifier, RecyclerPool, ShapeClassifier};
use crate::registry::ElementRegistry;
use crate::transition::{PageTransition, Transform, TransitionListener, TransitionRequest, TransitionState};
use actions::{AttrMap, ElementId, HookEvent, HookKind, PageId};
use log::{debug, trace};
use std::collections::HashMap;
use std::{fmt, mem};
use std::ops::Range;
use std::sync::Arc;

pub(crate) const ROOT_TAG: &str = "document";
pub(crate) const BODY_TAG: &str = "div";

/// Decides whether an attribute update may change an element's class.
#[derive(Clone)]
pub enum TypeChangeRule {
    /// Any of these keys present in the update.
    Keys(Vec<String>),
    Custom(Arc<dyn Fn(&str, &AttrMap) -> bool + Send + Sync>),
}

impl TypeChangeRule {
    pub fn keys<Keys, Key>(keys: Keys) -> Self
    where
        Keys: IntoIterator<Item = Key>,
        Key: Into<String>,
    {
        Self::Keys(keys.into_iter().map(Into::into).collect())
    }

    /// `delta` is the attribute update, not the merged state.
    pub fn implies_type_change(&self, tag: &str, delta: &AttrMap) -> bool {
        match self {
            Self::Keys(keys) => keys.iter().any(|key| delta.contains_key(key)),
            Self::Custom(predicate) => predicate(tag, delta),
        }
    }
}

impl Default for TypeChangeRule {
    fn default() -> Self {
        Self::keys(["type"])
    }
}

impl fmt::Debug for TypeChangeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentOptions {
    /// Rows realized in a freshly created recyclable container.
    pub recycler_window: usize,
    pub type_change: TypeChangeRule,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            recycler_window: 12,
            type_change: TypeChangeRule::default(),
        }
    }
}

/// Collaborators a document talks to. Optional ones may be absent; actions
/// routed to a missing collaborator are dropped.
pub struct DocumentHost {
    pub factory: Box<dyn ElementFactory>,
    pub callbacks: Box<dyn CallbackSink>,
    pub classifier: Box<dyn ShapeClassifier>,
    pub telemetry: Option<Box<dyn TelemetrySink>>,
    pub delegate: Option<Box<dyn PageDelegate>>,
    pub animator: Option<Box<dyn Animator>>,
}

impl DocumentHost {
    pub fn new(factory: Box<dyn ElementFactory>, callbacks: Box<dyn CallbackSink>) -> Self {
        Self {
            factory,
            callbacks,
            classifier: Box::new(KeyedShapeClassifier::default()),
            telemetry: None,
            delegate: None,
            animator: None,
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn ShapeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Box<dyn TelemetrySink>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    #[must_use]
    pub fn with_delegate(mut self, delegate: Box<dyn PageDelegate>) -> Self {
        self.delegate = Some(delegate);
        self
    }

    #[must_use]
    pub fn with_animator(mut self, animator: Box<dyn Animator>) -> Self {
        self.animator = Some(animator);
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DocumentStats {
    /// Every action run against the document.
    pub processed: u64,
    /// Actions that took full effect: nothing dropped, no error.
    pub applied: u64,
    /// Actions discarded because a reference did not resolve.
    pub dropped: u64,
}

/// Read-only view of one element, detached from the live tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    pub id: ElementId,
    pub tag: String,
    pub class: String,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub handle: Option<RenderHandle>,
    pub attrs: AttrMap,
}

impl ElementSnapshot {
    pub(crate) fn of(element: &VirtualElement) -> Self {
        Self {
            id: element.id,
            tag: element.tag.clone(),
            class: element.class.name.clone(),
            parent: element.parent,
            children: element.children().to_vec(),
            handle: element.render_handle(),
            attrs: element.state.attrs.clone(),
        }
    }
}

pub struct Document {
    pub(crate) page: PageId,
    pub(crate) registry: ElementRegistry,
    pub(crate) create_finished: bool,
    pub(crate) hide_skeleton_requested: bool,
    pub(crate) recyclers: HashMap<ElementId, RecyclerPool>,
    pub(crate) outbox: Vec<HookEvent>,
    pub(crate) stats: DocumentStats,
    pub(crate) host: DocumentHost,
    pub(crate) options: DocumentOptions,
    window: Option<Box<dyn WindowSurface>>,
    transition: PageTransition,
}

impl Document {
    /// Build the document root group through the factory.
    pub fn new(page: PageId, mut host: DocumentHost, options: DocumentOptions) -> Result<Self, FactoryError> {
        let empty = AttrMap::new();
        let mut class = host
            .factory
            .resolve(ROOT_TAG, &empty)
            .unwrap_or_else(|| ComponentClass::container(ROOT_TAG));
        class.container = true;
        class.recycler = false;
        let renderable = host.factory.create(ROOT_TAG, None, ElementId::DOCUMENT, &empty)?;
        let root = VirtualElement::new(
            ElementId::DOCUMENT,
            ROOT_TAG.to_owned(),
            class,
            None,
            Binding::Rendered(renderable),
            ElementState::default(),
        );
        debug!(target: "trellis::engine", "{page} created");
        Ok(Self {
            page,
            registry: ElementRegistry::with_root(root),
            create_finished: false,
            hide_skeleton_requested: false,
            recyclers: HashMap::new(),
            outbox: Vec::new(),
            stats: DocumentStats::default(),
            host,
            options,
            window: None,
            transition: PageTransition::new(),
        })
    }

    pub const fn page(&self) -> PageId {
        self.page
    }

    pub const fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    pub fn element(&self, id: ElementId) -> Option<&VirtualElement> {
        self.registry.get(id)
    }

    pub fn has_body(&self) -> bool {
        self.registry.contains(ElementId::BODY)
    }

    pub fn root_handle(&self) -> Option<RenderHandle> {
        self.registry.get(ElementId::DOCUMENT).and_then(VirtualElement::render_handle)
    }

    pub const fn create_finished(&self) -> bool {
        self.create_finished
    }

    pub const fn hide_skeleton_requested(&self) -> bool {
        self.hide_skeleton_requested
    }

    pub const fn stats(&self) -> DocumentStats {
        self.stats
    }

    pub const fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub fn recycler(&self, container: ElementId) -> Option<&RecyclerPool> {
        self.recyclers.get(&container)
    }

    // ============================
    // Readiness and host-driven operations
    // ============================

    pub fn bind_window(&mut self, window: Box<dyn WindowSurface>) {
        debug!(target: "trellis::engine", "{} bound to a window", self.page);
        self.window = Some(window);
    }

    pub fn unbind_window(&mut self) -> Option<Box<dyn WindowSurface>> {
        self.window.take()
    }

    /// Actions may be applied once a window surface is bound.
    pub const fn is_ready(&self) -> bool {
        self.window.is_some()
    }

    /// Move `container`'s visible window. Rows leaving it are recycled before
    /// rows entering it are realized. False if `container` is not a
    /// recyclable container.
    pub fn set_visible_range(&mut self, container: ElementId, range: Range<usize>) -> bool {
        let Some(pool) = self.recyclers.get_mut(&container) else {
            return false;
        };
        trace!(target: "trellis::recycler", "{container} window -> {range:?}");
        pool.set_window(range);
        recycler::sync_window(self, container);
        true
    }

    /// Host-driven placeholder removal; suppressed once the script side has
    /// asked for it through HIDE_SKELETON.
    pub fn host_hide_skeleton(&mut self) -> bool {
        if self.hide_skeleton_requested {
            return false;
        }
        match self.host.delegate.as_mut() {
            Some(delegate) => {
                delegate.hide_skeleton();
                true
            }
            None => false,
        }
    }

    /// Every element in pre-order from the document root.
    pub fn snapshot(&self) -> Vec<ElementSnapshot> {
        self.registry
            .subtree(ElementId::DOCUMENT)
            .into_iter()
            .filter_map(|id| self.registry.get(id))
            .map(ElementSnapshot::of)
            .collect()
    }

    // ============================
    // Page transitions
    // ============================

    pub const fn transition_state(&self) -> TransitionState {
        self.transition.state()
    }

    pub const fn transition(&self) -> &PageTransition {
        &self.transition
    }

    /// Attach the page to its window.
    pub fn open(
        &mut self,
        request: TransitionRequest,
        listener: Option<Box<dyn TransitionListener>>,
    ) -> Result<(), TransitionError> {
        let page = self.root_handle().ok_or(TransitionError::NoRootRenderable)?;
        let window = self.window.as_deref_mut().ok_or(TransitionError::NoWindow)?;
        self.transition
            .attach(window, page, animator_of(&mut self.host.animator), request, listener)
    }

    pub fn close(&mut self, animated: bool, listener: Option<Box<dyn TransitionListener>>) -> Result<(), TransitionError> {
        let page = self.root_handle().ok_or(TransitionError::NoRootRenderable)?;
        let window = self.window.as_deref_mut().ok_or(TransitionError::NoWindow)?;
        self.transition
            .detach(window, page, animator_of(&mut self.host.animator), animated, listener)
    }

    pub fn bring_to_front(
        &mut self,
        animated: bool,
        listener: Option<Box<dyn TransitionListener>>,
    ) -> Result<(), TransitionError> {
        let page = self.root_handle().ok_or(TransitionError::NoRootRenderable)?;
        let window = self.window.as_deref_mut().ok_or(TransitionError::NoWindow)?;
        self.transition.move_to_front(
            window,
            page,
            animator_of(&mut self.host.animator),
            animated,
            Transform::IDENTITY,
            listener,
        )
    }

    pub fn animation_finished(&mut self, id: AnimationId) -> bool {
        let Some(page) = self.root_handle() else {
            return false;
        };
        match self.window.as_deref_mut() {
            Some(window) => self.transition.animation_finished(window, page, id),
            None => false,
        }
    }

    pub fn abort_transition(&mut self) -> bool {
        let Some(page) = self.root_handle() else {
            return false;
        };
        match self.window.as_deref_mut() {
            Some(window) => self
                .transition
                .abort(window, page, animator_of(&mut self.host.animator)),
            None => false,
        }
    }

    // ============================
    // Hooks
    // ============================

    pub(crate) fn queue_hook(&mut self, hook: HookKind, element: ElementId) {
        self.outbox.push(HookEvent::new(self.page, hook, element));
    }

    /// Deliver queued hook events to the callback sink, in queue order.
    pub fn flush_hooks(&mut self) -> usize {
        let events = mem::take(&mut self.outbox);
        let count = events.len();
        for event in events {
            self.host.callbacks.notify(event);
        }
        count
    }

    pub(crate) fn note_dropped(&mut self, what: &str, id: ElementId, reason: &str) {
        self.stats.dropped += 1;
        log::warn!(target: "trellis::engine", "{}: dropped {what} on {id}: {reason}", self.page);
    }

    // ============================
    // Host surface plumbing
    // ============================

    /// Host index of the child at logical `position` of `parent`: the number
    /// of realized siblings before it.
    pub(crate) fn host_index(&self, parent: ElementId, position: usize) -> usize {
        let Some(element) = self.registry.get(parent) else {
            return 0;
        };
        element
            .children()
            .iter()
            .take(position)
            .filter(|sibling| self.registry.get(**sibling).is_some_and(VirtualElement::is_realized))
            .count()
    }

    fn surface_of(&mut self, parent: ElementId) -> Option<&mut dyn HostSurface> {
        self.registry.get_mut(parent)?.renderable_mut()?.surface_mut()
    }

    pub(crate) fn surface_insert(&mut self, parent: ElementId, child: RenderHandle, index: usize) {
        if let Some(surface) = self.surface_of(parent) {
            surface.insert_child(child, index);
        }
    }

    pub(crate) fn surface_remove(&mut self, parent: ElementId, child: RenderHandle) {
        if let Some(surface) = self.surface_of(parent) {
            surface.remove_child(child);
        }
    }

    pub(crate) fn surface_reorder(&mut self, parent: ElementId, child: RenderHandle, index: usize) {
        if let Some(surface) = self.surface_of(parent) {
            surface.reorder_child(child, index);
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("page", &self.page)
            .field("elements", &self.registry.len())
            .field("create_finished", &self.create_finished)
            .field("hide_skeleton_requested", &self.hide_skeleton_requested)
            .field("stats", &self.stats)
            .field("transition", &self.transition.state())
            .finish_non_exhaustive()
    }
}

fn animator_of(animator: &mut Option<Box<dyn Animator>>) -> Option<&mut dyn Animator> {
    match animator {
        Some(animator) => Some(animator.as_mut()),
        None => None,
    }
}

/// Tearing a document down destroys every renderable it still owns, live
/// ones in tree pre-order (as REMOVE does), then the idle pools.
impl Drop for Document {
    fn drop(&mut self) {
        for id in self.registry.subtree(ElementId::DOCUMENT) {
            if let Some(renderable) = self.registry.get_mut(id).and_then(VirtualElement::renderable_mut) {
                renderable.destroy();
            }
        }
        for pool in self.recyclers.values_mut() {
            pool.destroy_idle();
        }
    }
}
