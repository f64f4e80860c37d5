//! Virtual elements: the in-memory mirror of one rendered node.

use crate::host::{ComponentClass, RenderHandle, Renderable};
use crate::recycler::ShapeKey;
use actions::{AttrMap, ElementId, HookKind, HookSet};
use std::collections::BTreeSet;
use std::fmt;

/// Leaf or group; groups own an ordered list of child ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Leaf,
    Group { children: Vec<ElementId> },
}

/// Everything the script side told us about an element, accumulated across
/// actions. Used to (re)bind renderables and to synthesize replacements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementState {
    pub attrs: AttrMap,
    pub styles: AttrMap,
    pub events: BTreeSet<String>,
    pub hooks: HookSet,
}

/// Stand-in for a renderable inside a recyclable container.
pub struct DataItem {
    /// The recyclable container whose pool serves this item.
    pub container: ElementId,
    pub shape: Option<ShapeKey>,
    /// Pooled renderable while the item is realized.
    pub slot: Option<Box<dyn Renderable>>,
    /// Force a rebind on next visibility.
    pub stale: bool,
}

impl DataItem {
    pub(crate) const fn new(container: ElementId) -> Self {
        Self {
            container,
            shape: None,
            slot: None,
            stale: false,
        }
    }
}

pub enum Binding {
    Rendered(Box<dyn Renderable>),
    Item(DataItem),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rendered(renderable) => f
                .debug_tuple("Rendered")
                .field(&renderable.handle())
                .field(&renderable.class_name())
                .finish(),
            Self::Item(item) => f
                .debug_struct("Item")
                .field("container", &item.container)
                .field("shape", &item.shape)
                .field("slot", &item.slot.as_ref().map(|slot| slot.handle()))
                .field("stale", &item.stale)
                .finish(),
        }
    }
}

#[derive(Debug)]
pub struct VirtualElement {
    pub(crate) id: ElementId,
    pub(crate) tag: String,
    pub(crate) class: ComponentClass,
    pub(crate) parent: Option<ElementId>,
    pub(crate) kind: ElementKind,
    pub(crate) binding: Binding,
    pub(crate) state: ElementState,
}

impl VirtualElement {
    pub(crate) fn new(
        id: ElementId,
        tag: String,
        class: ComponentClass,
        parent: Option<ElementId>,
        binding: Binding,
        state: ElementState,
    ) -> Self {
        let kind = if class.container {
            ElementKind::Group {
                children: Vec::new(),
            }
        } else {
            ElementKind::Leaf
        };
        Self {
            id,
            tag,
            class,
            parent,
            kind,
            binding,
            state,
        }
    }

    pub const fn id(&self) -> ElementId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub const fn class(&self) -> &ComponentClass {
        &self.class
    }

    pub const fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub const fn kind(&self) -> &ElementKind {
        &self.kind
    }

    pub const fn state(&self) -> &ElementState {
        &self.state
    }

    pub const fn binding(&self) -> &Binding {
        &self.binding
    }

    pub const fn is_group(&self) -> bool {
        matches!(self.kind, ElementKind::Group { .. })
    }

    /// Ordered child ids; empty for leaves.
    pub fn children(&self) -> &[ElementId] {
        match &self.kind {
            ElementKind::Group { children } => children,
            ElementKind::Leaf => &[],
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Vec<ElementId>> {
        match &mut self.kind {
            ElementKind::Group { children } => Some(children),
            ElementKind::Leaf => None,
        }
    }

    /// A recyclable container whose own renderable is live.
    pub const fn is_recycler_root(&self) -> bool {
        self.class.recycler && matches!(self.binding, Binding::Rendered(_))
    }

    pub const fn data_item(&self) -> Option<&DataItem> {
        match &self.binding {
            Binding::Item(item) => Some(item),
            Binding::Rendered(_) => None,
        }
    }

    pub(crate) fn data_item_mut(&mut self) -> Option<&mut DataItem> {
        match &mut self.binding {
            Binding::Item(item) => Some(item),
            Binding::Rendered(_) => None,
        }
    }

    /// Recyclable container serving this element, if it is a data item.
    pub fn item_container(&self) -> Option<ElementId> {
        self.data_item().map(|item| item.container)
    }

    /// The live renderable, if any: always for rendered elements, only while
    /// realized for data items.
    pub fn renderable(&self) -> Option<&dyn Renderable> {
        match &self.binding {
            Binding::Rendered(renderable) => Some(renderable.as_ref()),
            Binding::Item(item) => item.slot.as_deref(),
        }
    }

    pub(crate) fn renderable_mut(&mut self) -> Option<&mut (dyn Renderable + 'static)> {
        match &mut self.binding {
            Binding::Rendered(renderable) => Some(renderable.as_mut()),
            Binding::Item(item) => item.slot.as_deref_mut(),
        }
    }

    pub fn render_handle(&self) -> Option<RenderHandle> {
        self.renderable().map(|renderable| renderable.handle())
    }

    pub fn is_realized(&self) -> bool {
        self.renderable().is_some()
    }

    /// Rebind to another class; a leaf that becomes a container gains an
    /// empty child list.
    pub(crate) fn set_class(&mut self, class: ComponentClass) {
        if class.container && !self.is_group() {
            self.kind = ElementKind::Group {
                children: Vec::new(),
            };
        } else if !class.container && self.children().is_empty() {
            self.kind = ElementKind::Leaf;
        }
        self.class = class;
    }

    pub fn wants_hook(&self, hook: HookKind) -> bool {
        self.state.hooks.contains(&hook)
    }

    /// Push the full accumulated state onto a freshly bound renderable.
    pub(crate) fn bind_state(renderable: &mut dyn Renderable, state: &ElementState) {
        if !state.attrs.is_empty() {
            renderable.apply_attrs(&state.attrs);
        }
        if !state.styles.is_empty() {
            renderable.apply_styles(&state.styles);
        }
        for event in &state.events {
            renderable.bind_event(event);
        }
    }
}
