//! Recycler template pool.
//!
//! Children of a recyclable container are kept as data items. Only the rows
//! inside the container's visible window are realized; their renderables are
//! taken from a per-shape pool and handed back when the row scrolls out, so
//! the number of constructions per shape is bounded by the window size rather
//! than the row count.

use crate::document::Document;
use crate::element::VirtualElement;
use crate::host::Renderable;
use actions::{AttrMap, ElementId};
use log::{debug, error, trace};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Groups data items whose renderables are interchangeable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeKey(pub String);

impl fmt::Display for ShapeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pure function of tag and attributes. Items with equal keys must resolve to
/// the same component class.
pub trait ShapeClassifier {
    fn classify(&self, tag: &str, attrs: &AttrMap) -> ShapeKey;
}

impl<Classify> ShapeClassifier for Classify
where
    Classify: Fn(&str, &AttrMap) -> ShapeKey,
{
    fn classify(&self, tag: &str, attrs: &AttrMap) -> ShapeKey {
        self(tag, attrs)
    }
}

/// Tag plus the values of a fixed set of discriminating attribute keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedShapeClassifier {
    keys: Vec<String>,
}

impl KeyedShapeClassifier {
    pub fn new<Keys, Key>(keys: Keys) -> Self
    where
        Keys: IntoIterator<Item = Key>,
        Key: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for KeyedShapeClassifier {
    fn default() -> Self {
        Self::new(["type"])
    }
}

impl ShapeClassifier for KeyedShapeClassifier {
    fn classify(&self, tag: &str, attrs: &AttrMap) -> ShapeKey {
        let mut key = tag.to_owned();
        for name in &self.keys {
            if let Some(value) = attrs.get(name) {
                key.push('|');
                key.push_str(name);
                key.push('=');
                key.push_str(value);
            }
        }
        ShapeKey(key)
    }
}

/// Pool of renderables for one shape.
pub struct Template {
    shape: ShapeKey,
    /// Class name of the first renderable built for this shape.
    class: Option<String>,
    idle: Vec<Box<dyn Renderable>>,
    constructed: usize,
    in_use: usize,
    bound: usize,
}

impl Template {
    fn new(shape: ShapeKey) -> Self {
        Self {
            shape,
            class: None,
            idle: Vec::new(),
            constructed: 0,
            in_use: 0,
            bound: 0,
        }
    }

    pub const fn shape(&self) -> &ShapeKey {
        &self.shape
    }

    pub fn class_name(&self) -> Option<&str> {
        self.class.as_deref()
    }

    /// Total renderables ever built for this shape.
    pub const fn constructed(&self) -> usize {
        self.constructed
    }

    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    pub const fn in_use(&self) -> usize {
        self.in_use
    }

    /// Data items currently classified into this shape.
    pub const fn bound(&self) -> usize {
        self.bound
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("shape", &self.shape)
            .field("class", &self.class)
            .field("idle", &self.idle.len())
            .field("constructed", &self.constructed)
            .field("in_use", &self.in_use)
            .field("bound", &self.bound)
            .finish()
    }
}

/// Templates of one recyclable container, plus its visible row window.
#[derive(Debug)]
pub struct RecyclerPool {
    templates: HashMap<ShapeKey, Template>,
    window: Range<usize>,
}

impl RecyclerPool {
    pub(crate) fn new(window: Range<usize>) -> Self {
        Self {
            templates: HashMap::new(),
            window,
        }
    }

    pub fn window(&self) -> Range<usize> {
        self.window.clone()
    }

    pub(crate) fn set_window(&mut self, window: Range<usize>) {
        self.window = window;
    }

    pub fn template(&self, shape: &ShapeKey) -> Option<&Template> {
        self.templates.get(shape)
    }

    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    /// Constructions across every shape.
    pub fn constructed(&self) -> usize {
        self.templates.values().map(Template::constructed).sum()
    }

    pub(crate) fn attach(&mut self, shape: &ShapeKey) {
        self.templates
            .entry(shape.clone())
            .or_insert_with(|| Template::new(shape.clone()))
            .bound += 1;
    }

    pub(crate) fn detach(&mut self, shape: &ShapeKey) {
        if let Some(template) = self.templates.get_mut(shape) {
            template.bound = template.bound.saturating_sub(1);
        }
    }

    /// Pop an idle renderable for `shape`. Pooled objects whose class is not
    /// `class_name` are destroyed; the caller then constructs a fresh one.
    pub(crate) fn take_idle(&mut self, shape: &ShapeKey, class_name: &str) -> Option<Box<dyn Renderable>> {
        let template = self.templates.get_mut(shape)?;
        while let Some(mut renderable) = template.idle.pop() {
            if renderable.class_name() == class_name {
                template.in_use += 1;
                return Some(renderable);
            }
            error!(
                target: "trellis::recycler",
                "pooled {} for shape {} has class `{}`, expected `{}`; discarding",
                renderable.handle(),
                shape,
                renderable.class_name(),
                class_name
            );
            renderable.destroy();
        }
        None
    }

    pub(crate) fn note_constructed(&mut self, shape: &ShapeKey, class_name: &str) {
        let template = self
            .templates
            .entry(shape.clone())
            .or_insert_with(|| Template::new(shape.clone()));
        template.constructed += 1;
        template.in_use += 1;
        if template.class.is_none() {
            template.class = Some(class_name.to_owned());
        }
    }

    pub(crate) fn give_back(&mut self, shape: &ShapeKey, mut renderable: Box<dyn Renderable>) {
        renderable.recycle();
        match self.templates.get_mut(shape) {
            Some(template) => {
                template.in_use = template.in_use.saturating_sub(1);
                template.idle.push(renderable);
            }
            None => renderable.destroy(),
        }
    }

    /// Destroy every pooled renderable; used when the container goes away.
    pub(crate) fn destroy_idle(&mut self) {
        for template in self.templates.values_mut() {
            for mut renderable in template.idle.drain(..) {
                renderable.destroy();
            }
        }
    }
}

// ============================
// Realization against a document
// ============================

/// Recyclable container a new child of `parent` is served by, if any.
/// Recyclable containers nested inside rows behave as plain groups.
pub(crate) fn container_for_child(document: &Document, parent: ElementId) -> Option<ElementId> {
    let parent_element = document.registry.get(parent)?;
    if parent_element.is_recycler_root() {
        Some(parent)
    } else {
        parent_element.item_container()
    }
}

/// (Re)compute the shape of data item `id` and bind it to its template.
/// A realized item whose shape changed is released and marked stale.
/// Returns true if an existing shape changed.
pub(crate) fn classify_item(document: &mut Document, id: ElementId) -> bool {
    let Some(element) = document.registry.get(id) else {
        return false;
    };
    let Some(item) = element.data_item() else {
        return false;
    };
    let shape = document.host.classifier.classify(&element.tag, &element.state.attrs);
    if item.shape.as_ref() == Some(&shape) {
        return false;
    }
    let container = item.container;
    let previous = item.shape.clone();
    if item.slot.is_some() {
        release(document, id);
    }
    if let Some(pool) = document.recyclers.get_mut(&container) {
        if let Some(previous) = &previous {
            pool.detach(previous);
        }
        pool.attach(&shape);
    }
    trace!(target: "trellis::recycler", "{id} classified as {shape}");
    let changed = previous.is_some();
    if let Some(bound) = document.registry.get_mut(id).and_then(VirtualElement::data_item_mut) {
        bound.stale |= changed;
        bound.shape = Some(shape);
    }
    changed
}

/// Bind a pooled (or freshly built) renderable to data item `id` and to
/// every descendant. Requires the parent to be realized.
pub(crate) fn realize(document: &mut Document, id: ElementId) -> bool {
    let Some(element) = document.registry.get(id) else {
        return false;
    };
    let Some(item) = element.data_item() else {
        return element.is_realized();
    };
    if item.slot.is_some() {
        return true;
    }
    let stale = item.stale;
    let unclassified = item.shape.is_none();
    let Some(parent) = element.parent else {
        return false;
    };
    let Some(parent_handle) = document.registry.get(parent).and_then(VirtualElement::render_handle) else {
        return false;
    };
    if stale {
        rebind_class(document, id);
    }
    if unclassified {
        classify_item(document, id);
    }

    let Some(current) = document.registry.get(id) else {
        return false;
    };
    let Some(data) = current.data_item() else {
        return false;
    };
    let container = data.container;
    let Some(shape) = data.shape.clone() else {
        return false;
    };
    let pooled = document
        .recyclers
        .get_mut(&container)
        .and_then(|pool| pool.take_idle(&shape, &current.class.name));
    let mut renderable = match pooled {
        Some(renderable) => renderable,
        None => match document
            .host
            .factory
            .create(&current.tag, Some(parent_handle), id, &current.state.attrs)
        {
            Ok(renderable) => {
                if let Some(pool) = document.recyclers.get_mut(&container) {
                    pool.note_constructed(&shape, renderable.class_name());
                }
                renderable
            }
            Err(err) => {
                error!(target: "trellis::recycler", "could not realize {id}: {err}");
                return false;
            }
        },
    };
    VirtualElement::bind_state(renderable.as_mut(), &current.state);
    let children = current.children().to_vec();
    let handle = renderable.handle();

    let Some((_, position)) = document.registry.index_in_parent(id) else {
        renderable.destroy();
        return false;
    };
    let host_index = document.host_index(parent, position);
    document.surface_insert(parent, handle, host_index);
    if let Some(owner) = document.registry.get_mut(id).and_then(VirtualElement::data_item_mut) {
        owner.slot = Some(renderable);
    }
    debug!(target: "trellis::recycler", "realized {id} as {handle} ({shape})");

    for child in children {
        realize(document, child);
    }
    true
}

/// Return the renderables of `id` and its realized descendants to their
/// pools, descendants first.
pub(crate) fn release(document: &mut Document, id: ElementId) {
    let children = match document.registry.get(id) {
        Some(element) if element.data_item().is_some_and(|item| item.slot.is_some()) => element.children().to_vec(),
        _ => return,
    };
    for child in children {
        release(document, child);
    }

    let Some(element) = document.registry.get_mut(id) else {
        return;
    };
    let parent = element.parent;
    let Some(item) = element.data_item_mut() else {
        return;
    };
    let Some(mut renderable) = item.slot.take() else {
        return;
    };
    let container = item.container;
    let shape = item.shape.clone();
    if let Some(parent) = parent {
        document.surface_remove(parent, renderable.handle());
    }
    trace!(target: "trellis::recycler", "released {id} ({})", renderable.handle());
    match (document.recyclers.get_mut(&container), shape) {
        (Some(pool), Some(shape)) => pool.give_back(&shape, renderable),
        _ => renderable.destroy(),
    }
}

/// Release rows that left `container`'s window, then realize the rows inside
/// it in logical order.
pub(crate) fn sync_window(document: &mut Document, container: ElementId) {
    let Some(window) = document.recyclers.get(&container).map(RecyclerPool::window) else {
        return;
    };
    let rows = match document.registry.get(container) {
        Some(element) => element.children().to_vec(),
        None => return,
    };
    for (position, row) in rows.iter().enumerate() {
        if !window.contains(&position) {
            release(document, *row);
        }
    }
    for (position, row) in rows.iter().enumerate() {
        if window.contains(&position) {
            realize(document, *row);
        }
    }
}

/// Realize data item `id` if its position calls for it.
pub(crate) fn refresh_item(document: &mut Document, id: ElementId) {
    let Some(element) = document.registry.get(id) else {
        return;
    };
    let (Some(container), Some(parent)) = (element.item_container(), element.parent) else {
        return;
    };
    if parent == container {
        sync_window(document, container);
    } else if document.registry.get(parent).is_some_and(VirtualElement::is_realized) {
        realize(document, id);
    }
}

/// A stale item re-resolves its class before binding, as a fresh ADD would.
fn rebind_class(document: &mut Document, id: ElementId) {
    let Some(element) = document.registry.get(id) else {
        return;
    };
    let resolved = document.host.factory.resolve(&element.tag, &element.state.attrs);
    let Some(target) = document.registry.get_mut(id) else {
        return;
    };
    match resolved {
        Some(class) if class != target.class => {
            if !class.container && !target.children().is_empty() {
                error!(
                    target: "trellis::recycler",
                    "{id} cannot become leaf class `{}` while it has children",
                    class.name
                );
            } else {
                target.set_class(class);
            }
        }
        Some(_) => {}
        None => error!(target: "trellis::recycler", "tag `{}` no longer resolves for {id}", target.tag),
    }
    if let Some(item) = target.data_item_mut() {
        item.stale = false;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap freely")]
mod tests {
    use super::*;
    use crate::host::RenderHandle;

    struct Stub {
        handle: RenderHandle,
        class: &'static str,
    }

    impl Renderable for Stub {
        fn handle(&self) -> RenderHandle {
            self.handle
        }
        fn class_name(&self) -> &str {
            self.class
        }
        fn apply_attrs(&mut self, _attrs: &AttrMap) {}
        fn apply_styles(&mut self, _styles: &AttrMap) {}
        fn bind_event(&mut self, _event: &str) {}
        fn unbind_event(&mut self, _event: &str) {}
    }

    fn stub(handle: u64, class: &'static str) -> Box<dyn Renderable> {
        Box::new(Stub {
            handle: RenderHandle(handle),
            class,
        })
    }

    #[test]
    fn keyed_classifier_discriminates_on_configured_keys() {
        let classifier = KeyedShapeClassifier::default();
        let mut attrs = AttrMap::new();
        attrs.insert("value", "a");
        assert_eq!(classifier.classify("input", &attrs), ShapeKey("input".into()));
        attrs.insert("type", "number");
        assert_eq!(classifier.classify("input", &attrs), ShapeKey("input|type=number".into()));
    }

    #[test]
    fn closures_classify() {
        let classifier = |tag: &str, _attrs: &AttrMap| ShapeKey(tag.to_uppercase());
        assert_eq!(classifier.classify("row", &AttrMap::new()), ShapeKey("ROW".into()));
    }

    #[test]
    fn pooled_renderables_are_reused_by_shape() {
        let shape = ShapeKey("row".into());
        let mut pool = RecyclerPool::new(0..4);
        pool.attach(&shape);
        pool.note_constructed(&shape, "row");
        pool.give_back(&shape, stub(1, "row"));

        let template = pool.template(&shape).unwrap();
        assert_eq!((template.idle(), template.in_use(), template.bound()), (1, 0, 1));

        let reused = pool.take_idle(&shape, "row").unwrap();
        assert_eq!(reused.handle(), RenderHandle(1));
        assert!(pool.take_idle(&shape, "row").is_none());
        assert_eq!(pool.constructed(), 1);
    }

    #[test]
    fn mismatched_pooled_class_is_discarded() {
        let shape = ShapeKey("row".into());
        let mut pool = RecyclerPool::new(0..4);
        pool.attach(&shape);
        pool.give_back(&shape, stub(7, "other"));
        assert!(pool.take_idle(&shape, "row").is_none());
        assert_eq!(pool.template(&shape).unwrap().idle(), 0);
    }
}
