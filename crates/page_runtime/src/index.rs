//! A read-only mirror of every document's element tree for lookups from
//! other threads (the script bridge, inspectors). It is refreshed from
//! document snapshots after each pump slice and never touches the live tree.

use actions::{ElementId, PageId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use vdom::{ElementSnapshot, RenderHandle};

/// One element as last seen by the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedElement {
    pub tag: String,
    pub class: String,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub handle: Option<RenderHandle>,
}

#[derive(Debug, Default)]
pub struct PageIndex {
    pub elements: HashMap<ElementId, IndexedElement>,
    /// Tag -> elements, in tree pre-order.
    pub tag_index: HashMap<String, Vec<ElementId>>,
}

/// Internal mutable state for the element index.
#[derive(Debug, Default)]
pub struct ElementIndexState {
    pub pages: HashMap<PageId, PageIndex>,
}

impl ElementIndexState {
    fn replace_page(&mut self, page: PageId, snapshot: Vec<ElementSnapshot>) {
        let mut index = PageIndex::default();
        for element in snapshot {
            index.tag_index.entry(element.tag.clone()).or_default().push(element.id);
            index.elements.insert(
                element.id,
                IndexedElement {
                    tag: element.tag,
                    class: element.class,
                    parent: element.parent,
                    children: element.children,
                    handle: element.handle,
                },
            );
        }
        self.pages.insert(page, index);
    }
}

/// Shared handle on an [`ElementIndexState`].
#[derive(Clone, Debug, Default)]
pub struct ElementIndex {
    inner: Arc<Mutex<ElementIndexState>>,
}

impl ElementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ElementIndexState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace everything known about `page` with `snapshot`.
    pub fn refresh(&self, page: PageId, snapshot: Vec<ElementSnapshot>) {
        self.state().replace_page(page, snapshot);
    }

    pub fn forget(&self, page: PageId) {
        self.state().pages.remove(&page);
    }

    pub fn pages(&self) -> Vec<PageId> {
        let mut pages: Vec<PageId> = self.state().pages.keys().copied().collect();
        pages.sort_unstable();
        pages
    }

    pub fn element(&self, page: PageId, id: ElementId) -> Option<IndexedElement> {
        self.state().pages.get(&page)?.elements.get(&id).cloned()
    }

    pub fn tag_of(&self, page: PageId, id: ElementId) -> Option<String> {
        self.element(page, id).map(|element| element.tag)
    }

    pub fn handle_of(&self, page: PageId, id: ElementId) -> Option<RenderHandle> {
        self.element(page, id)?.handle
    }

    pub fn children_of(&self, page: PageId, id: ElementId) -> Vec<ElementId> {
        self.element(page, id).map(|element| element.children).unwrap_or_default()
    }

    /// Elements with `tag`, in tree order.
    pub fn elements_by_tag(&self, page: PageId, tag: &str) -> Vec<ElementId> {
        self.state()
            .pages
            .get(&page)
            .and_then(|index| index.tag_index.get(tag).cloned())
            .unwrap_or_default()
    }

    /// Number of elements indexed for `page`, including the document root.
    pub fn len(&self, page: PageId) -> usize {
        self.state().pages.get(&page).map_or(0, |index| index.elements.len())
    }

    pub fn is_empty(&self, page: PageId) -> bool {
        self.len(page) == 0
    }
}
