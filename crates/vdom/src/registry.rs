//! Per-document id -> element mapping.

use crate::element::VirtualElement;
use actions::ElementId;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct ElementRegistry {
    elements: HashMap<ElementId, VirtualElement>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_root(root: VirtualElement) -> Self {
        let mut elements = HashMap::new();
        elements.insert(root.id, root);
        Self { elements }
    }

    /// Register an element. A live element with the same id is never replaced;
    /// the rejected element is handed back.
    pub(crate) fn insert(&mut self, element: VirtualElement) -> Result<(), Box<VirtualElement>> {
        if self.elements.contains_key(&element.id) {
            return Err(Box::new(element));
        }
        self.elements.insert(element.id, element);
        Ok(())
    }

    pub fn get(&self, id: ElementId) -> Option<&VirtualElement> {
        self.elements.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ElementId) -> Option<&mut VirtualElement> {
        self.elements.get_mut(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualElement> {
        self.elements.values()
    }

    /// `id` followed by all of its descendants, in pre-order.
    pub fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(element) = self.elements.get(&current) else {
                continue;
            };
            out.push(current);
            stack.extend(element.children().iter().rev().copied());
        }
        out
    }

    /// True if `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: ElementId, node: ElementId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.elements.get(&id).and_then(VirtualElement::parent);
        }
        false
    }

    /// Position of `child` within its parent's child list.
    pub fn index_in_parent(&self, child: ElementId) -> Option<(ElementId, usize)> {
        let parent = self.elements.get(&child)?.parent()?;
        let index = self
            .elements
            .get(&parent)?
            .children()
            .iter()
            .position(|candidate| *candidate == child)?;
        Some((parent, index))
    }

    /// Unregister `id` and every descendant, returned in pre-order. The caller
    /// is responsible for detaching `id` from its parent first.
    pub(crate) fn remove_subtree(&mut self, id: ElementId) -> Vec<VirtualElement> {
        self.subtree(id)
            .into_iter()
            .filter_map(|member| self.elements.remove(&member))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap freely")]
mod tests {
    use super::*;
    use crate::element::{Binding, DataItem, ElementState};
    use crate::host::ComponentClass;

    fn item(id: i64, parent: Option<i64>, container: bool) -> VirtualElement {
        let class = if container {
            ComponentClass::container("div")
        } else {
            ComponentClass::leaf("text")
        };
        VirtualElement::new(
            ElementId(id),
            class.name.clone(),
            class,
            parent.map(ElementId),
            Binding::Item(DataItem::new(ElementId(0))),
            ElementState::default(),
        )
    }

    fn link(registry: &mut ElementRegistry, parent: i64, child: i64) {
        if let Some(children) = registry.get_mut(ElementId(parent)).and_then(VirtualElement::children_mut) {
            children.push(ElementId(child));
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut registry = ElementRegistry::new();
        registry.insert(item(1, None, true)).unwrap();
        let rejected = registry.insert(item(1, None, false)).unwrap_err();
        assert_eq!(rejected.id(), ElementId(1));
        assert!(registry.get(ElementId(1)).is_some_and(VirtualElement::is_group));
    }

    #[test]
    fn subtree_is_pre_order_and_removal_is_recursive() {
        let mut registry = ElementRegistry::new();
        for (id, parent, container) in [(1, None, true), (2, Some(1), true), (3, Some(2), false), (4, Some(1), false)] {
            registry.insert(item(id, parent, container)).unwrap();
        }
        link(&mut registry, 1, 2);
        link(&mut registry, 2, 3);
        link(&mut registry, 1, 4);

        assert_eq!(registry.subtree(ElementId(1)), vec![ElementId(1), ElementId(2), ElementId(3), ElementId(4)]);
        assert!(registry.is_ancestor(ElementId(1), ElementId(3)));
        assert!(!registry.is_ancestor(ElementId(4), ElementId(3)));
        assert_eq!(registry.index_in_parent(ElementId(4)), Some((ElementId(1), 1)));

        let removed = registry.remove_subtree(ElementId(2));
        assert_eq!(removed.len(), 2);
        assert!(!registry.contains(ElementId(2)));
        assert!(!registry.contains(ElementId(3)));
        assert_eq!(registry.len(), 2);
    }
}
