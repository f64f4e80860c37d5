//! ADD, PRE_CREATE_BODY and CREATE_BODY.

use crate::document::{BODY_TAG, Document};
use crate::element::{Binding, DataItem, ElementState, VirtualElement};
use crate::recycler::{self, RecyclerPool};
use actions::{APPEND_INDEX, ChangeAction, ElementId, HookKind};
use log::error;
use std::collections::HashSet;

fn body_tag(action: &ChangeAction) -> &str {
    if action.tag_name.is_empty() {
        BODY_TAG
    } else {
        &action.tag_name
    }
}

pub(super) fn pre_create_body(document: &mut Document, action: &ChangeAction) {
    if !ensure_body(document, body_tag(action)) {
        document.note_dropped("pre-create body", ElementId::BODY, "body could not be built");
    }
}

pub(super) fn create_body(document: &mut Document, action: &ChangeAction) {
    if !ensure_body(document, body_tag(action)) {
        document.note_dropped("create body", ElementId::BODY, "body could not be built");
        return;
    }

    if let Some(body) = document.registry.get_mut(ElementId::BODY) {
        body.state.attrs.merge(&action.attributes);
        body.state.styles.merge(&action.styles);
        if let Some(renderable) = body.renderable_mut() {
            if !action.attributes.is_empty() {
                renderable.apply_attrs(&action.attributes);
            }
            if !action.styles.is_empty() {
                renderable.apply_styles(&action.styles);
            }
        }
    }

    for child in &action.children {
        if let Err(reason) = validate(document, child) {
            document.note_dropped("add", child.target_id, &reason);
            continue;
        }
        let len = child_count(document, ElementId::BODY);
        if build_subtree(document, ElementId::BODY, child, child.insertion_index(len), Mounting::Announce) {
            settle(document, child.target_id);
        }
    }
}

pub(super) fn add(document: &mut Document, action: &ChangeAction) {
    if action.target_id == ElementId::BODY {
        create_body(document, action);
        return;
    }

    let parent = action.parent_id;
    if parent == ElementId::BODY && !ensure_body(document, BODY_TAG) {
        document.note_dropped("add", action.target_id, "body could not be built");
        return;
    }
    match document.registry.get(parent) {
        None => {
            document.note_dropped("add", action.target_id, &format!("parent {parent} is not registered"));
            return;
        }
        Some(element) if !element.is_group() => {
            document.note_dropped("add", action.target_id, &format!("parent {parent} is not a group"));
            return;
        }
        Some(_) => {}
    }
    if let Err(reason) = validate(document, action) {
        document.note_dropped("add", action.target_id, &reason);
        return;
    }

    let index = action.insertion_index(child_count(document, parent));
    if build_subtree(document, parent, action, index, Mounting::Announce) {
        settle(document, action.target_id);
    }
}

/// Create the body under the document root if it does not exist yet.
pub(super) fn ensure_body(document: &mut Document, tag: &str) -> bool {
    if document.has_body() {
        return true;
    }
    let body = ChangeAction::add(ElementId::DOCUMENT, APPEND_INDEX, ElementId::BODY, tag);
    match document.host.factory.resolve(tag, &body.attributes) {
        Some(class) if class.container => {}
        Some(class) => {
            error!(target: "trellis::engine", "body tag `{tag}` resolves to leaf class `{}`", class.name);
            return false;
        }
        None => {
            error!(target: "trellis::engine", "body tag `{tag}` does not resolve");
            return false;
        }
    }
    let len = child_count(document, ElementId::DOCUMENT);
    build_subtree(document, ElementId::DOCUMENT, &body, len, Mounting::Announce)
}

/// Check a whole ADD subtree before touching the tree: ids must be unused
/// and unique, and every tag must resolve.
fn validate(document: &Document, action: &ChangeAction) -> Result<(), String> {
    let mut seen = HashSet::new();
    let mut failure = None;
    action.walk(&mut |node| {
        if failure.is_some() {
            return;
        }
        let id = node.target_id;
        if id.is_reserved() {
            failure = Some(format!("{id} is reserved"));
        } else if document.registry.contains(id) || !seen.insert(id) {
            failure = Some(format!("{id} is already registered"));
        } else {
            match document.host.factory.resolve(&node.tag_name, &node.attributes) {
                None => failure = Some(format!("tag `{}` of {id} does not resolve", node.tag_name)),
                Some(class) if !class.container && !node.children.is_empty() => {
                    failure = Some(format!("{id} (`{}`) cannot hold children", class.name));
                }
                Some(_) => {}
            }
        }
    });
    failure.map_or(Ok(()), Err)
}

fn child_count(document: &Document, parent: ElementId) -> usize {
    document.registry.get(parent).map_or(0, |element| element.children().len())
}

/// Whether building a subtree reports `mounted` to the script side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Mounting {
    /// A fresh ADD.
    Announce,
    /// A subtree rebuilt from existing state; the script already saw it mount.
    Silent,
}

/// Build `action` and its nested children under `parent` at `index`.
/// Children of recyclable containers become unrealized data items. A
/// renderable that fails to build skips its subtree.
pub(super) fn build_subtree(
    document: &mut Document,
    parent: ElementId,
    action: &ChangeAction,
    index: usize,
    mounting: Mounting,
) -> bool {
    let id = action.target_id;
    let Some(class) = document.host.factory.resolve(&action.tag_name, &action.attributes) else {
        error!(target: "trellis::engine", "tag `{}` of {id} does not resolve", action.tag_name);
        return false;
    };
    let container = recycler::container_for_child(document, parent);
    let state = ElementState {
        attrs: action.attributes.clone(),
        styles: action.styles.clone(),
        events: action.events.clone(),
        hooks: action.hooks.clone(),
    };

    let binding = if let Some(container) = container {
        Binding::Item(DataItem::new(container))
    } else {
        let parent_handle = document.registry.get(parent).and_then(VirtualElement::render_handle);
        match document
            .host
            .factory
            .create(&action.tag_name, parent_handle, id, &action.attributes)
        {
            Ok(mut renderable) => {
                VirtualElement::bind_state(renderable.as_mut(), &state);
                Binding::Rendered(renderable)
            }
            Err(err) => {
                error!(target: "trellis::engine", "skipping subtree of {id}: {err}");
                return false;
            }
        }
    };

    let element = VirtualElement::new(id, action.tag_name.clone(), class, Some(parent), binding, state);
    let recycler_root = element.is_recycler_root();
    let handle = element.render_handle();
    if let Err(rejected) = document.registry.insert(element) {
        error!(target: "trellis::engine", "{id} is already registered");
        if let Binding::Rendered(mut renderable) = rejected.binding {
            renderable.destroy();
        }
        return false;
    }

    let Some(children) = document.registry.get_mut(parent).and_then(VirtualElement::children_mut) else {
        return false;
    };
    let position = index.min(children.len());
    children.insert(position, id);
    if let Some(handle) = handle {
        let host_index = document.host_index(parent, position);
        document.surface_insert(parent, handle, host_index);
    }

    if container.is_some() {
        recycler::classify_item(document, id);
    }
    if recycler_root {
        let window = 0..document.options.recycler_window;
        document.recyclers.insert(id, RecyclerPool::new(window));
    }
    if mounting == Mounting::Announce && action.hooks.contains(&HookKind::Mounted) {
        document.queue_hook(HookKind::Mounted, id);
    }

    for child in &action.children {
        let len = child_count(document, id);
        build_subtree(document, id, child, child.insertion_index(len), mounting);
    }
    true
}

/// Realize what a freshly built subtree rooted at `id` exposes: the item
/// itself if it sits in a visible position, or the windows of any recyclable
/// containers inside a rendered subtree.
pub(super) fn settle(document: &mut Document, id: ElementId) {
    let Some(element) = document.registry.get(id) else {
        return;
    };
    if element.item_container().is_some() {
        recycler::refresh_item(document, id);
        return;
    }
    let roots: Vec<ElementId> = document
        .registry
        .subtree(id)
        .into_iter()
        .filter(|member| document.recyclers.contains_key(member))
        .collect();
    for root in roots {
        recycler::sync_window(document, root);
    }
}

/// An ADD equivalent to the current state of `id` and its descendants.
pub(super) fn synthesize_add(document: &Document, id: ElementId, parent: ElementId, index: i32) -> Option<ChangeAction> {
    let element = document.registry.get(id)?;
    let mut action = ChangeAction::add(parent, index, id, element.tag.clone());
    action.attributes = element.state.attrs.clone();
    action.styles = element.state.styles.clone();
    action.events = element.state.events.clone();
    action.hooks = element.state.hooks.clone();
    action.children = element
        .children()
        .iter()
        .filter_map(|child| synthesize_add(document, *child, id, APPEND_INDEX))
        .collect();
    Some(action)
}
