//! MOVE and REMOVE.

use super::build::{self, Mounting};
use crate::document::{BODY_TAG, Document};
use crate::element::{Binding, VirtualElement};
use crate::recycler;
use actions::{ChangeAction, ElementId, HookKind};
use log::{error, trace};

pub(super) fn move_element(document: &mut Document, action: &ChangeAction) {
    let id = action.target_id;
    let new_parent = action.parent_id;
    if id == ElementId::DOCUMENT {
        document.note_dropped("move", id, "the document root cannot move");
        return;
    }
    if !document.registry.contains(id) {
        document.note_dropped("move", id, "target is not registered");
        return;
    }
    if new_parent == ElementId::BODY && !build::ensure_body(document, BODY_TAG) {
        document.note_dropped("move", id, "body could not be built");
        return;
    }
    let sibling_count = match document.registry.get(new_parent) {
        Some(parent) if parent.is_group() => parent.children().len(),
        Some(_) => {
            document.note_dropped("move", id, &format!("{new_parent} is not a group"));
            return;
        }
        None => {
            document.note_dropped("move", id, &format!("parent {new_parent} is not registered"));
            return;
        }
    };
    if document.registry.is_ancestor(id, new_parent) {
        document.note_dropped("move", id, "cannot move into its own subtree");
        return;
    }
    let Some((old_parent, old_position)) = document.registry.index_in_parent(id) else {
        document.note_dropped("move", id, "target is detached");
        return;
    };

    let sibling_count = sibling_count - usize::from(old_parent == new_parent);
    let position = action.insertion_index(sibling_count);
    if old_parent == new_parent && old_position == position {
        trace!(target: "trellis::engine", "{id} already at {new_parent}[{position}]");
        return;
    }

    let from = document.registry.get(id).and_then(VirtualElement::item_container);
    let to = recycler::container_for_child(document, new_parent);
    if from != to {
        rebuild(document, id, new_parent, position);
    } else if from.is_some() {
        move_item(document, id, old_parent, new_parent, position);
    } else {
        move_rendered(document, id, old_parent, new_parent, position);
    }
}

fn move_rendered(document: &mut Document, id: ElementId, old_parent: ElementId, new_parent: ElementId, position: usize) {
    let handle = document.registry.get(id).and_then(VirtualElement::render_handle);
    unlink(document, old_parent, id);
    link(document, new_parent, id, position);
    let Some(handle) = handle else {
        return;
    };
    let host_index = document.host_index(new_parent, position);
    if old_parent == new_parent {
        document.surface_reorder(new_parent, handle, host_index);
    } else {
        document.surface_remove(old_parent, handle);
        document.surface_insert(new_parent, handle, host_index);
    }
}

fn move_item(document: &mut Document, id: ElementId, old_parent: ElementId, new_parent: ElementId, position: usize) {
    recycler::release(document, id);
    unlink(document, old_parent, id);
    link(document, new_parent, id, position);
    if old_parent != new_parent && document.recyclers.contains_key(&old_parent) {
        recycler::sync_window(document, old_parent);
    }
    recycler::refresh_item(document, id);
}

/// Moves across the recycler boundary change how the subtree is bound, so
/// it is torn down silently and rebuilt from its current state.
fn rebuild(document: &mut Document, id: ElementId, new_parent: ElementId, position: usize) {
    let Some(snapshot) = build::synthesize_add(document, id, new_parent, position as i32) else {
        return;
    };
    trace!(target: "trellis::engine", "rebuilding {id} under {new_parent}");
    discard(document, id);
    if build::build_subtree(document, new_parent, &snapshot, position, Mounting::Silent) {
        build::settle(document, id);
    } else {
        error!(target: "trellis::engine", "{id} was lost while moving under {new_parent}");
    }
}

pub(super) fn remove(document: &mut Document, action: &ChangeAction) {
    let id = action.target_id;
    if id == ElementId::DOCUMENT {
        document.note_dropped("remove", id, "the document root cannot be removed");
        return;
    }
    if !document.registry.contains(id) {
        document.note_dropped("remove", id, "target is not registered");
        return;
    }

    let interested: Vec<ElementId> = document
        .registry
        .subtree(id)
        .into_iter()
        .filter(|member| {
            document
                .registry
                .get(*member)
                .is_some_and(|element| element.wants_hook(HookKind::Destroy))
                || (*member == id && action.hooks.contains(&HookKind::Destroy))
        })
        .collect();
    for member in interested {
        document.queue_hook(HookKind::Destroy, member);
    }
    discard(document, id);
}

/// Detach `id` from its parent, release or destroy every renderable in its
/// subtree and unregister all of it.
fn discard(document: &mut Document, id: ElementId) {
    let Some(element) = document.registry.get(id) else {
        return;
    };
    let parent = element.parent;
    let is_item = element.item_container().is_some();
    let handle = element.render_handle();

    if is_item {
        recycler::release(document, id);
    } else if let (Some(parent), Some(handle)) = (parent, handle) {
        document.surface_remove(parent, handle);
    }
    if let Some(parent) = parent {
        unlink(document, parent, id);
    }

    for mut removed in document.registry.remove_subtree(id) {
        if let Some(mut pool) = document.recyclers.remove(&removed.id) {
            pool.destroy_idle();
        }
        match &mut removed.binding {
            Binding::Rendered(renderable) => renderable.destroy(),
            Binding::Item(item) => {
                if let (Some(pool), Some(shape)) = (document.recyclers.get_mut(&item.container), &item.shape) {
                    pool.detach(shape);
                }
                if let Some(mut slot) = item.slot.take() {
                    slot.destroy();
                }
            }
        }
    }

    if let Some(parent) = parent.filter(|container| document.recyclers.contains_key(container)) {
        recycler::sync_window(document, parent);
    }
}

fn unlink(document: &mut Document, parent: ElementId, id: ElementId) {
    if let Some(children) = document.registry.get_mut(parent).and_then(VirtualElement::children_mut) {
        children.retain(|child| *child != id);
    }
}

fn link(document: &mut Document, parent: ElementId, id: ElementId, position: usize) {
    if let Some(children) = document.registry.get_mut(parent).and_then(VirtualElement::children_mut) {
        let position = position.min(children.len());
        children.insert(position, id);
    }
    if let Some(element) = document.registry.get_mut(id) {
        element.parent = Some(parent);
    }
}
