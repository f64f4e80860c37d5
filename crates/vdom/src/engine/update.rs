//! UPDATE_STYLE, UPDATE_ATTRS (including type change), ADD_EVENT and
//! REMOVE_EVENT.

use crate::document::Document;
use crate::element::{Binding, ElementState, VirtualElement};
use crate::error::ApplyError;
use crate::host::{ComponentClass, RenderHandle};
use crate::recycler::{self, RecyclerPool};
use actions::{ChangeAction, ElementId, HookKind};
use log::{debug, trace};
use std::mem;

pub(super) fn update_style(document: &mut Document, action: &ChangeAction) {
    if !document.registry.contains(action.target_id) {
        document.stats.dropped += 1;
        debug!(target: "trellis::engine", "{}: style update for unknown {}", document.page, action.target_id);
        return;
    }
    merge_styles(document, action);
}

/// Nested children of a style action address other elements of the same
/// subtree; each is merged independently.
fn merge_styles(document: &mut Document, action: &ChangeAction) {
    let id = action.target_id;
    match document.registry.get_mut(id) {
        Some(element) => {
            element.state.styles.merge(&action.styles);
            element.state.hooks.extend(action.hooks.iter().copied());
            if !action.styles.is_empty() {
                if let Some(renderable) = element.renderable_mut() {
                    renderable.apply_styles(&action.styles);
                }
            }
            if element.wants_hook(HookKind::Updated) {
                document.queue_hook(HookKind::Updated, id);
            }
        }
        None => debug!(target: "trellis::engine", "{}: nested style update for unknown {id}", document.page),
    }
    for child in &action.children {
        merge_styles(document, child);
    }
}

pub(super) fn update_attrs(document: &mut Document, action: &ChangeAction) -> Result<(), ApplyError> {
    let id = action.target_id;
    let Some(element) = document.registry.get(id) else {
        document.note_dropped("update attrs", id, "target is not registered");
        return Ok(());
    };

    if document.options.type_change.implies_type_change(&element.tag, &action.attributes) {
        let merged = element.state.attrs.merged(&action.attributes);
        let class = document.host.factory.resolve(&element.tag, &merged).ok_or_else(|| {
            ApplyError::synthesis(id, format!("tag `{}` does not resolve for the new attributes", element.tag))
        })?;
        if class != element.class {
            trace!(target: "trellis::engine", "{id}: `{}` -> `{}`", element.class.name, class.name);
            return if element.item_container().is_some() {
                change_item_class(document, id, class, action)
            } else {
                replace_rendered(document, id, class, action)
            };
        }
    }

    merge_attrs(document, id, action);
    Ok(())
}

fn merge_attrs(document: &mut Document, id: ElementId, action: &ChangeAction) {
    let Some(element) = document.registry.get_mut(id) else {
        return;
    };
    element.state.attrs.merge(&action.attributes);
    element.state.hooks.extend(action.hooks.iter().copied());
    if let Some(renderable) = element.renderable_mut() {
        renderable.apply_attrs(&action.attributes);
    }
    let is_item = element.item_container().is_some();
    let wants_hook = element.wants_hook(HookKind::Updated);

    if is_item && recycler::classify_item(document, id) {
        recycler::refresh_item(document, id);
    }
    if wants_hook {
        document.queue_hook(HookKind::Updated, id);
    }
}

fn accepts_children(element: &VirtualElement, class: &ComponentClass) -> Result<(), ApplyError> {
    if !class.container && !element.children().is_empty() {
        return Err(ApplyError::synthesis(
            element.id,
            format!("leaf class `{}` cannot hold {} existing children", class.name, element.children().len()),
        ));
    }
    Ok(())
}

/// The state a replacement is built from: union of the current state and the
/// update.
fn replacement_state(element: &VirtualElement, action: &ChangeAction) -> ElementState {
    let mut state = element.state.clone();
    state.attrs.merge(&action.attributes);
    state.hooks.extend(action.hooks.iter().copied());
    state
}

/// Data items carry no renderable of their own; the new class takes effect
/// when the item is next realized.
fn change_item_class(
    document: &mut Document,
    id: ElementId,
    class: ComponentClass,
    action: &ChangeAction,
) -> Result<(), ApplyError> {
    let Some(element) = document.registry.get(id) else {
        return Ok(());
    };
    accepts_children(element, &class)?;
    let state = replacement_state(element, action);

    recycler::release(document, id);
    if let Some(target) = document.registry.get_mut(id) {
        target.set_class(class);
        target.state = state;
    }
    recycler::classify_item(document, id);
    recycler::refresh_item(document, id);

    if document.registry.get(id).is_some_and(|updated| updated.wants_hook(HookKind::Updated)) {
        document.queue_hook(HookKind::Updated, id);
    }
    Ok(())
}

/// Build the replacement renderable first; the element is only touched once
/// that succeeded. Child renderables move over in order and the replacement
/// takes the old host position.
fn replace_rendered(
    document: &mut Document,
    id: ElementId,
    class: ComponentClass,
    action: &ChangeAction,
) -> Result<(), ApplyError> {
    let Some(element) = document.registry.get(id) else {
        return Ok(());
    };
    accepts_children(element, &class)?;
    if class.recycler != element.class.recycler && !element.children().is_empty() {
        return Err(ApplyError::synthesis(
            id,
            "cannot switch virtualization of a populated container",
        ));
    }

    let state = replacement_state(element, action);
    let parent = element.parent;
    let parent_handle = parent
        .and_then(|parent_id| document.registry.get(parent_id))
        .and_then(VirtualElement::render_handle);
    let child_handles: Vec<RenderHandle> = element
        .children()
        .iter()
        .filter_map(|child| document.registry.get(*child).and_then(VirtualElement::render_handle))
        .collect();
    let was_recycler = element.class.recycler;

    let mut replacement = document
        .host
        .factory
        .create(&element.tag, parent_handle, id, &state.attrs)
        .map_err(|err| ApplyError::synthesis(id, err.to_string()))?;
    VirtualElement::bind_state(replacement.as_mut(), &state);
    let new_handle = replacement.handle();

    let Some(target) = document.registry.get_mut(id) else {
        replacement.destroy();
        return Ok(());
    };
    let mut previous = match &mut target.binding {
        Binding::Rendered(current) => mem::replace(current, replacement),
        Binding::Item(_) => {
            replacement.destroy();
            return Err(ApplyError::synthesis(id, "element is not bound to a renderable"));
        }
    };
    let is_recycler = class.recycler;
    target.set_class(class);
    target.state = state;
    let wants_hook = target.wants_hook(HookKind::Updated);

    if let Some(surface) = previous.surface_mut() {
        for handle in &child_handles {
            surface.remove_child(*handle);
        }
    }
    if let Some(surface) = target.renderable_mut().and_then(|renderable| renderable.surface_mut()) {
        for (index, handle) in child_handles.iter().enumerate() {
            surface.insert_child(*handle, index);
        }
    }

    let old_handle = previous.handle();
    if let Some((host_parent, position)) = document.registry.index_in_parent(id) {
        let host_index = document.host_index(host_parent, position);
        document.surface_remove(host_parent, old_handle);
        document.surface_insert(host_parent, new_handle, host_index);
    }
    previous.destroy();
    debug!(target: "trellis::engine", "{id} rebuilt as {new_handle} (was {old_handle})");

    if is_recycler && !was_recycler {
        let window = 0..document.options.recycler_window;
        document.recyclers.insert(id, RecyclerPool::new(window));
    } else if was_recycler && !is_recycler {
        if let Some(mut pool) = document.recyclers.remove(&id) {
            pool.destroy_idle();
        }
    }

    if wants_hook {
        document.queue_hook(HookKind::Updated, id);
    }
    Ok(())
}

pub(super) fn add_event(document: &mut Document, action: &ChangeAction) {
    let id = action.target_id;
    let Some(element) = document.registry.get_mut(id) else {
        document.note_dropped("add event", id, "target is not registered");
        return;
    };
    let added: Vec<&String> = action
        .events
        .iter()
        .filter(|event| element.state.events.insert((*event).clone()))
        .collect();
    if let Some(renderable) = element.renderable_mut() {
        for event in added {
            renderable.bind_event(event);
        }
    }
}

pub(super) fn remove_event(document: &mut Document, action: &ChangeAction) {
    let id = action.target_id;
    let Some(element) = document.registry.get_mut(id) else {
        document.note_dropped("remove event", id, "target is not registered");
        return;
    };
    let removed: Vec<&String> = action
        .events
        .iter()
        .filter(|event| element.state.events.remove(*event))
        .collect();
    if let Some(renderable) = element.renderable_mut() {
        for event in removed {
            renderable.unbind_event(event);
        }
    }
}
