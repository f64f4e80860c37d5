//! Page-level actions: lifecycle notifications, delegate routing, statistics
//! and skeleton removal.

use crate::document::Document;
use crate::host::{ClickRecord, ScrollRequest};
use actions::{ActionKind, ChangeAction, ElementId, HookKind};
use log::debug;
use serde_json::Value;

/// The first CREATE_FINISH marks the page created; later ones only fire the
/// requested hook.
pub(super) fn create_finish(document: &mut Document, action: &ChangeAction) {
    let first = !document.create_finished;
    document.create_finished = true;
    if first {
        debug!(target: "trellis::engine", "{} finished initial creation", document.page);
        if let Some(delegate) = document.host.delegate.as_mut() {
            delegate.page_created(document.page);
        }
    }
    if action.hooks.contains(&HookKind::PageCreateFinished) {
        document.queue_hook(HookKind::PageCreateFinished, ElementId::DOCUMENT);
    }
}

pub(super) fn update_finish(document: &mut Document, action: &ChangeAction) {
    if action.hooks.contains(&HookKind::PageUpdateFinished) {
        document.queue_hook(HookKind::PageUpdateFinished, ElementId::DOCUMENT);
    }
}

/// SET_SECURE reads `secure` from the attributes; absent means on.
fn secure_flag(action: &ChangeAction) -> bool {
    action
        .attributes
        .get("secure")
        .is_none_or(|value| !matches!(value.trim(), "false" | "0" | "no"))
}

pub(super) fn delegate(document: &mut Document, action: &ChangeAction) {
    let scroll_target = (!action.target_id.is_reserved() && document.registry.contains(action.target_id))
        .then_some(action.target_id);
    let Some(delegate) = document.host.delegate.as_mut() else {
        document.note_dropped(action.kind.name(), action.target_id, "no page delegate is bound");
        return;
    };
    match action.kind {
        ActionKind::UpdateTitleBar => delegate.update_title_bar(&action.attributes),
        ActionKind::UpdateStatusBar => delegate.update_status_bar(&action.attributes),
        ActionKind::ExitFullscreen => delegate.exit_fullscreen(),
        ActionKind::SetSecure => delegate.set_secure(secure_flag(action)),
        ActionKind::ScrollTo => delegate.scroll_to(&ScrollRequest::from_attrs(scroll_target, &action.attributes)),
        _ => {}
    }
}

fn element_ref(event: &Value) -> Option<ElementId> {
    match event.get("ref")? {
        Value::Number(number) => number.as_i64().map(ElementId),
        Value::String(text) => text.trim().parse().ok().map(ElementId),
        _ => None,
    }
}

/// Forward click events from `extra.events` to telemetry as element
/// snapshots. Other event types are ignored.
pub(super) fn statistics(document: &mut Document, action: &ChangeAction) {
    if document.host.telemetry.is_none() {
        return;
    }
    let Some(events) = action.extra.get("events").and_then(Value::as_array) else {
        debug!(target: "trellis::engine", "{}: statistics without events", document.page);
        return;
    };

    let mut clicks = Vec::new();
    for event in events {
        let kind = event.get("type").and_then(Value::as_str).unwrap_or_default();
        if kind != "click" {
            continue;
        }
        let Some(id) = element_ref(event) else {
            continue;
        };
        let Some(element) = document.registry.get(id) else {
            debug!(target: "trellis::engine", "{}: click on unknown {id}", document.page);
            continue;
        };
        clicks.push(ClickRecord {
            page: document.page,
            element: id,
            tag: element.tag().to_owned(),
            handle: element.render_handle(),
            event: kind.to_owned(),
        });
    }

    if let Some(telemetry) = document.host.telemetry.as_mut() {
        for click in clicks {
            telemetry.record_click(click);
        }
    }
}

pub(super) fn hide_skeleton(document: &mut Document) {
    if document.hide_skeleton_requested {
        return;
    }
    document.hide_skeleton_requested = true;
    match document.host.delegate.as_mut() {
        Some(delegate) => delegate.hide_skeleton(),
        None => debug!(target: "trellis::engine", "{}: no delegate to hide the skeleton", document.page),
    }
}
