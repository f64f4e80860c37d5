//! Reconciliation engine.
//!
//! [`apply`] runs one Change Action against a [`Document`]. Structural
//! actions go through `build` (ADD, bodies) and `edit` (MOVE, REMOVE);
//! data updates through `update`; page-level commands through `page`.
//! Hook events queued while an action runs are flushed to the callback sink
//! once the mutation is complete.

use crate::document::Document;
use crate::error::ApplyError;
use actions::{ActionKind, ChangeAction};
use log::trace;

mod build;
mod edit;
mod page;
mod update;

/// Apply `action` to `document`. Must be called on the thread that owns the
/// document. Unresolvable references are dropped and counted in
/// [`Document::stats`]; only a failed type-change replacement is an error.
pub fn apply(document: &mut Document, action: ChangeAction) -> Result<(), ApplyError> {
    trace!(
        target: "trellis::engine",
        "{}: {} target={} parent={} index={}",
        document.page,
        action.kind.name(),
        action.target_id,
        action.parent_id,
        action.index
    );

    let dropped_before = document.stats.dropped;
    let result = match action.kind {
        ActionKind::PreCreateBody => {
            build::pre_create_body(document, &action);
            Ok(())
        }
        ActionKind::CreateBody => {
            build::create_body(document, &action);
            Ok(())
        }
        ActionKind::Add => {
            build::add(document, &action);
            Ok(())
        }
        ActionKind::Move => {
            edit::move_element(document, &action);
            Ok(())
        }
        ActionKind::Remove => {
            edit::remove(document, &action);
            Ok(())
        }
        ActionKind::UpdateStyle => {
            update::update_style(document, &action);
            Ok(())
        }
        ActionKind::UpdateAttrs => update::update_attrs(document, &action),
        ActionKind::AddEvent => {
            update::add_event(document, &action);
            Ok(())
        }
        ActionKind::RemoveEvent => {
            update::remove_event(document, &action);
            Ok(())
        }
        ActionKind::CreateFinish => {
            page::create_finish(document, &action);
            Ok(())
        }
        ActionKind::UpdateFinish => {
            page::update_finish(document, &action);
            Ok(())
        }
        ActionKind::UpdateTitleBar
        | ActionKind::UpdateStatusBar
        | ActionKind::ExitFullscreen
        | ActionKind::SetSecure
        | ActionKind::ScrollTo => {
            page::delegate(document, &action);
            Ok(())
        }
        ActionKind::Statistics => {
            page::statistics(document, &action);
            Ok(())
        }
        ActionKind::HideSkeleton => {
            page::hide_skeleton(document);
            Ok(())
        }
    };

    document.stats.processed += 1;
    if result.is_ok() && document.stats.dropped == dropped_before {
        document.stats.applied += 1;
    }
    document.flush_hooks();
    result
}
