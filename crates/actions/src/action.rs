//! The Change Action: one tree-mutation command produced by the script engine.

use crate::{AttrMap, ElementId, HookKind, HookSet, PageId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Sentinel insertion index meaning "append after the last child".
pub const APPEND_INDEX: i32 = -1;

/// Every command the reconciliation engine understands.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    PreCreateBody,
    CreateBody,
    Add,
    Move,
    Remove,
    UpdateStyle,
    UpdateAttrs,
    AddEvent,
    RemoveEvent,
    CreateFinish,
    UpdateFinish,
    UpdateTitleBar,
    UpdateStatusBar,
    ExitFullscreen,
    SetSecure,
    ScrollTo,
    Statistics,
    HideSkeleton,
}

impl ActionKind {
    pub const ALL: [Self; 18] = [
        Self::PreCreateBody,
        Self::CreateBody,
        Self::Add,
        Self::Move,
        Self::Remove,
        Self::UpdateStyle,
        Self::UpdateAttrs,
        Self::AddEvent,
        Self::RemoveEvent,
        Self::CreateFinish,
        Self::UpdateFinish,
        Self::UpdateTitleBar,
        Self::UpdateStatusBar,
        Self::ExitFullscreen,
        Self::SetSecure,
        Self::ScrollTo,
        Self::Statistics,
        Self::HideSkeleton,
    ];

    /// Wire name, as produced by the serde representation.
    pub const fn name(self) -> &'static str {
        match self {
            Self::PreCreateBody => "preCreateBody",
            Self::CreateBody => "createBody",
            Self::Add => "add",
            Self::Move => "move",
            Self::Remove => "remove",
            Self::UpdateStyle => "updateStyle",
            Self::UpdateAttrs => "updateAttrs",
            Self::AddEvent => "addEvent",
            Self::RemoveEvent => "removeEvent",
            Self::CreateFinish => "createFinish",
            Self::UpdateFinish => "updateFinish",
            Self::UpdateTitleBar => "updateTitleBar",
            Self::UpdateStatusBar => "updateStatusBar",
            Self::ExitFullscreen => "exitFullscreen",
            Self::SetSecure => "setSecure",
            Self::ScrollTo => "scrollTo",
            Self::Statistics => "statistics",
            Self::HideSkeleton => "hideSkeleton",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Kinds routed straight to the page delegate.
    pub const fn is_page_delegate(self) -> bool {
        matches!(
            self,
            Self::UpdateTitleBar
                | Self::UpdateStatusBar
                | Self::ExitFullscreen
                | Self::SetSecure
                | Self::ScrollTo
        )
    }
}

/// A single mutation command, or a small tree of them for bulk creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAction {
    pub kind: ActionKind,
    #[serde(default)]
    pub target_id: ElementId,
    #[serde(default)]
    pub parent_id: ElementId,
    #[serde(default = "append_index")]
    pub index: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub attributes: AttrMap,
    #[serde(default, skip_serializing_if = "AttrMap::is_empty")]
    pub styles: AttrMap,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub events: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ChangeAction>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub hooks: HookSet,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub extra: Value,
}

const fn append_index() -> i32 {
    APPEND_INDEX
}

impl ChangeAction {
    /// An action of `kind` with every other field empty.
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            target_id: ElementId::default(),
            parent_id: ElementId::default(),
            index: APPEND_INDEX,
            tag_name: String::new(),
            attributes: AttrMap::new(),
            styles: AttrMap::new(),
            events: BTreeSet::new(),
            children: Vec::new(),
            hooks: HookSet::new(),
            extra: Value::Null,
        }
    }

    /// ADD `id` with `tag` under `parent` at `index`.
    pub fn add(parent: ElementId, index: i32, id: ElementId, tag: impl Into<String>) -> Self {
        Self {
            target_id: id,
            parent_id: parent,
            index,
            tag_name: tag.into(),
            ..Self::new(ActionKind::Add)
        }
    }

    pub fn remove(id: ElementId) -> Self {
        Self::new(ActionKind::Remove).targeting(id)
    }

    pub fn move_to(id: ElementId, parent: ElementId, index: i32) -> Self {
        Self {
            target_id: id,
            parent_id: parent,
            index,
            ..Self::new(ActionKind::Move)
        }
    }

    pub fn update_style(id: ElementId) -> Self {
        Self::new(ActionKind::UpdateStyle).targeting(id)
    }

    pub fn update_attrs(id: ElementId) -> Self {
        Self::new(ActionKind::UpdateAttrs).targeting(id)
    }

    pub fn add_event(id: ElementId, event: impl Into<String>) -> Self {
        Self::new(ActionKind::AddEvent).targeting(id).with_event(event)
    }

    pub fn remove_event(id: ElementId, event: impl Into<String>) -> Self {
        Self::new(ActionKind::RemoveEvent)
            .targeting(id)
            .with_event(event)
    }

    #[must_use]
    pub fn targeting(mut self, id: ElementId) -> Self {
        self.target_id = id;
        self
    }

    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_style(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.styles.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.events.insert(event.into());
        self
    }

    #[must_use]
    pub fn with_hook(mut self, hook: HookKind) -> Self {
        self.hooks.insert(hook);
        self
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: Value) -> Self {
        self.extra = extra;
        self
    }

    /// Resolve `index` against a child list of length `len`; negative or
    /// out-of-range values append.
    pub fn insertion_index(&self, len: usize) -> usize {
        usize::try_from(self.index).map_or(len, |index| index.min(len))
    }

    /// Visit this action and every nested child action in pre-order.
    pub fn walk<'tree>(&'tree self, visit: &mut impl FnMut(&'tree Self)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// The unit handed from the script thread to the rendering thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionBatch {
    pub page: PageId,
    pub actions: Vec<ChangeAction>,
}

impl ActionBatch {
    pub const fn new(page: PageId, actions: Vec<ChangeAction>) -> Self {
        Self { page, actions }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests unwrap freely")]
mod tests {
    use super::*;

    #[test]
    fn insertion_index_appends_for_sentinel_and_overflow() {
        let append = ChangeAction::add(ElementId::BODY, APPEND_INDEX, ElementId(1), "text");
        assert_eq!(append.insertion_index(3), 3);
        let overflow = ChangeAction::add(ElementId::BODY, 10, ElementId(1), "text");
        assert_eq!(overflow.insertion_index(3), 3);
        let inside = ChangeAction::add(ElementId::BODY, 1, ElementId(1), "text");
        assert_eq!(inside.insertion_index(3), 1);
    }

    #[test]
    fn every_kind_round_trips_its_wire_name() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_name(kind.name()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
        assert_eq!(ActionKind::from_name("teleport"), None);
    }

    #[test]
    fn walk_visits_children_in_pre_order() {
        let tree = ChangeAction::add(ElementId::BODY, 0, ElementId(1), "div")
            .with_child(
                ChangeAction::add(ElementId(1), 0, ElementId(2), "div")
                    .with_child(ChangeAction::add(ElementId(2), 0, ElementId(3), "text")),
            )
            .with_child(ChangeAction::add(ElementId(1), 1, ElementId(4), "text"));
        let mut seen = Vec::new();
        tree.walk(&mut |action| seen.push(action.target_id.0));
        assert_eq!(seen, vec![1, 2, 3, 4]);
    }
}
