//! Lifecycle hooks the script side can subscribe to, and the notification
//! message sent back to it.

use crate::{ElementId, PageId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named lifecycle event the script side may ask to be notified about.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Serialize, Deserialize)]
pub enum HookKind {
    #[serde(rename = "mounted")]
    Mounted,
    #[serde(rename = "updated")]
    Updated,
    #[serde(rename = "destroy")]
    Destroy,
    #[serde(rename = "createFinish")]
    PageCreateFinished,
    #[serde(rename = "updateFinish")]
    PageUpdateFinished,
}

pub type HookSet = BTreeSet<HookKind>;

/// Fire-and-forget notification toward the script engine.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct HookEvent {
    pub page: PageId,
    pub hook: HookKind,
    pub element: ElementId,
}

impl HookEvent {
    pub const fn new(page: PageId, hook: HookKind, element: ElementId) -> Self {
        Self {
            page,
            hook,
            element,
        }
    }
}
