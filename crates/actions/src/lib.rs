//! Change Action model shared by the script side and the rendering thread.
//! This crate centralizes the message types that cross the script/host boundary:
//! element ids, the ordered attribute map, lifecycle hooks and the JSON codec.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod action;
pub use action::{APPEND_INDEX, ActionBatch, ActionKind, ChangeAction};

/// Ordered, last-write-wins string map used for attributes and styles.
pub mod attrs;
pub use attrs::AttrMap;

pub mod codec;
pub use codec::{ProtocolError, decode_actions, decode_batch, encode_batch};

pub mod hooks;
pub use hooks::{HookEvent, HookKind, HookSet};

// ============================
// Stable element ids
// ============================

/// A stable numeric id the script side assigns to every element it creates.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub i64);

impl ElementId {
    /// The document root group (always present).
    pub const DOCUMENT: Self = Self(-1);
    /// The synthetic body group, created lazily.
    pub const BODY: Self = Self(-2);

    /// True for the two ids owned by the document itself.
    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.0 == Self::DOCUMENT.0 || self.0 == Self::BODY.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifies one document (page or card) on the rendering thread.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u32);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page:{}", self.0)
    }
}
