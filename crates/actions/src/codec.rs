//! JSON transport for Change Actions.
//!
//! Batches are validated as a whole before they are decoded: a single action of
//! an unknown kind, at any nesting depth, rejects the entire batch so that a
//! script/host version mismatch is never partially applied.

use crate::{ActionBatch, ActionKind, ChangeAction};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown action kind `{0}`")]
    UnknownActionKind(String),

    #[error("action is missing its `kind` field")]
    MissingKind,

    #[error("malformed action batch: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encode a batch as a single JSON document.
pub fn encode_batch(batch: &ActionBatch) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(batch)?)
}

/// Only the fields needed to validate action kinds. Everything else in the
/// document is skipped, so validation never reorders attribute maps.
#[derive(Deserialize)]
struct ActionOutline {
    kind: Option<String>,
    #[serde(default)]
    children: Vec<ActionOutline>,
}

#[derive(Deserialize)]
struct BatchOutline {
    #[serde(default)]
    actions: Vec<ActionOutline>,
}

/// Decode a batch encoded by [`encode_batch`].
pub fn decode_batch(text: &str) -> Result<ActionBatch, ProtocolError> {
    let outline: BatchOutline = serde_json::from_str(text)?;
    outline.actions.iter().try_for_each(check_kinds)?;
    Ok(serde_json::from_str(text)?)
}

/// Decode a bare JSON array of actions.
pub fn decode_actions(text: &str) -> Result<Vec<ChangeAction>, ProtocolError> {
    let outline: Vec<ActionOutline> = serde_json::from_str(text)?;
    outline.iter().try_for_each(check_kinds)?;
    Ok(serde_json::from_str(text)?)
}

fn check_kinds(action: &ActionOutline) -> Result<(), ProtocolError> {
    let name = action.kind.as_deref().ok_or(ProtocolError::MissingKind)?;
    if ActionKind::from_name(name).is_none() {
        return Err(ProtocolError::UnknownActionKind(name.to_owned()));
    }
    action.children.iter().try_for_each(check_kinds)
}
