use crate::transition::TransitionState;
use actions::ElementId;
use thiserror::Error;

/// Raised by an [`crate::ElementFactory`] that cannot build a renderable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FactoryError {
    #[error("no component registered for tag `{0}`")]
    UnknownTag(String),

    #[error("component `{class}` could not be constructed: {reason}")]
    Construction { class: String, reason: String },
}

/// Failures `apply` reports to its caller. Unresolvable references are not
/// errors: those actions are dropped and logged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApplyError {
    #[error("could not synthesize replacement for {id}: {reason}")]
    Synthesis { id: ElementId, reason: String },
}

impl ApplyError {
    pub(crate) fn synthesis(id: ElementId, reason: impl Into<String>) -> Self {
        Self::Synthesis {
            id,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot {operation} while {state:?}")]
    InvalidState {
        operation: &'static str,
        state: TransitionState,
    },

    #[error("no window surface is bound to the document")]
    NoWindow,

    #[error("the document root has no renderable")]
    NoRootRenderable,
}
