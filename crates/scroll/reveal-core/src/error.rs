//! Error types for the reveal core.

use serde::{Deserialize, Serialize};

use crate::ids::{ContainerId, ElementId};

/// Errors surfaced by parsing and by contract checks.
///
/// Missing targets are not errors: a section whose root has not mounted yet is
/// skipped silently and never reaches this type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum RevealError {
    /// A scroll-position expression could not be parsed.
    #[error("invalid trigger zone '{expr}': {reason}")]
    InvalidZone { expr: String, reason: String },

    /// An easing identifier is not in the supported set.
    #[error("unknown easing '{name}'")]
    UnknownEasing { name: String },

    /// A toggle-actions string did not have four known slots.
    #[error("invalid toggle actions '{spec}'")]
    InvalidToggleActions { spec: String },

    /// A media query could not be parsed.
    #[error("invalid media query '{query}': {reason}")]
    InvalidMediaQuery { query: String, reason: String },

    /// A selector could not be parsed.
    #[error("invalid selector '{selector}'")]
    InvalidSelector { selector: String },

    /// A carousel needs at least one item.
    #[error("carousel requires at least one item")]
    EmptyCarousel,

    /// Smooth scroll `start` was called while an instance is live.
    #[error("smooth scroll is already active")]
    SmoothScrollActive,

    /// Smooth scroll `stop` was called with no live instance.
    #[error("smooth scroll is not active")]
    SmoothScrollInactive,

    /// A context was created for a container whose previous context was never reverted.
    #[error("container {container:?} already has a live animation context")]
    DoubleRegistration { container: ContainerId },

    /// A trigger duplicates the (root, targets) pair of a live trigger in the same context.
    #[error("duplicate trigger for root {root:?} and the same targets")]
    DuplicateTrigger { root: ElementId },

    /// The container id does not refer to a mounted section.
    #[error("unknown container {container:?}")]
    UnknownContainer { container: ContainerId },

    /// The container is not currently in carousel mode.
    #[error("container {container:?} is not in carousel mode")]
    NotCarousel { container: ContainerId },

    /// Catch-all for preset/config deserialization problems.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for RevealError {
    fn from(err: serde_json::Error) -> Self {
        RevealError::Serialization {
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RevealError>;
