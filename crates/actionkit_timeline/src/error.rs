// SPDX-License-Identifier: MIT OR Apache-2.0
//! Authoring and document errors.

use crate::event::{EventId, EventKind};

/// Error raised by authoring operations on a timeline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimelineError {
    /// The timeline is playing; authoring is only allowed while stopped
    #[error("Timeline is playing; stop it before editing")]
    Playing,

    /// Event not found
    #[error("Event not found: {0:?}")]
    EventNotFound(EventId),

    /// Duplicate event ID in a loaded document
    #[error("Duplicate event id: {0:?}")]
    DuplicateEvent(EventId),

    /// Frame range outside `0 <= start < end <= total`
    #[error("Invalid frame range [{start}, {end}) for a timeline of {total} frames")]
    InvalidRange {
        /// Requested start frame
        start: u32,
        /// Requested end frame
        end: u32,
        /// Timeline length
        total: u32,
    },

    /// Payload variant does not match the event kind
    #[error("Payload for {found:?} cannot be attached to a {expected:?} event")]
    PayloadKindMismatch {
        /// Kind of the event
        expected: EventKind,
        /// Kind the payload belongs to
        found: EventKind,
    },

    /// Timeline length must be at least one frame
    #[error("Total frames must be at least 1")]
    InvalidTotalFrames,

    /// Frame rate must be at least one frame per second
    #[error("Frames per second must be at least 1")]
    InvalidFrameRate,

    /// The event ID counter cannot advance any further
    #[error("No event ids left to allocate")]
    IdsExhausted,
}

/// Error raised while reading or writing a timeline document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File system error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// RON parse error
    #[error("RON parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),

    /// RON serialization error
    #[error("RON serialization error: {0}")]
    RonWrite(#[from] ron::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Document parsed but describes an invalid timeline
    #[error("Invalid timeline: {0}")]
    Invalid(#[from] TimelineError),

    /// Document written by a newer format version
    #[error("Document version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest version this build reads
        supported: u32,
    },

    /// File extension is neither `.ron` nor `.json`
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
}

/// Error raised by the action controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    /// No action template at this index
    #[error("Action index {index} out of range ({count} actions)")]
    ActionNotFound {
        /// Requested index
        index: usize,
        /// Number of templates
        count: usize,
    },
}
