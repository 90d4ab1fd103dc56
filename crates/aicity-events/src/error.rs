//! Error types for the event log.

use aicity_types::{EventId, Visibility};

/// Errors that can occur during event log operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// The event does not exist.
    #[error("unknown event {0}")]
    UnknownEvent(EventId),

    /// A caller attempted to move visibility backward.
    ///
    /// Visibility is monotone; this is always a caller bug and is rejected
    /// without mutating the event.
    #[error("visibility of {event} may not move backward: {from:?} -> {to:?}")]
    VisibilityRegression {
        /// The event in question.
        event: EventId,
        /// Its current visibility.
        from: Visibility,
        /// The rejected target visibility.
        to: Visibility,
    },
}
