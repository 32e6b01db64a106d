//! Error types for the jibber core.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The session is not connected.
    #[error("transport is not connected")]
    NotConnected,

    /// The message could not be handed to the session.
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// A scheduled occurrence already exists under this key.
    #[error("'{key}' is already scheduled")]
    AlreadyScheduled {
        /// The scheduler key.
        key: String,
    },

    /// The scheduler no longer accepts work.
    #[error("scheduler is closed")]
    SchedulerClosed,
}

impl TransportError {
    /// Creates a send failure.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed(reason.into())
    }
}

// =============================================================================
// Markup Errors
// =============================================================================

/// Reasons a markup companion is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    /// The parser rejected the input.
    #[error("malformed markup: {0}")]
    Malformed(String),

    /// An element was opened and never closed.
    #[error("unclosed element")]
    Unclosed,

    /// More than one top-level element.
    #[error("markup has more than one root element")]
    MultipleRoots,

    /// Non-whitespace text outside the root element.
    #[error("text outside the root element")]
    TextOutsideRoot,

    /// No element at all.
    #[error("markup has no root element")]
    Empty,
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
