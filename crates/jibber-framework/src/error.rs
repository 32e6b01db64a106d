//! Error types for handler setup.
//!
//! Only [`SetupError::InvalidCommentaryQueueSize`] aborts a setup; every
//! other variant describes one configuration entry that is logged and
//! skipped.

use thiserror::Error;

/// Errors raised while building handlers and their tables from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// `commentary_qsize` was zero.
    #[error("commentary_qsize must be greater than 0")]
    InvalidCommentaryQueueSize,

    /// No factory is registered for the handler class.
    #[error("handler class '{0}' is not registered")]
    UnknownHandlerClass(String),

    /// The handler factory rejected its constructor arguments.
    #[error("failed to construct handler '{class}': {reason}")]
    HandlerConstruction {
        /// The handler class reference.
        class: String,
        /// Why construction failed.
        reason: String,
    },

    /// A trigger, listener or timer names a method the handler lacks.
    #[error("handler '{alias}' has no method '{method}'")]
    UnknownMethod {
        /// The handler alias.
        alias: String,
        /// The missing method.
        method: String,
    },

    /// A trigger entry is not a `[pattern, method]` pair of strings.
    #[error("{entry} is not a [pattern, method] pair")]
    MalformedTrigger {
        /// The offending entry, as JSON.
        entry: String,
    },

    /// A trigger pattern does not compile once rendered.
    #[error("invalid trigger pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The raw pattern.
        pattern: String,
        /// The regex compiler's complaint.
        reason: String,
    },

    /// A timer delay is neither a non-negative integer nor an ordered pair of them.
    #[error(
        "the value `{value}` is invalid; valid value is either an int or a pair of two \
         integers specifying the range of possible delays"
    )]
    InvalidDelay {
        /// The offending value, as JSON.
        value: String,
    },
}

impl SetupError {
    /// Creates a handler construction error.
    pub fn construction(class: impl Into<String>, reason: impl ToString) -> Self {
        Self::HandlerConstruction {
            class: class.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error aborts the whole setup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidCommentaryQueueSize)
    }
}

/// Result type for setup operations.
pub type SetupResult<T> = Result<T, SetupError>;
