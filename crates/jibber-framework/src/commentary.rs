//! Commentary Guard.

use std::collections::VecDeque;

use crate::error::{SetupError, SetupResult};

/// The most recent commentary bodies the bot sent.
///
/// A self-sent message whose body is still in the window is not commented on
/// again. Only the bodies are compared, so a user repeating one of them
/// verbatim is not affected unless they share the bot's nickname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentaryWindow {
    capacity: usize,
    recent: VecDeque<String>,
}

impl CommentaryWindow {
    /// Creates a window holding `capacity` bodies.
    pub fn new(capacity: usize) -> SetupResult<Self> {
        if capacity == 0 {
            return Err(SetupError::InvalidCommentaryQueueSize);
        }
        Ok(Self {
            capacity,
            recent: VecDeque::with_capacity(capacity),
        })
    }

    /// Records a sent body, evicting the oldest when full.
    pub fn push(&mut self, body: impl Into<String>) {
        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(body.into());
    }

    /// Returns true if `body` was sent recently.
    pub fn contains(&self, body: &str) -> bool {
        self.recent.iter().any(|b| b == body)
    }

    /// Number of remembered bodies.
    pub fn len(&self) -> usize {
        self.recent.len()
    }

    /// Returns true if nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Maximum number of remembered bodies.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for CommentaryWindow {
    fn default() -> Self {
        Self {
            capacity: 2,
            recent: VecDeque::with_capacity(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_is_rejected() {
        assert_eq!(
            CommentaryWindow::new(0),
            Err(SetupError::InvalidCommentaryQueueSize)
        );
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut window = CommentaryWindow::new(2).unwrap();
        window.push("hi");
        window.push("bye");
        assert!(window.contains("hi"));
        assert!(window.contains("bye"));

        window.push("again");
        assert!(!window.contains("hi"));
        assert_eq!(window.len(), 2);
    }
}
