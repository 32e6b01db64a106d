//! The transport collaborator.
//!
//! The dispatcher never talks to the network itself. It sends through a
//! [`Transport`] and asks the same object to run one-shot callbacks later.
//! Implementations own the XMPP session, its reconnect policy and its timer
//! wheel; `jibber-runtime` ships a tokio-backed one.

use std::time::Duration;

use crate::error::TransportResult;
use crate::reply::OutboundMessage;

/// A callback run once when its scheduled delay elapses.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Outbound side of the chat session.
pub trait Transport: Send + Sync {
    /// Hands a message to the session. Delivery is best effort.
    fn send(&self, message: OutboundMessage) -> TransportResult<()>;

    /// Runs `task` once after `delay`.
    ///
    /// Fails with [`TransportError::AlreadyScheduled`](crate::TransportError::AlreadyScheduled)
    /// if an occurrence under `key` is still pending.
    fn schedule(&self, key: &str, delay: Duration, task: ScheduledTask) -> TransportResult<()>;

    /// Cancels the pending occurrence under `key`.
    ///
    /// Returns `false` if nothing was scheduled under that key.
    fn cancel_schedule(&self, key: &str) -> bool;
}
