//! In-memory transport for tests and local runs.
//!
//! [`RecordingTransport`] keeps every sent message and every scheduled task.
//! Nothing fires on its own; tests call [`RecordingTransport::fire`] to run a
//! pending occurrence.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use jibber_core::{OutboundMessage, ScheduledTask, Transport, TransportError, TransportResult};
use parking_lot::Mutex;
use tracing::trace;

struct Pending {
    key: String,
    delay: Duration,
    task: ScheduledTask,
}

/// A transport that records instead of delivering.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutboundMessage>>,
    pending: Mutex<Vec<Pending>>,
    history: Mutex<Vec<(String, Duration)>>,
    fail_sends: AtomicBool,
}

impl RecordingTransport {
    /// Creates an empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.sent.lock().clone()
    }

    /// Drains the sent messages.
    pub fn take_sent(&self) -> Vec<OutboundMessage> {
        std::mem::take(&mut *self.sent.lock())
    }

    /// Keys with a pending occurrence, in scheduling order.
    pub fn scheduled_keys(&self) -> Vec<String> {
        self.pending.lock().iter().map(|p| p.key.clone()).collect()
    }

    /// Every `(key, delay)` ever scheduled.
    pub fn schedule_history(&self) -> Vec<(String, Duration)> {
        self.history.lock().clone()
    }

    /// The delay of the pending occurrence of `key`.
    pub fn pending_delay(&self, key: &str) -> Option<Duration> {
        self.pending
            .lock()
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.delay)
    }

    /// Runs the pending occurrence of `key` as if its delay had elapsed.
    ///
    /// Returns false if nothing is pending under `key`.
    pub fn fire(&self, key: &str) -> bool {
        let task = {
            let mut pending = self.pending.lock();
            match pending.iter().position(|p| p.key == key) {
                Some(index) => pending.remove(index).task,
                None => return false,
            }
        };
        trace!(key, "Firing scheduled task");
        task();
        true
    }

    /// Makes every following send fail until reset.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

impl Transport for RecordingTransport {
    fn send(&self, message: OutboundMessage) -> TransportResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::send_failed("sends are failing"));
        }
        self.sent.lock().push(message);
        Ok(())
    }

    fn schedule(&self, key: &str, delay: Duration, task: ScheduledTask) -> TransportResult<()> {
        let mut pending = self.pending.lock();
        if pending.iter().any(|p| p.key == key) {
            return Err(TransportError::AlreadyScheduled {
                key: key.to_string(),
            });
        }
        pending.push(Pending {
            key: key.to_string(),
            delay,
            task,
        });
        self.history.lock().push((key.to_string(), delay));
        Ok(())
    }

    fn cancel_schedule(&self, key: &str) -> bool {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|p| p.key != key);
        pending.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jibber_core::MessageKind;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_schedule_rejects_pending_key() {
        let transport = RecordingTransport::new();
        transport
            .schedule("k", Duration::from_secs(1), Box::new(|| {}))
            .unwrap();
        assert!(matches!(
            transport.schedule("k", Duration::from_secs(1), Box::new(|| {})),
            Err(TransportError::AlreadyScheduled { .. })
        ));
        assert!(transport.cancel_schedule("k"));
        assert!(!transport.cancel_schedule("k"));
    }

    #[test]
    fn test_fire_runs_task_once() {
        let transport = RecordingTransport::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        transport
            .schedule(
                "k",
                Duration::from_secs(5),
                Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(transport.pending_delay("k"), Some(Duration::from_secs(5)));
        assert!(transport.fire("k"));
        assert!(!transport.fire("k"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_sends() {
        let transport = RecordingTransport::new();
        transport.set_fail_sends(true);
        let message = OutboundMessage::new("a@example.com", "hi", MessageKind::Chat);
        assert!(transport.send(message.clone()).is_err());

        transport.set_fail_sends(false);
        transport.send(message).unwrap();
        assert_eq!(transport.take_sent().len(), 1);
        assert!(transport.sent().is_empty());
    }
}
