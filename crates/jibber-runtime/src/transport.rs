//! A tokio-backed transport.
//!
//! [`ChannelTransport`] hands outbound messages to whoever owns the chat
//! session through an unbounded channel, and runs scheduled tasks as
//! one-shot tokio tasks that can be cancelled by key.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use jibber_core::{OutboundMessage, ScheduledTask, Transport, TransportError, TransportResult};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

struct PendingTask {
    id: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct Schedule {
    next_id: AtomicU64,
    pending: Mutex<HashMap<String, PendingTask>>,
}

/// A [`Transport`] over a tokio channel and tokio timers.
#[derive(Clone)]
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<OutboundMessage>,
    handle: Handle,
    schedule: Arc<Schedule>,
    shutdown: CancellationToken,
}

impl ChannelTransport {
    /// Creates a transport on the current tokio runtime.
    ///
    /// Returns the receiving end of the outbound channel.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        Self::with_handle(Handle::current())
    }

    /// Creates a transport that spawns its timers on `handle`.
    pub fn with_handle(handle: Handle) -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let transport = Self {
            outbound,
            handle,
            schedule: Arc::new(Schedule::default()),
            shutdown: CancellationToken::new(),
        };
        (transport, rx)
    }

    /// Number of pending scheduled tasks.
    pub fn pending(&self) -> usize {
        self.schedule.pending.lock().len()
    }

    /// Returns true if an occurrence is pending under `key`.
    pub fn is_scheduled(&self, key: &str) -> bool {
        self.schedule.pending.lock().contains_key(key)
    }

    /// Cancels every pending task and refuses new ones.
    pub fn close(&self) {
        self.shutdown.cancel();
        let drained: Vec<_> = self.schedule.pending.lock().drain().collect();
        for (key, task) in drained {
            trace!(key = %key, "Cancelling scheduled task on close");
            task.token.cancel();
        }
    }
}

impl Transport for ChannelTransport {
    fn send(&self, message: OutboundMessage) -> TransportResult<()> {
        self.outbound
            .send(message)
            .map_err(|_| TransportError::NotConnected)
    }

    fn schedule(&self, key: &str, delay: Duration, task: ScheduledTask) -> TransportResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(TransportError::SchedulerClosed);
        }

        let id = self.schedule.next_id.fetch_add(1, Ordering::Relaxed);
        let token = self.shutdown.child_token();
        {
            let mut pending = self.schedule.pending.lock();
            if pending.contains_key(key) {
                return Err(TransportError::AlreadyScheduled {
                    key: key.to_string(),
                });
            }
            pending.insert(
                key.to_string(),
                PendingTask {
                    id,
                    token: token.clone(),
                },
            );
        }

        let schedule = self.schedule.clone();
        let key = key.to_string();
        self.handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(key = %key, "Scheduled task cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    {
                        let mut pending = schedule.pending.lock();
                        // a cancel followed by a reschedule may have replaced this entry
                        if pending.get(&key).is_some_and(|p| p.id == id) {
                            pending.remove(&key);
                        } else {
                            return;
                        }
                    }
                    debug!(key = %key, "Running scheduled task");
                    task();
                }
            }
        });
        Ok(())
    }

    fn cancel_schedule(&self, key: &str) -> bool {
        match self.schedule.pending.lock().remove(key) {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jibber_core::MessageKind;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, ScheduledTask) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (
            count,
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[tokio::test]
    async fn test_send_reaches_receiver() {
        let (transport, mut rx) = ChannelTransport::new();
        let message = OutboundMessage::new("room@chat.example.com", "hi", MessageKind::Groupchat);
        transport.send(message.clone()).unwrap();
        assert_eq!(rx.recv().await, Some(message));

        drop(rx);
        assert!(matches!(
            transport.send(OutboundMessage::new("a", "b", MessageKind::Chat)),
            Err(TransportError::NotConnected)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_task_fires_once() {
        let (transport, _rx) = ChannelTransport::new();
        let (count, task) = counter();
        transport.schedule("k", Duration::from_secs(10), task).unwrap();
        assert!(transport.is_scheduled("k"));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!transport.is_scheduled("k"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_duplicate_keys() {
        let (transport, _rx) = ChannelTransport::new();
        let (count, task) = counter();
        transport.schedule("k", Duration::from_secs(10), task).unwrap();

        let (_, other) = counter();
        assert!(matches!(
            transport.schedule("k", Duration::from_secs(1), other),
            Err(TransportError::AlreadyScheduled { .. })
        ));

        assert!(transport.cancel_schedule("k"));
        assert!(!transport.cancel_schedule("k"));
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_refuses_new_tasks() {
        let (transport, _rx) = ChannelTransport::new();
        let (count, task) = counter();
        transport.schedule("k", Duration::from_secs(5), task).unwrap();

        transport.close();
        assert_eq!(transport.pending(), 0);
        let (_, other) = counter();
        assert!(matches!(
            transport.schedule("j", Duration::from_secs(1), other),
            Err(TransportError::SchedulerClosed)
        ));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
