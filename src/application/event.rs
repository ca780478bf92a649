//! Outbound event queue.
//!
//! The engine publishes into an unbounded channel so a slow or broken
//! consumer can never stall a transaction. A dispatcher (a spawned task or
//! a manual [`EventReceiver::drain`]) forwards events to a [`Notifier`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::port::{Event, Notifier};

/// Create a connected sender/receiver pair.
///
/// `backlog_warning` is the queue depth at which publishing starts warning.
#[must_use]
pub fn channel(backlog_warning: usize) -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let backlog = Arc::new(AtomicUsize::new(0));
    (
        EventSender {
            tx,
            backlog: Arc::clone(&backlog),
            backlog_warning: backlog_warning.max(1),
        },
        EventReceiver { rx, backlog },
    )
}

/// Publishing half of the event queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
    backlog: Arc<AtomicUsize>,
    backlog_warning: usize,
}

impl EventSender {
    /// Enqueue an event. Never blocks and never fails the caller.
    pub fn publish(&self, event: Event) {
        let name = event.name();
        let depth = self.backlog.fetch_add(1, Ordering::AcqRel) + 1;
        if self.tx.send(event).is_err() {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            debug!(event = name, "no event dispatcher, event dropped");
            return;
        }
        if depth % self.backlog_warning == 0 {
            warn!(backlog = depth, "event dispatch is falling behind");
        }
    }

    /// Events published but not yet dispatched.
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }
}

/// Consuming half of the event queue.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
    backlog: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Deliver every queued event to `sink` without waiting. Returns the
    /// number delivered.
    pub fn drain(&mut self, sink: &dyn Notifier) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            sink.notify(event);
            delivered += 1;
        }
        delivered
    }

    /// Forward events to `sink` on a background task until every sender is
    /// dropped. The task yields the number of events delivered.
    pub fn spawn(mut self, sink: Arc<dyn Notifier>) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut delivered = 0;
            while let Some(event) = self.rx.recv().await {
                self.backlog.fetch_sub(1, Ordering::AcqRel);
                sink.notify(event);
                delivered += 1;
            }
            debug!(delivered, "event dispatcher stopped");
            delivered
        })
    }
}
