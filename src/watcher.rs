use std::sync::Arc;

use tracing::trace;

use crate::health::ConnectionHealth;
use crate::normalizer::{BatchReport, EventNormalizer};
use crate::queue::{EventQueue, Payload};
use crate::sink::NotificationSink;

/// Producer side handed to the stream task.
#[derive(Debug, Clone)]
pub struct EventIntake {
    queue: Arc<EventQueue>,
    health: Arc<ConnectionHealth>,
    accepting: bool,
}

impl EventIntake {
    /// Queue a parsed payload. Without a filter nothing could ever pass, so the
    /// payload is discarded right away.
    pub fn push(&self, payload: Payload) {
        if self.accepting {
            self.queue.push(payload);
        } else {
            trace!("no event filter configured; discarding runtime event");
        }
    }

    pub fn health(&self) -> &ConnectionHealth {
        &self.health
    }
}

/// Runtime event watcher: queue, liveness and normalization in one place.
#[derive(Debug)]
pub struct Watcher {
    queue: Arc<EventQueue>,
    health: Arc<ConnectionHealth>,
    normalizer: EventNormalizer,
}

impl Watcher {
    pub fn new(normalizer: EventNormalizer) -> Self {
        Self {
            queue: Arc::new(EventQueue::new()),
            health: Arc::new(ConnectionHealth::new()),
            normalizer,
        }
    }

    pub fn intake(&self) -> EventIntake {
        EventIntake {
            queue: Arc::clone(&self.queue),
            health: Arc::clone(&self.health),
            accepting: self.normalizer.has_filter(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health.is_alive()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Run one drain cycle: take everything queued so far and deliver what
    /// survives normalization.
    pub fn collect(&self, sink: &dyn NotificationSink) -> BatchReport {
        let batch = self.queue.drain();
        if batch.is_empty() {
            return BatchReport::default();
        }
        self.normalizer.process_batch(&batch, sink)
    }
}
