use async_channel::{Sender, TrySendError};
use tracing::{info, warn};

use crate::notification::Notification;
use crate::types::Severity;

/// Receives notifications produced by the normalizer.
///
/// Implementations must not block the drain cycle.
pub trait NotificationSink {
    fn deliver(&self, notification: Notification);
}

/// Logs each notification at the level matching its severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, notification: Notification) {
        match notification.severity {
            Severity::Warning => warn!(
                target: "runtime_events::notification",
                title = %notification.title,
                scope = %notification.scope,
                "{notification}"
            ),
            Severity::Info => info!(
                target: "runtime_events::notification",
                title = %notification.title,
                scope = %notification.scope,
                "{notification}"
            ),
        }
    }
}

/// Forwards notifications to a bounded channel, dropping them when it is full.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Notification>,
}

impl ChannelSink {
    pub const fn new(tx: Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl NotificationSink for ChannelSink {
    fn deliver(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(title = %dropped.title, "notification queue full; dropping event");
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(title = %dropped.title, "notification queue closed; dropping event");
            }
        }
    }
}
