use async_channel::Receiver;
use runtime_events::Notification;
use runtime_events::sink::{NotificationSink, TracingSink};
use runtime_events::util::time::fmt_epoch_local;
use tracing::info;

/// Deliver queued notifications until the channel closes.
pub async fn run_notifier(rx: Receiver<Notification>, dry_run: bool) -> usize {
    let sink = TracingSink;
    let mut delivered = 0;
    while let Ok(notification) = rx.recv().await {
        if dry_run {
            info!(
                title = %notification.title,
                scope = %notification.scope,
                severity = %notification.severity,
                at = %fmt_epoch_local(notification.timestamp),
                "dry-run: would emit notification"
            );
        } else {
            sink.deliver(notification);
        }
        delivered += 1;
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::run_notifier;
    use async_channel::bounded;
    use runtime_events::Notification;
    use runtime_events::types::Severity;

    #[tokio::test]
    async fn notifier_drains_until_closed() {
        let (tx, rx) = bounded(4);
        for title in ["Container Died", "Image Pulled"] {
            let sent = tx.try_send(Notification {
                timestamp: 1_700_000_000,
                title: title.to_string(),
                body: String::new(),
                scope: String::new(),
                tags: Notification::source_tags(),
                severity: Severity::Info,
            });
            assert!(sent.is_ok());
        }
        tx.close();
        assert_eq!(run_notifier(rx, true).await, 2);
    }
}
