use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, info, trace};

use crate::catalog;
use crate::event::{DecodeError, RawEvent};
use crate::filter::{EventFilter, is_permitted};
use crate::notification::Notification;
use crate::queue::Payload;
use crate::scope::{self, Unresolved};
use crate::sink::NotificationSink;

/// Why an event produced no notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("runtime event error: {0}")]
    Malformed(DecodeError),
    #[error("event not permitted by filter: {category}:{action}")]
    Filtered { category: String, action: String },
    #[error("event action not supported: {action}")]
    Unsupported { action: String },
}

/// A rendered notification, possibly without a resolved scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub notification: Notification,
    pub unresolved: Option<Unresolved>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub emitted: usize,
    pub filtered: usize,
    pub unsupported: usize,
    pub malformed: usize,
    pub unscoped: usize,
}

impl BatchReport {
    pub const fn total(&self) -> usize {
        self.emitted + self.filtered + self.unsupported + self.malformed
    }
}

/// Turns raw runtime events into notifications.
#[derive(Clone, Default)]
pub struct EventNormalizer {
    filter: Option<Arc<dyn EventFilter>>,
    machine_id: Option<String>,
    verbose: bool,
}

impl std::fmt::Debug for EventNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventNormalizer")
            .field("filter", &self.filter.is_some())
            .field("machine_id", &self.machine_id)
            .field("verbose", &self.verbose)
            .finish()
    }
}

impl EventNormalizer {
    pub fn new(filter: Option<Arc<dyn EventFilter>>, machine_id: Option<String>) -> Self {
        Self {
            filter,
            machine_id,
            verbose: false,
        }
    }

    #[must_use]
    pub const fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Filter, classify, scope and render one event. Pure: no logging, no
    /// delivery.
    ///
    /// # Errors
    ///
    /// Returns a [`Rejection`] when the filter denies the event or the action
    /// has no severity.
    pub fn normalize(&self, event: &RawEvent) -> std::result::Result<Normalized, Rejection> {
        if !is_permitted(self.filter.as_deref(), &event.category, &event.action) {
            return Err(Rejection::Filtered {
                category: event.category.clone(),
                action: event.action.clone(),
            });
        }

        let severity = catalog::severity_of(&event.action).ok_or_else(|| Rejection::Unsupported {
            action: event.action.clone(),
        })?;

        let (scope, unresolved) = match scope::resolve(
            self.machine_id.as_deref(),
            &event.actor_id,
            event.image(),
            &event.action,
        ) {
            Ok(scope) => (scope, None),
            Err(unresolved) => (unresolved.partial.clone(), Some(unresolved)),
        };

        let notification = Notification {
            timestamp: event.timestamp_or_unknown(),
            title: render_title(&event.category, &event.action),
            body: render_body(event),
            scope,
            tags: Notification::source_tags(),
            severity,
        };
        Ok(Normalized {
            notification,
            unresolved,
        })
    }

    /// Process one drained payload, logging the outcome and delivering the
    /// notification if one was produced.
    pub fn process_payload(
        &self,
        payload: Option<&Value>,
        sink: &dyn NotificationSink,
        report: &mut BatchReport,
    ) {
        let Some(value) = payload else {
            error!("{}", Rejection::Malformed(DecodeError::InvalidJson));
            report.malformed += 1;
            return;
        };
        let event = match RawEvent::from_value(value).map_err(Rejection::Malformed) {
            Ok(event) => event,
            Err(rejection) => {
                error!("{rejection}");
                report.malformed += 1;
                return;
            }
        };
        debug!(category = %event.category, action = %event.action, "runtime event received");

        match self.normalize(&event) {
            Ok(Normalized {
                notification,
                unresolved,
            }) => {
                if let Some(unresolved) = unresolved {
                    error!(action = %unresolved.action, "{unresolved}");
                    report.unscoped += 1;
                }
                if self.verbose {
                    info!(payload = %value, "runtime event accepted");
                }
                debug!(
                    timestamp = notification.timestamp,
                    id = %event.actor_id,
                    severity = %notification.severity,
                    "runtime event normalized"
                );
                trace!("runtime event scheduled for sending\n{notification}");
                sink.deliver(notification);
                report.emitted += 1;
            }
            Err(rejection @ Rejection::Filtered { .. }) => {
                debug!("{rejection}");
                trace!(payload = %value, "filtered runtime event");
                report.filtered += 1;
            }
            Err(rejection) => {
                error!(payload = %value, "{rejection}");
                report.unsupported += 1;
            }
        }
    }

    /// Process a drained batch in arrival order. A failing event never stops
    /// the batch.
    pub fn process_batch(&self, batch: &[Payload], sink: &dyn NotificationSink) -> BatchReport {
        let mut report = BatchReport::default();
        for payload in batch {
            self.process_payload(payload.as_ref(), sink, &mut report);
        }
        report
    }
}

fn render_title(category: &str, action: &str) -> String {
    if category.is_empty() || action.is_empty() {
        return action.to_string();
    }
    let mut title = String::with_capacity(category.len() + action.len() + 1);
    let mut chars = category.chars();
    if let Some(first) = chars.next() {
        title.push(first.to_ascii_uppercase());
        title.extend(chars);
    }
    title.push(' ');
    title.push_str(catalog::display_name(action));
    title
}

fn render_body(event: &RawEvent) -> String {
    let mut body = if event.action.is_empty() {
        String::new()
    } else {
        format!("Event: {}", event.action)
    };
    if event.attributes.is_some() {
        if let Some(image) = event.image().filter(|image| !image.is_empty()) {
            body.push_str("; Image: ");
            body.push_str(image);
        }
        if let Some(name) = event.name() {
            body.push_str("; Name: ");
            body.push_str(name);
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::{BatchReport, EventNormalizer, Rejection, render_title};
    use crate::event::RawEvent;
    use crate::filter::RuleFilter;
    use crate::notification::Notification;
    use crate::sink::NotificationSink;
    use crate::types::Severity;
    use serde_json::json;
    use std::cell::RefCell;
    use std::sync::Arc;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Notification>>);

    impl NotificationSink for Recorder {
        fn deliver(&self, notification: Notification) {
            self.0.borrow_mut().push(notification);
        }
    }

    fn normalizer(rules: &[&str], machine_id: Option<&str>) -> EventNormalizer {
        let filter = match RuleFilter::parse(rules) {
            Ok(filter) => filter,
            Err(err) => panic!("rules should parse: {err}"),
        };
        EventNormalizer::new(Some(Arc::new(filter)), machine_id.map(str::to_string))
    }

    fn event(value: &serde_json::Value) -> RawEvent {
        match RawEvent::from_value(value) {
            Ok(event) => event,
            Err(err) => panic!("event should decode: {err}"),
        }
    }

    #[test]
    fn title_capitalizes_category() {
        assert_eq!(render_title("container", "oom"), "Container Out of Memory");
        assert_eq!(render_title("volume", "create"), "Volume Created");
        assert_eq!(render_title("", "die"), "die");
    }

    #[test]
    fn title_capitalizes_only_ascii_first_letter() {
        assert_eq!(render_title("ßpool", "create"), "ßpool Created");
        assert_eq!(render_title("écran", "die"), "écran Died");
        assert_eq!(render_title("plugin", "enable"), "Plugin enable");
    }

    #[test]
    fn body_lists_image_and_name() {
        let normalized = normalizer(&["*"], None).normalize(&event(&json!({
            "Type": "container",
            "Action": "start",
            "id": "abcdef0123456789",
            "Actor": { "Attributes": { "image": "nginx", "name": "web" } }
        })));
        let Ok(normalized) = normalized else {
            panic!("start should be accepted");
        };
        assert_eq!(
            normalized.notification.body,
            "Event: start; Image: nginx; Name: web"
        );
    }

    #[test]
    fn unscoped_image_event_is_still_rendered() {
        let result = normalizer(&["*"], Some("aa:bb")).normalize(&event(&json!({
            "Type": "image",
            "Action": "pull",
            "Actor": { "Attributes": {} }
        })));
        let Ok(normalized) = result else {
            panic!("pull should be accepted");
        };
        assert!(normalized.unresolved.is_some());
        assert_eq!(normalized.notification.scope, "host.mac=aa:bb");
        assert_eq!(normalized.notification.title, "Image Pulled");
        assert_eq!(normalized.notification.body, "Event: pull");
    }

    #[test]
    fn missing_filter_rejects() {
        let normalizer = EventNormalizer::new(None, None);
        assert_eq!(
            normalizer.normalize(&event(&json!({ "Type": "container", "Action": "die" }))),
            Err(Rejection::Filtered {
                category: "container".to_string(),
                action: "die".to_string(),
            })
        );
    }

    #[test]
    fn batch_continues_past_failures() {
        let normalizer = normalizer(&["container", "image:pull"], None);
        let sink = Recorder::default();
        let batch = vec![
            None,
            Some(serde_json::Value::Null),
            Some(json!({ "Type": "container", "Action": "frobnicate", "id": "1" })),
            Some(json!({ "Type": "network", "Action": "connect", "id": "2" })),
            Some(json!({ "Type": "container", "Action": "die", "id": "3" })),
            Some(json!({ "Type": "image", "Action": "pull", "id": "busybox" })),
        ];

        let report = normalizer.process_batch(&batch, &sink);
        assert_eq!(
            report,
            BatchReport {
                emitted: 2,
                filtered: 1,
                unsupported: 1,
                malformed: 2,
                unscoped: 0,
            }
        );
        assert_eq!(report.total(), batch.len());

        let titles: Vec<_> = sink.0.borrow().iter().map(|n| n.title.clone()).collect();
        assert_eq!(titles, vec!["Container Died", "Image Pulled"]);
        assert_eq!(sink.0.borrow()[0].severity, Severity::Warning);
    }
}
