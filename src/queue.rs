use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;

/// One payload received from the stream. `None` marks a chunk that could not
/// be parsed as JSON.
pub type Payload = Option<Value>;

/// Arrival-ordered buffer between the stream and the drain cycle.
#[derive(Debug, Default)]
pub struct EventQueue {
    items: Mutex<Vec<Payload>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, payload: Payload) {
        self.lock().push(payload);
    }

    /// Take every queued payload, leaving the queue empty.
    pub fn drain(&self) -> Vec<Payload> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Payload>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::EventQueue;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn drain_preserves_arrival_order_and_clears() {
        let queue = EventQueue::new();
        queue.push(Some(json!({ "n": 1 })));
        queue.push(None);
        queue.push(Some(json!({ "n": 3 })));

        let drained = queue.drain();
        assert_eq!(
            drained,
            vec![Some(json!({ "n": 1 })), None, Some(json!({ "n": 3 }))]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_on_empty_queue_returns_nothing() {
        let queue = EventQueue::new();
        assert!(queue.drain().is_empty());
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn concurrent_pushes_are_all_kept() {
        let queue = Arc::new(EventQueue::new());
        let handles: Vec<_> = (0..4)
            .map(|worker| {
                let queue = Arc::clone(&queue);
                std::thread::spawn(move || {
                    for n in 0..50 {
                        queue.push(Some(json!({ "worker": worker, "n": n })));
                    }
                })
            })
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                panic!("producer thread panicked");
            }
        }
        assert_eq!(queue.len(), 200);
        assert_eq!(queue.drain().len(), 200);
        assert_eq!(queue.len(), 0);
    }
}
