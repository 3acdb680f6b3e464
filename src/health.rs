use std::sync::atomic::{AtomicU8, Ordering};

use tracing::warn;

const UNKNOWN: u8 = 0;
const CONNECTED: u8 = 1;
const DISCONNECTED: u8 = 2;

/// Liveness of the runtime event stream.
///
/// Optimistic: the stream counts as alive until it is known to be closed.
#[derive(Debug, Default)]
pub struct ConnectionHealth {
    state: AtomicU8,
}

impl ConnectionHealth {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNKNOWN),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state.load(Ordering::Acquire) != DISCONNECTED
    }

    pub fn mark_connected(&self) {
        self.state.store(CONNECTED, Ordering::Release);
    }

    /// Returns `true` when this call ended an established connection.
    pub fn mark_disconnected(&self) -> bool {
        let lost = self.state.swap(DISCONNECTED, Ordering::AcqRel) == CONNECTED;
        if lost {
            warn!("runtime event stream connection lost");
        }
        lost
    }
}
