//! Domain event bus.
//!
//! # Responsibility
//! - Carry presentation-relevant side effects (toasts, connection banners,
//!   resource readiness) out of core without coupling to a UI layer.
//!
//! # Invariants
//! - Emitting never blocks and never fails; with no subscribers the event is
//!   dropped.
//! - Each emit is delivered at most once per subscriber; lagging subscribers
//!   lose the oldest events.

use crate::model::notification::Notification;
use crate::model::resource::ResourceFamily;
use tokio::sync::broadcast;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Event published by core services.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    NotificationAdded(Notification),
    ConnectionChanged {
        channel: String,
        connected: bool,
    },
    ResourceReady {
        family: ResourceFamily,
        id: String,
        expires_at_ms: i64,
    },
    ResourceFailed {
        family: ResourceFamily,
        id: String,
        error: String,
        fallback_served: bool,
    },
    PrefetchIssued {
        from_id: String,
        next_id: String,
    },
}

/// Cloneable broadcast handle shared by all services of one runtime.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn emit(&self, event: CoreEvent) {
        let _ = self.sender.send(event);
    }
}
