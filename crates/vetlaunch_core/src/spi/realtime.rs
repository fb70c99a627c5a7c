//! Realtime event transport contract and in-process loopback adapter.
//!
//! The transport owns reconnection and delivery (at-least-once, unordered
//! across reconnects). Core only registers an insert callback per channel.

use super::{CollaboratorError, CollaboratorResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Callback invoked once per inbound insert payload.
pub type InsertCallback = Arc<dyn Fn(Value) + Send + Sync>;

/// Opaque token identifying one live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub id: String,
    pub channel: String,
}

#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Opens a long-lived subscription delivering insert payloads.
    async fn subscribe(
        &self,
        channel: &str,
        on_insert: InsertCallback,
    ) -> CollaboratorResult<SubscriptionHandle>;

    /// Closes a subscription. Unknown handles are not an error.
    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> CollaboratorResult<()>;
}

/// In-process transport that fans published payloads out to subscribers.
///
/// Used by the CLI and tests; delivery is synchronous on `publish`.
#[derive(Default)]
pub struct LoopbackTransport {
    subscribers: Mutex<BTreeMap<String, (String, InsertCallback)>>,
    offline: Mutex<bool>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent `subscribe` calls fail as if the service were down.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    /// Delivers `payload` to every subscriber of `channel`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn publish(&self, channel: &str, payload: Value) -> usize {
        // Callbacks run outside the lock so they may call back into the
        // transport.
        let targets = self
            .subscribers
            .lock()
            .values()
            .filter(|(subscribed, _)| subscribed == channel)
            .map(|(_, callback)| Arc::clone(callback))
            .collect::<Vec<_>>();
        for callback in &targets {
            callback(payload.clone());
        }
        targets.len()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[async_trait]
impl RealtimeTransport for LoopbackTransport {
    async fn subscribe(
        &self,
        channel: &str,
        on_insert: InsertCallback,
    ) -> CollaboratorResult<SubscriptionHandle> {
        if *self.offline.lock() {
            return Err(CollaboratorError::Unavailable(
                "loopback transport is offline".to_string(),
            ));
        }
        let handle = SubscriptionHandle {
            id: Uuid::new_v4().to_string(),
            channel: channel.to_string(),
        };
        self.subscribers
            .lock()
            .insert(handle.id.clone(), (channel.to_string(), on_insert));
        Ok(handle)
    }

    async fn unsubscribe(&self, handle: &SubscriptionHandle) -> CollaboratorResult<()> {
        self.subscribers.lock().remove(&handle.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{LoopbackTransport, RealtimeTransport};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn publishes_only_to_matching_channel() {
        let transport = LoopbackTransport::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = transport
            .subscribe(
                "alerts",
                Arc::new(move |_: serde_json::Value| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .await
            .expect("subscribe should succeed");

        assert_eq!(transport.publish("alerts", json!({"title": "x"})), 1);
        assert_eq!(transport.publish("other", json!({"title": "x"})), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        transport
            .unsubscribe(&handle)
            .await
            .expect("unsubscribe should succeed");
        assert_eq!(transport.publish("alerts", json!({})), 0);
    }

    #[tokio::test]
    async fn offline_transport_rejects_subscribe() {
        let transport = LoopbackTransport::new();
        transport.set_offline(true);
        let err = transport
            .subscribe("alerts", Arc::new(|_: serde_json::Value| {}))
            .await
            .expect_err("offline subscribe must fail");
        assert_eq!(err.code(), "unavailable");
    }
}
