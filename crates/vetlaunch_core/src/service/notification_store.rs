//! Notification stream use-case service.
//!
//! # Responsibility
//! - Own the newest-first notification sequence and its read state.
//! - Integrate realtime inserts and local adds with mention detection.
//! - Publish `NotificationAdded` / `ConnectionChanged` on the event bus.
//!
//! # Invariants
//! - Order is arrival order (prepend), never re-sorted by timestamps.
//! - `read` only moves from `false` to `true`; entries are never removed.
//! - Ids are unique within the stream; redelivered inserts are dropped.
//! - No public operation returns an error or panics: transport failures leave
//!   the store degraded, malformed payloads are logged and dropped.
//! - The state lock is never held across an `.await`.

use crate::clock::{format_short_time, Clock};
use crate::config::NotificationConfig;
use crate::events::{CoreEvent, EventBus};
use crate::logging::{sanitize_message, MAX_LOG_SNIPPET_CHARS};
use crate::mention::parser::{escape_markup, parse_mentions, MentionParse};
use crate::model::directory::UserDirectory;
use crate::model::notification::{Notification, NotificationDraft, NotificationKind};
use crate::spi::realtime::{InsertCallback, RealtimeTransport, SubscriptionHandle};
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use uuid::Uuid;

const MENTION_TITLE: &str = "New Mention";

/// Outcome of `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connected,
    /// Transport refused or failed; local adds still work.
    Degraded,
}

/// Cloneable handle to one notification stream.
#[derive(Clone)]
pub struct NotificationStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    transport: Arc<dyn RealtimeTransport>,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: NotificationConfig,
    state: Mutex<StoreState>,
}

#[derive(Default)]
struct StoreState {
    notifications: VecDeque<Notification>,
    connected: bool,
    ack_generation: u64,
    subscription: Option<SubscriptionHandle>,
}

/// Insert record as delivered by the realtime channel.
///
/// Accepts both the bare row and the `{ "new": row }` change envelope.
#[derive(Debug, Deserialize)]
struct InboundRecord {
    #[serde(default)]
    id: Option<Value>,
    title: String,
    #[serde(default, alias = "message")]
    description: String,
    #[serde(default, alias = "type")]
    kind: Option<String>,
    #[serde(default, alias = "mentionedBy")]
    mentioned_by: Option<String>,
}

impl NotificationStore {
    pub fn new(
        transport: Arc<dyn RealtimeTransport>,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        config: NotificationConfig,
    ) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                transport,
                directory,
                clock,
                events,
                config,
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    /// Subscribes to inbound inserts on `channel`.
    ///
    /// On success raises the transient `connected` flag, which clears itself
    /// after `connected_ack`. A previous subscription is released first.
    pub async fn subscribe(&self, channel: &str) -> ConnectionStatus {
        self.unsubscribe().await;

        let weak = Arc::downgrade(&self.inner);
        let on_insert: InsertCallback = Arc::new(move |payload: Value| {
            if let Some(inner) = weak.upgrade() {
                inner.ingest_insert(payload);
            }
        });

        match self.inner.transport.subscribe(channel, on_insert).await {
            Ok(handle) => {
                let generation = {
                    let mut state = self.inner.state.lock();
                    state.subscription = Some(handle);
                    state.connected = true;
                    state.ack_generation += 1;
                    state.ack_generation
                };
                info!("event=notifications_subscribe module=notifications status=ok channel={channel}");
                self.inner.events.emit(CoreEvent::ConnectionChanged {
                    channel: channel.to_string(),
                    connected: true,
                });
                self.schedule_ack_clear(channel, generation);
                ConnectionStatus::Connected
            }
            Err(err) => {
                warn!(
                    "event=notifications_subscribe module=notifications status=degraded channel={} error_code={} error={}",
                    channel,
                    err.code(),
                    err
                );
                ConnectionStatus::Degraded
            }
        }
    }

    /// Releases the active subscription. Returns `false` when none existed.
    pub async fn unsubscribe(&self) -> bool {
        let handle = {
            let mut state = self.inner.state.lock();
            state.connected = false;
            state.ack_generation += 1;
            state.subscription.take()
        };
        let Some(handle) = handle else {
            return false;
        };

        match self.inner.transport.unsubscribe(&handle).await {
            Ok(()) => info!(
                "event=notifications_unsubscribe module=notifications status=ok channel={}",
                handle.channel
            ),
            Err(err) => warn!(
                "event=notifications_unsubscribe module=notifications status=error channel={} error_code={} error={}",
                handle.channel,
                err.code(),
                err
            ),
        }
        true
    }

    /// Adds one local notification after mention resolution.
    ///
    /// Returns the stored record. When `draft.id` collides with an existing
    /// entry, the existing entry is returned unchanged.
    pub fn add_notification(&self, draft: NotificationDraft) -> Notification {
        self.inner.insert_draft(draft, "local")
    }

    /// Marks one notification as read. Returns `true` when state changed.
    pub fn mark_read(&self, id: &str) -> bool {
        let changed = {
            let mut state = self.inner.state.lock();
            state
                .notifications
                .iter_mut()
                .find(|notification| notification.id == id)
                .is_some_and(Notification::mark_read)
        };
        debug!("event=notification_mark_read module=notifications status=ok id={id} changed={changed}");
        changed
    }

    /// Marks every notification as read. Returns the number changed.
    pub fn mark_all_read(&self) -> usize {
        let changed = {
            let mut state = self.inner.state.lock();
            state
                .notifications
                .iter_mut()
                .map(Notification::mark_read)
                .filter(|changed| *changed)
                .count()
        };
        debug!("event=notification_mark_all_read module=notifications status=ok changed={changed}");
        changed
    }

    /// Parses `message` and, only if someone was mentioned, adds a mention
    /// notification naming `from_user` and `context`.
    ///
    /// The parse result is returned either way.
    pub fn create_mention_notification(
        &self,
        from_user: &str,
        message: &str,
        context: &str,
    ) -> MentionParse {
        let entries = self.inner.directory.entries();
        let parsed = parse_mentions(message, &entries);
        if !parsed.has_mentions() {
            debug!("event=mention_notification module=notifications status=skipped reason=no_mentions");
            return parsed;
        }

        let now = self.inner.clock.now_ms();
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            title: MENTION_TITLE.to_string(),
            description: format!(
                "{} mentioned you in {}: {}",
                escape_markup(from_user),
                escape_markup(context),
                parsed.rendered_text
            ),
            time: format_short_time(now),
            created_at_ms: now,
            read: false,
            kind: NotificationKind::Mention,
            mentioned_by: Some(from_user.to_string()),
            mentioned_user_ids: parsed.mentioned_ids.clone(),
        };
        self.inner.publish(notification, "mention");
        parsed
    }

    /// Number of unread entries, computed from current state.
    pub fn unread_count(&self) -> usize {
        self.inner
            .state
            .lock()
            .notifications
            .iter()
            .filter(|notification| !notification.read)
            .count()
    }

    /// Snapshot of the stream, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner
            .state
            .lock()
            .notifications
            .iter()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Notification> {
        self.inner
            .state
            .lock()
            .notifications
            .iter()
            .find(|notification| notification.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transient acknowledgement flag raised by a successful subscribe.
    pub fn is_connected(&self) -> bool {
        self.inner.state.lock().connected
    }

    /// Whether a transport subscription is currently held.
    pub fn is_subscribed(&self) -> bool {
        self.inner.state.lock().subscription.is_some()
    }

    fn schedule_ack_clear(&self, channel: &str, generation: u64) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("event=notifications_ack module=notifications status=skipped reason=no_runtime");
            return;
        };
        let weak: Weak<StoreInner> = Arc::downgrade(&self.inner);
        let delay = self.inner.config.connected_ack();
        let channel = channel.to_string();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.clear_connected(&channel, generation);
            }
        });
    }
}

impl StoreInner {
    fn ingest_insert(&self, payload: Value) {
        let record = match decode_inbound(payload) {
            Ok(record) => record,
            Err(reason) => {
                warn!(
                    "event=notification_ingest module=notifications status=dropped reason={}",
                    sanitize_message(&reason, MAX_LOG_SNIPPET_CHARS * 2)
                );
                return;
            }
        };

        let kind = match record.kind.as_deref() {
            Some(value) => {
                let parsed = NotificationKind::parse(value);
                if parsed.is_none() {
                    debug!(
                        "event=notification_ingest module=notifications status=ok unknown_kind={}",
                        sanitize_message(value, MAX_LOG_SNIPPET_CHARS)
                    );
                }
                parsed
            }
            None => None,
        };

        let draft = NotificationDraft {
            id: record.id.as_ref().and_then(id_from_value),
            title: record.title,
            description: record.description,
            kind,
            mentioned_by: record.mentioned_by,
        };
        self.insert_draft(draft, "realtime");
    }

    fn insert_draft(&self, draft: NotificationDraft, source: &'static str) -> Notification {
        let entries = self.directory.entries();
        let parsed = parse_mentions(&draft.description, &entries);
        let kind = draft.effective_kind(parsed.has_mentions());
        let now = self.clock.now_ms();

        let notification = Notification {
            id: draft.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            title: draft.title,
            description: parsed.rendered_text,
            time: format_short_time(now),
            created_at_ms: now,
            read: false,
            kind,
            mentioned_by: draft.mentioned_by,
            mentioned_user_ids: parsed.mentioned_ids,
        };
        self.publish(notification, source)
    }

    // Prepends and announces `notification` unless its id is already present,
    // in which case the stored entry is returned.
    fn publish(&self, notification: Notification, source: &'static str) -> Notification {
        {
            let mut state = self.state.lock();
            if let Some(existing) = state
                .notifications
                .iter()
                .find(|entry| entry.id == notification.id)
            {
                debug!(
                    "event=notification_add module=notifications status=duplicate source={} id={}",
                    source, notification.id
                );
                return existing.clone();
            }
            state.notifications.push_front(notification.clone());
        }

        info!(
            "event=notification_add module=notifications status=ok source={} id={} kind={} mentions={}",
            source,
            notification.id,
            notification.kind.as_str(),
            notification.mentioned_user_ids.len()
        );
        self.events
            .emit(CoreEvent::NotificationAdded(notification.clone()));
        notification
    }

    fn clear_connected(&self, channel: &str, generation: u64) {
        {
            let mut state = self.state.lock();
            if state.ack_generation != generation || !state.connected {
                return;
            }
            state.connected = false;
        }
        self.events.emit(CoreEvent::ConnectionChanged {
            channel: channel.to_string(),
            connected: false,
        });
    }
}

fn decode_inbound(payload: Value) -> Result<InboundRecord, String> {
    let row = match payload {
        Value::Object(mut map) => match map.remove("new") {
            Some(row @ Value::Object(_)) => row,
            Some(_) => return Err("change envelope `new` is not an object".to_string()),
            None => Value::Object(map),
        },
        other => return Err(format!("payload is not an object: {other}")),
    };

    let record: InboundRecord = serde_json::from_value(row).map_err(|err| err.to_string())?;
    if record.title.trim().is_empty() {
        return Err("notification title is empty".to_string());
    }
    Ok(record)
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::decode_inbound;
    use serde_json::json;

    #[test]
    fn decodes_bare_row_and_change_envelope() {
        let bare = decode_inbound(json!({"id": 7, "title": "Drill", "message": "at 0900"}))
            .expect("bare row should decode");
        assert_eq!(bare.title, "Drill");
        assert_eq!(bare.description, "at 0900");

        let envelope = decode_inbound(json!({
            "eventType": "INSERT",
            "new": {"title": "Pitch review", "type": "high_priority"}
        }))
        .expect("envelope should decode");
        assert_eq!(envelope.title, "Pitch review");
        assert_eq!(envelope.kind.as_deref(), Some("high_priority"));
    }

    #[test]
    fn rejects_non_objects_and_missing_titles() {
        assert!(decode_inbound(json!("hello")).is_err());
        assert!(decode_inbound(json!({"description": "no title"})).is_err());
        assert!(decode_inbound(json!({"title": "   "})).is_err());
        assert!(decode_inbound(json!({"new": 5})).is_err());
    }
}
