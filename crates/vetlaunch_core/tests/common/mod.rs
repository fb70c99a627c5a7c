#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vetlaunch_core::clock::ManualClock;
use vetlaunch_core::config::{NotificationConfig, ResourceConfig};
use vetlaunch_core::events::EventBus;
use vetlaunch_core::model::directory::{DirectoryEntry, StaticDirectory};
use vetlaunch_core::model::resource::{ResourceFamily, ResourceMetadata};
use vetlaunch_core::service::notification_store::NotificationStore;
use vetlaunch_core::service::resource_cache::ResourceCache;
use vetlaunch_core::spi::analytics::{AnalyticsEvent, AnalyticsSink};
use vetlaunch_core::spi::realtime::LoopbackTransport;
use vetlaunch_core::spi::storage::{MetadataLookup, SignedUrlIssuer};
use vetlaunch_core::spi::{CollaboratorError, CollaboratorResult};

/// 2026-01-05T12:00:00Z
pub const T0_MS: i64 = 1_767_614_400_000;

pub fn roster() -> Vec<DirectoryEntry> {
    vec![
        DirectoryEntry::new("u-lee", "Capt. Lee"),
        DirectoryEntry::new("u-john", "John Smith"),
        DirectoryEntry::new("u-maria", "Maria Garcia"),
    ]
}

pub fn store_with(transport: Arc<LoopbackTransport>, clock: Arc<ManualClock>) -> (NotificationStore, EventBus) {
    let events = EventBus::default();
    let store = NotificationStore::new(
        transport,
        Arc::new(StaticDirectory::new(roster())),
        clock,
        events.clone(),
        NotificationConfig::default(),
    );
    (store, events)
}

pub fn video(id: &str, next: Option<&str>) -> ResourceMetadata {
    ResourceMetadata {
        id: id.to_string(),
        family: ResourceFamily::Video,
        title: format!("Lesson {id}"),
        storage_path: format!("videos/{id}.mp4"),
        secondary_path: Some(format!("thumbnails/{id}.jpg")),
        mime_type: "video/mp4".to_string(),
        sequence_next: next.map(str::to_string),
    }
}

pub fn document(id: &str) -> ResourceMetadata {
    ResourceMetadata {
        id: id.to_string(),
        family: ResourceFamily::Document,
        title: format!("Handout {id}"),
        storage_path: format!("documents/{id}.pdf"),
        secondary_path: Some(format!("previews/{id}.png")),
        mime_type: "application/pdf".to_string(),
        sequence_next: None,
    }
}

/// In-memory metadata lookup that counts calls per id.
#[derive(Default)]
pub struct CountingCatalog {
    entries: Mutex<HashMap<(ResourceFamily, String), ResourceMetadata>>,
    calls: Mutex<HashMap<String, usize>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl CountingCatalog {
    pub fn with(entries: Vec<ResourceMetadata>) -> Self {
        let catalog = Self::default();
        for entry in entries {
            catalog
                .entries
                .lock()
                .insert((entry.family, entry.id.clone()), entry);
        }
        catalog
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls_for(&self, id: &str) -> usize {
        self.calls.lock().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl MetadataLookup for CountingCatalog {
    async fn get_metadata(
        &self,
        family: ResourceFamily,
        id: &str,
    ) -> CollaboratorResult<Option<ResourceMetadata>> {
        *self.calls.lock().entry(id.to_string()).or_insert(0) += 1;
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Unavailable("catalog offline".to_string()));
        }
        Ok(self.entries.lock().get(&(family, id.to_string())).cloned())
    }
}

/// Signs paths deterministically as `https://cdn.test/<path>?ttl=<secs>`.
#[derive(Default)]
pub struct StubSigner {
    pub issued: AtomicUsize,
}

#[async_trait]
impl SignedUrlIssuer for StubSigner {
    async fn create_signed_url(
        &self,
        storage_path: &str,
        ttl: Duration,
    ) -> CollaboratorResult<String> {
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(format!("https://cdn.test/{storage_path}?ttl={}", ttl.as_secs()))
    }
}

#[derive(Default)]
pub struct RecordingAnalytics {
    pub events: Mutex<Vec<AnalyticsEvent>>,
    pub failing: AtomicBool,
}

#[async_trait]
impl AnalyticsSink for RecordingAnalytics {
    async fn record_event(&self, event: &AnalyticsEvent) -> CollaboratorResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Rejected("analytics quota".to_string()));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}

pub fn cache_with(
    family: ResourceFamily,
    catalog: Arc<CountingCatalog>,
    clock: Arc<ManualClock>,
    config: ResourceConfig,
) -> ResourceCache {
    ResourceCache::new(
        family,
        catalog,
        Arc::new(StubSigner::default()),
        clock,
        EventBus::default(),
        config,
    )
}
