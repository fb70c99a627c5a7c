//! Runtime container wiring services to injected collaborators.
//!
//! # Responsibility
//! - Build one notification store, one cache per resource family, the
//!   playback tracker and the tutor wrapper over a shared clock and event bus.
//! - Own the startup subscription and the shutdown sequence.
//!
//! # Invariants
//! - Configuration is validated before any service is built.
//! - The playback tracker observes the video cache.

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, CoreConfig};
use crate::events::EventBus;
use crate::logging::init_logging;
use crate::model::directory::UserDirectory;
use crate::model::resource::ResourceFamily;
use crate::service::notification_store::{ConnectionStatus, NotificationStore};
use crate::service::playback_tracker::PlaybackTracker;
use crate::service::resource_cache::ResourceCache;
use crate::service::tutor_service::TutorService;
use crate::spi::analytics::AnalyticsSink;
use crate::spi::realtime::RealtimeTransport;
use crate::spi::storage::{MetadataLookup, SignedUrlIssuer};
use crate::spi::tutor::TutorClient;
use log::info;
use std::sync::Arc;

/// External collaborators supplied by the host application.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn RealtimeTransport>,
    pub directory: Arc<dyn UserDirectory>,
    pub metadata: Arc<dyn MetadataLookup>,
    pub signer: Arc<dyn SignedUrlIssuer>,
    pub analytics: Arc<dyn AnalyticsSink>,
    pub tutor: Arc<dyn TutorClient>,
    /// Defaults to the system clock.
    pub clock: Option<Arc<dyn Clock>>,
}

pub struct CoreRuntime {
    config: CoreConfig,
    events: EventBus,
    notifications: NotificationStore,
    videos: ResourceCache,
    documents: ResourceCache,
    playback: PlaybackTracker,
    tutor: TutorService,
    connection: ConnectionStatus,
}

impl CoreRuntime {
    /// Validates `config`, builds every service and subscribes the
    /// notification store to the configured channel.
    ///
    /// A failed subscription does not fail startup; it is reported through
    /// [`CoreRuntime::connection`].
    pub async fn start(config: CoreConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        config.validate()?;
        if config.logging.log_dir.is_some() {
            init_logging(&config.logging).map_err(ConfigError::Invalid)?;
        }

        let clock = collaborators
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);
        let events = EventBus::default();

        let notifications = NotificationStore::new(
            collaborators.transport,
            collaborators.directory,
            Arc::clone(&clock),
            events.clone(),
            config.notifications.clone(),
        );
        let videos = ResourceCache::new(
            ResourceFamily::Video,
            Arc::clone(&collaborators.metadata),
            Arc::clone(&collaborators.signer),
            Arc::clone(&clock),
            events.clone(),
            config.resources.clone(),
        );
        let documents = ResourceCache::new(
            ResourceFamily::Document,
            collaborators.metadata,
            collaborators.signer,
            Arc::clone(&clock),
            events.clone(),
            config.resources.clone(),
        );
        let playback = PlaybackTracker::new(
            videos.clone(),
            collaborators.analytics,
            clock,
            events.clone(),
            &config.playback,
            &config.resources,
        );
        let tutor = TutorService::new(
            collaborators.tutor,
            config.tutor.clone(),
            config.resources.collaborator_timeout(),
        );

        let connection = notifications.subscribe(&config.notifications.channel).await;
        info!(
            "event=runtime_start module=runtime status=ok channel={} connection={:?}",
            config.notifications.channel, connection
        );

        Ok(Self {
            config,
            events,
            notifications,
            videos,
            documents,
            playback,
            tutor,
            connection,
        })
    }

    /// Unsubscribes from realtime delivery and waits for background work.
    pub async fn shutdown(&self) {
        let had_subscription = self.notifications.unsubscribe().await;
        self.playback.settle().await;
        info!(
            "event=runtime_shutdown module=runtime status=ok released_subscription={had_subscription}"
        );
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Startup subscription outcome.
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn notifications(&self) -> &NotificationStore {
        &self.notifications
    }

    pub fn videos(&self) -> &ResourceCache {
        &self.videos
    }

    pub fn documents(&self) -> &ResourceCache {
        &self.documents
    }

    pub fn cache(&self, family: ResourceFamily) -> &ResourceCache {
        match family {
            ResourceFamily::Video => &self.videos,
            ResourceFamily::Document => &self.documents,
        }
    }

    pub fn playback(&self) -> &PlaybackTracker {
        &self.playback
    }

    pub fn tutor(&self) -> &TutorService {
        &self.tutor
    }
}
