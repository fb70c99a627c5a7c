//! Core domain logic for VetLaunch.
//! This crate owns the notification stream, mention resolution and
//! signed-resource delivery; hosts inject collaborators through `spi`.

pub mod clock;
pub mod config;
pub mod db;
pub mod events;
pub mod logging;
pub mod mention;
pub mod model;
pub mod repo;
pub mod runtime;
pub mod service;
pub mod spi;

pub use clock::{format_short_time, Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use db::{DbError, LocalStore};
pub use events::{CoreEvent, EventBus};
pub use logging::{default_log_level, init_logging, logging_status};
pub use mention::parser::{parse_mentions, MentionParse};
pub use model::directory::{DirectoryEntry, StaticDirectory, UserDirectory};
pub use model::notification::{Notification, NotificationDraft, NotificationKind};
pub use model::resource::{ResourceFamily, ResourceHandle, ResourceMetadata, SecondaryKind};
pub use repo::{RepoError, RepoResult, SqliteAnalyticsSink, SqliteResourceCatalog};
pub use runtime::{Collaborators, CoreRuntime};
pub use service::notification_store::{ConnectionStatus, NotificationStore};
pub use service::playback_tracker::{PlaybackTracker, PrefetchDecision, ProgressReport};
pub use service::resource_cache::{ResourceCache, ResourceError};
pub use service::tutor_service::{TutorReply, TutorService, TUTOR_APOLOGY};
pub use spi::{CollaboratorError, CollaboratorResult};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
