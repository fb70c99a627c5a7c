//! Append-only playback analytics log.

use super::{RepoError, RepoResult};
use crate::db::LocalStore;
use crate::spi::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::spi::CollaboratorResult;
use async_trait::async_trait;
use log::debug;
use rusqlite::params;

pub struct SqliteAnalyticsSink {
    store: LocalStore,
}

impl SqliteAnalyticsSink {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn record(&self, event: &AnalyticsEvent) -> RepoResult<()> {
        if !event.percent_complete.is_finite() {
            return Err(RepoError::InvalidInput(format!(
                "non-finite percent_complete for `{}`",
                event.resource_id
            )));
        }
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO playback_events (
                    event_type,
                    resource_id,
                    family,
                    current_time,
                    duration,
                    percent_complete,
                    recorded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    event.event_type.as_str(),
                    event.resource_id.as_str(),
                    event.family.as_str(),
                    event.current_time,
                    event.duration,
                    event.percent_complete,
                    event.recorded_at_ms,
                ],
            )
        })?;
        debug!(
            "event=analytics_record module=repo status=ok type={} id={} percent={:.1}",
            event.event_type, event.resource_id, event.percent_complete
        );
        Ok(())
    }

    /// Number of stored events for `resource_id`.
    pub fn count_for(&self, resource_id: &str) -> RepoResult<u64> {
        let count: i64 = self.store.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM playback_events WHERE resource_id = ?1;",
                [resource_id],
                |row| row.get(0),
            )
        })?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative event count {count}")))
    }
}

#[async_trait]
impl AnalyticsSink for SqliteAnalyticsSink {
    async fn record_event(&self, event: &AnalyticsEvent) -> CollaboratorResult<()> {
        Ok(self.record(event)?)
    }
}
