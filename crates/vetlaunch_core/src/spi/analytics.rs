//! Analytics sink contract.

use super::CollaboratorResult;
use crate::model::resource::ResourceFamily;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Event name for playback progress samples.
pub const EVENT_PLAYBACK_PROGRESS: &str = "playback_progress";

/// One analytics record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event_type: String,
    pub resource_id: String,
    pub family: ResourceFamily,
    pub current_time: f64,
    pub duration: f64,
    pub percent_complete: f64,
    pub recorded_at_ms: i64,
}

/// Fire-and-forget event sink. Callers log failures and move on.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record_event(&self, event: &AnalyticsEvent) -> CollaboratorResult<()>;
}
