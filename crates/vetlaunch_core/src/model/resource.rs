//! Signed resource handles for video and document delivery.
//!
//! # Responsibility
//! - Define the metadata record returned by catalog lookups.
//! - Define the time-bounded handle served to playback/download callers.
//!
//! # Invariants
//! - `expires_at_ms == issued_at_ms + ttl` for the TTL requested at issue.
//! - A handle with `expires_at_ms <= now` is stale and must be refreshed
//!   before it is trusted for a new network operation.
//! - Handles are immutable once issued; refresh swaps in a new handle.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Resource family sharing one lifecycle shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceFamily {
    Video,
    Document,
}

impl ResourceFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Document => "document",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "video" => Some(Self::Video),
            "document" => Some(Self::Document),
            _ => None,
        }
    }

    /// Kind of the secondary locator issued next to the primary one.
    pub fn secondary_kind(self) -> SecondaryKind {
        match self {
            Self::Video => SecondaryKind::Thumbnail,
            Self::Document => SecondaryKind::View,
        }
    }
}

impl Display for ResourceFamily {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secondary locator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondaryKind {
    /// Poster image for a video.
    Thumbnail,
    /// Inline preview for a document.
    View,
}

/// Catalog record describing where a resource lives in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub id: String,
    pub family: ResourceFamily,
    pub title: String,
    /// Object-storage path of the primary asset.
    pub storage_path: String,
    /// Object-storage path of the thumbnail (video) or preview (document).
    pub secondary_path: Option<String>,
    pub mime_type: String,
    /// Next resource in a learning sequence, if any.
    pub sequence_next: Option<String>,
}

/// Signed, time-bounded locator set for one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceHandle {
    pub id: String,
    pub family: ResourceFamily,
    pub title: String,
    /// Stream URL for videos, download URL for documents.
    pub primary_url: String,
    pub secondary_urls: BTreeMap<SecondaryKind, String>,
    pub mime_type: String,
    pub issued_at_ms: i64,
    pub expires_at_ms: i64,
    pub sequence_next: Option<String>,
    /// Placeholder substituted after a lookup/signing failure.
    pub is_fallback: bool,
}

impl ResourceHandle {
    /// Builds a handle whose expiry is derived from `issued_at_ms + ttl`.
    pub fn issue(
        metadata: &ResourceMetadata,
        primary_url: String,
        secondary_urls: BTreeMap<SecondaryKind, String>,
        issued_at_ms: i64,
        ttl: Duration,
    ) -> Self {
        Self {
            id: metadata.id.clone(),
            family: metadata.family,
            title: metadata.title.clone(),
            primary_url,
            secondary_urls,
            mime_type: metadata.mime_type.clone(),
            issued_at_ms,
            expires_at_ms: expiry_from(issued_at_ms, ttl),
            sequence_next: metadata.sequence_next.clone(),
            is_fallback: false,
        }
    }

    /// Returns whether the handle may still be used for network access.
    pub fn is_fresh_at(&self, now_ms: i64) -> bool {
        self.expires_at_ms > now_ms
    }

    /// Returns whether the handle expires at or before `now + within`.
    pub fn expires_within(&self, now_ms: i64, within: Duration) -> bool {
        self.expires_at_ms <= now_ms.saturating_add(duration_ms(within))
    }

    pub fn ttl_ms(&self) -> i64 {
        self.expires_at_ms - self.issued_at_ms
    }

    pub fn stream_url(&self) -> Option<&str> {
        (self.family == ResourceFamily::Video).then_some(self.primary_url.as_str())
    }

    pub fn download_url(&self) -> Option<&str> {
        (self.family == ResourceFamily::Document).then_some(self.primary_url.as_str())
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        self.secondary_urls
            .get(&SecondaryKind::Thumbnail)
            .map(String::as_str)
    }

    pub fn view_url(&self) -> Option<&str> {
        self.secondary_urls
            .get(&SecondaryKind::View)
            .map(String::as_str)
    }
}

/// Ephemeral playback progress sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSample<'a> {
    pub resource_id: &'a str,
    pub current_time: f64,
    pub duration: f64,
}

impl PlaybackSample<'_> {
    /// Completion ratio in percent; `0.0` when duration is unusable.
    pub fn percent_complete(&self) -> f64 {
        if !self.duration.is_finite() || self.duration <= 0.0 || !self.current_time.is_finite() {
            return 0.0;
        }
        (self.current_time / self.duration) * 100.0
    }
}

pub(crate) fn duration_ms(value: Duration) -> i64 {
    i64::try_from(value.as_millis()).unwrap_or(i64::MAX)
}

pub(crate) fn expiry_from(issued_at_ms: i64, ttl: Duration) -> i64 {
    issued_at_ms.saturating_add(duration_ms(ttl))
}

#[cfg(test)]
mod tests {
    use super::{PlaybackSample, ResourceFamily, ResourceHandle, ResourceMetadata};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn metadata() -> ResourceMetadata {
        ResourceMetadata {
            id: "vid-1".to_string(),
            family: ResourceFamily::Video,
            title: "Intro".to_string(),
            storage_path: "videos/intro.mp4".to_string(),
            secondary_path: None,
            mime_type: "video/mp4".to_string(),
            sequence_next: Some("vid-2".to_string()),
        }
    }

    #[test]
    fn expiry_is_issue_time_plus_ttl() {
        let handle = ResourceHandle::issue(
            &metadata(),
            "https://cdn/x".to_string(),
            BTreeMap::new(),
            1_000,
            Duration::from_secs(3600),
        );
        assert_eq!(handle.expires_at_ms, 1_000 + 3_600_000);
        assert_eq!(handle.ttl_ms(), 3_600_000);
        assert!(handle.is_fresh_at(1_000));
        assert!(!handle.is_fresh_at(handle.expires_at_ms));
    }

    #[test]
    fn family_specific_accessors() {
        let handle = ResourceHandle::issue(
            &metadata(),
            "https://cdn/x".to_string(),
            BTreeMap::new(),
            0,
            Duration::from_secs(1),
        );
        assert_eq!(handle.stream_url(), Some("https://cdn/x"));
        assert_eq!(handle.download_url(), None);
    }

    #[test]
    fn percent_complete_guards_invalid_duration() {
        let sample = PlaybackSample {
            resource_id: "vid-1",
            current_time: 10.0,
            duration: 0.0,
        };
        assert_eq!(sample.percent_complete(), 0.0);

        let sample = PlaybackSample {
            resource_id: "vid-1",
            current_time: 85.0,
            duration: 100.0,
        };
        assert!((sample.percent_complete() - 85.0).abs() < f64::EPSILON);
    }
}
