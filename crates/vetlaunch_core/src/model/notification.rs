//! Notification domain model.
//!
//! # Responsibility
//! - Define the record rendered by notification panels and toasts.
//! - Define the severity ladder used when mention detection upgrades a kind.
//!
//! # Invariants
//! - `read` is monotonic: it only ever moves from `false` to `true`.
//! - `description` holds rendered text (mention markup already applied).
//! - `mentioned_user_ids` is empty unless at least one mention resolved.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Category of one notification, ordered by display severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    MissionCritical,
    HighPriority,
    Standard,
    Informational,
    Mention,
}

impl NotificationKind {
    /// Numeric severity rank; higher means more urgent.
    ///
    /// `Mention` sits between `HighPriority` and `Standard`, so a mention only
    /// upgrades standard and informational drafts.
    pub fn severity(self) -> u8 {
        match self {
            Self::MissionCritical => 4,
            Self::HighPriority => 3,
            Self::Mention => 2,
            Self::Standard => 1,
            Self::Informational => 0,
        }
    }

    /// Stable string id used in logs and inbound payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissionCritical => "mission-critical",
            Self::HighPriority => "high-priority",
            Self::Standard => "standard",
            Self::Informational => "informational",
            Self::Mention => "mention",
        }
    }

    /// Parses an inbound kind string.
    ///
    /// Accepts kebab-case and snake_case spellings, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "mission-critical" => Some(Self::MissionCritical),
            "high-priority" => Some(Self::HighPriority),
            "standard" => Some(Self::Standard),
            "informational" => Some(Self::Informational),
            "mention" => Some(Self::Mention),
            _ => None,
        }
    }
}

/// One entry in the notification stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub title: String,
    /// Rendered description; may embed mention spans.
    pub description: String,
    /// Local short-time display string, e.g. `3:07 PM`.
    pub time: String,
    /// Unix epoch milliseconds at insertion.
    pub created_at_ms: i64,
    pub read: bool,
    pub kind: NotificationKind,
    pub mentioned_by: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub mentioned_user_ids: BTreeSet<String>,
}

impl Notification {
    /// Marks this notification as read. Returns `true` when state changed.
    pub fn mark_read(&mut self) -> bool {
        if self.read {
            return false;
        }
        self.read = true;
        true
    }

    pub fn is_mention(&self) -> bool {
        self.kind == NotificationKind::Mention
    }
}

/// Caller-supplied input for `NotificationStore::add_notification`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationDraft {
    /// Explicit id; a random v4 UUID is generated when absent.
    pub id: Option<String>,
    pub title: String,
    /// Raw description; mention tokens are resolved on insert.
    pub description: String,
    /// Requested kind. `None` means "standard unless a mention resolves".
    pub kind: Option<NotificationKind>,
    pub mentioned_by: Option<String>,
}

impl NotificationDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn mentioned_by(mut self, sender: impl Into<String>) -> Self {
        self.mentioned_by = Some(sender.into());
        self
    }

    /// Resolves the final kind given whether any mention resolved.
    pub fn effective_kind(&self, has_mentions: bool) -> NotificationKind {
        match self.kind {
            Some(kind) if !has_mentions => kind,
            Some(kind) if kind.severity() > NotificationKind::Mention.severity() => kind,
            Some(_) => NotificationKind::Mention,
            None if has_mentions => NotificationKind::Mention,
            None => NotificationKind::Standard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{NotificationDraft, NotificationKind};

    #[test]
    fn mention_upgrades_only_lower_severity_kinds() {
        let standard = NotificationDraft::new("t", "d").with_kind(NotificationKind::Standard);
        assert_eq!(standard.effective_kind(true), NotificationKind::Mention);

        let info = NotificationDraft::new("t", "d").with_kind(NotificationKind::Informational);
        assert_eq!(info.effective_kind(true), NotificationKind::Mention);

        let critical =
            NotificationDraft::new("t", "d").with_kind(NotificationKind::MissionCritical);
        assert_eq!(critical.effective_kind(true), NotificationKind::MissionCritical);

        let high = NotificationDraft::new("t", "d").with_kind(NotificationKind::HighPriority);
        assert_eq!(high.effective_kind(true), NotificationKind::HighPriority);
    }

    #[test]
    fn unspecified_kind_defaults_to_standard_without_mentions() {
        let draft = NotificationDraft::new("t", "d");
        assert_eq!(draft.effective_kind(false), NotificationKind::Standard);
        assert_eq!(draft.effective_kind(true), NotificationKind::Mention);
    }

    #[test]
    fn parses_kind_spellings() {
        assert_eq!(
            NotificationKind::parse("Mission_Critical"),
            Some(NotificationKind::MissionCritical)
        );
        assert_eq!(
            NotificationKind::parse(" high-priority "),
            Some(NotificationKind::HighPriority)
        );
        assert_eq!(NotificationKind::parse("urgent"), None);
    }
}
