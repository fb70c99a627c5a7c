//! Core runtime configuration.
//!
//! # Responsibility
//! - Define tunables for notifications, resource delivery, playback and the
//!   tutor wrapper, with reference defaults.
//! - Load configuration from JSON text or a file.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - `validate()` runs on every load path before a config is returned.

use crate::logging::default_log_level;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub notifications: NotificationConfig,
    pub resources: ResourceConfig,
    pub playback: PlaybackConfig,
    pub logging: LoggingConfig,
    pub tutor: TutorConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotificationConfig {
    /// Realtime channel the store subscribes to at startup.
    pub channel: String,
    /// How long the transient `connected` acknowledgement stays up.
    pub connected_ack_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            channel: "notifications".to_string(),
            connected_ack_ms: 3_000,
        }
    }
}

impl NotificationConfig {
    pub fn connected_ack(&self) -> Duration {
        Duration::from_millis(self.connected_ack_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceConfig {
    pub default_ttl_secs: u64,
    /// TTL for prefetched resources; outlives the default so unconsumed
    /// content is still valid when playback reaches it.
    pub prefetch_ttl_secs: u64,
    /// Window used by callers deciding whether to refresh a handle.
    pub expiry_warning_secs: u64,
    /// Deadline for each collaborator call; `None` leaves timing to the
    /// collaborator.
    pub collaborator_timeout_ms: Option<u64>,
    /// Download locator of the placeholder document.
    pub fallback_document_url: String,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3_600,
            prefetch_ttl_secs: 7_200,
            expiry_warning_secs: 300,
            collaborator_timeout_ms: None,
            fallback_document_url:
                "/documents/placeholders/business-structure-comparison-chart.pdf".to_string(),
        }
    }
}

impl ResourceConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn prefetch_ttl(&self) -> Duration {
        Duration::from_secs(self.prefetch_ttl_secs)
    }

    pub fn expiry_warning(&self) -> Duration {
        Duration::from_secs(self.expiry_warning_secs)
    }

    pub fn collaborator_timeout(&self) -> Option<Duration> {
        self.collaborator_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    pub prefetch_threshold_percent: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            prefetch_threshold_percent: 80.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TutorConfig {
    pub model: String,
    pub temperature: f32,
    pub system_prompt: String,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            system_prompt: "You are a mentor for veteran entrepreneurs. Give concise, practical \
                            guidance grounded in small-business fundamentals."
                .to_string(),
        }
    }
}

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl CoreConfig {
    /// Parses and validates configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Checks cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.notifications.channel.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "notifications.channel must not be empty".to_string(),
            ));
        }
        if self.resources.default_ttl_secs == 0 {
            return Err(ConfigError::Invalid(
                "resources.default_ttl_secs must be positive".to_string(),
            ));
        }
        if self.resources.prefetch_ttl_secs < self.resources.default_ttl_secs {
            return Err(ConfigError::Invalid(format!(
                "resources.prefetch_ttl_secs ({}) must not be shorter than default_ttl_secs ({})",
                self.resources.prefetch_ttl_secs, self.resources.default_ttl_secs
            )));
        }
        if self.resources.fallback_document_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "resources.fallback_document_url must not be empty".to_string(),
            ));
        }
        let threshold = self.playback.prefetch_threshold_percent;
        if !threshold.is_finite() || !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "playback.prefetch_threshold_percent must be within 0..=100, got {threshold}"
            )));
        }
        let temperature = self.tutor.temperature;
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Invalid(format!(
                "tutor.temperature must be within 0..=2, got {temperature}"
            )));
        }
        Ok(())
    }
}
