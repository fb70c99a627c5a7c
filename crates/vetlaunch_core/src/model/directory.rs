//! Roster entries used for mention resolution.
//!
//! The authoritative roster lives in an external service; core only reads a
//! snapshot through [`UserDirectory`].

use serde::{Deserialize, Serialize};

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub display_name: String,
}

impl DirectoryEntry {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// First whitespace-separated word of the display name.
    pub fn first_name(&self) -> Option<&str> {
        self.display_name.split_whitespace().next()
    }
}

/// Read-only roster snapshot provider.
///
/// Iteration order of `entries()` is significant: it breaks ties during
/// mention resolution (first listed wins).
pub trait UserDirectory: Send + Sync {
    fn entries(&self) -> Vec<DirectoryEntry>;
}

/// Fixed in-memory roster.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: Vec<DirectoryEntry>,
}

impl StaticDirectory {
    pub fn new(entries: Vec<DirectoryEntry>) -> Self {
        Self { entries }
    }
}

impl UserDirectory for StaticDirectory {
    fn entries(&self) -> Vec<DirectoryEntry> {
        self.entries.clone()
    }
}
