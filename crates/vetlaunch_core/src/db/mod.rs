//! Local SQLite store behind the catalog and analytics adapters.
//!
//! # Responsibility
//! - Own one connection shared by `SqliteResourceCatalog` and
//!   `SqliteAnalyticsSink`.
//! - Bring the schema to the latest version before either adapter queries.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`; every migration step
//!   commits on its own, so a failed step leaves earlier steps applied.
//! - Store failures reach services only as `CollaboratorError`.

use crate::spi::CollaboratorError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod store;

pub use store::{LocalStore, StoreLocation};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// One migration step failed; earlier steps stay committed.
    Migration {
        version: u32,
        name: &'static str,
        source: rusqlite::Error,
    },
    /// The file was written by a newer build.
    SchemaTooNew { found: u32, supported: u32 },
}

impl DbError {
    /// Stable code used in log lines and collaborator error messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) => "db_sqlite",
            Self::Migration { .. } => "db_migration_failed",
            Self::SchemaTooNew { .. } => "db_schema_too_new",
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Migration {
                version,
                name,
                source,
            } => write!(f, "migration {version} ({name}) failed: {source}"),
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "store schema version {found} is newer than supported {supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::SchemaTooNew { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<DbError> for CollaboratorError {
    fn from(value: DbError) -> Self {
        let message = format!("{}: {value}", value.code());
        match value {
            // Retrying cannot help until the binary is upgraded.
            DbError::SchemaTooNew { .. } => Self::Rejected(message),
            DbError::Sqlite(_) | DbError::Migration { .. } => Self::Unavailable(message),
        }
    }
}
