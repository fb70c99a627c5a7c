//! SQLite-backed collaborator adapters.
//!
//! # Responsibility
//! - Provide local implementations of the storage-metadata and analytics
//!   contracts over one shared `db::LocalStore`, so the core runs without
//!   hosted services.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate input before SQL mutations.
//! - Read paths reject invalid persisted rows instead of masking them.

use crate::db::DbError;
use crate::spi::CollaboratorError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod analytics_repo;
pub mod catalog_repo;

pub use analytics_repo::SqliteAnalyticsSink;
pub use catalog_repo::SqliteResourceCatalog;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for catalog and analytics persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    InvalidInput(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidInput(message) => write!(f, "invalid input: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidInput(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<RepoError> for CollaboratorError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Db(err) => err.into(),
            RepoError::InvalidInput(message) | RepoError::InvalidData(message) => {
                Self::Rejected(message)
            }
        }
    }
}
