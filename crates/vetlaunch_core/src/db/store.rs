use super::migrations::{latest_version, migrate, schema_version};
use super::DbResult;
use crate::repo::{SqliteAnalyticsSink, SqliteResourceCatalog};
use log::{error, info};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a [`LocalStore`] keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

impl StoreLocation {
    fn mode(&self) -> &'static str {
        match self {
            Self::File(_) => "file",
            Self::Memory => "memory",
        }
    }

    fn connect(&self) -> rusqlite::Result<Connection> {
        match self {
            Self::File(path) => Connection::open(path),
            Self::Memory => Connection::open_in_memory(),
        }
    }
}

/// Cloneable handle to one migrated SQLite connection.
///
/// Clones share the connection, so a catalog and an analytics sink built
/// from the same store see each other's writes, including in memory.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
}

impl LocalStore {
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open_at(StoreLocation::File(path.as_ref().to_path_buf()))
    }

    pub fn in_memory() -> DbResult<Self> {
        Self::open_at(StoreLocation::Memory)
    }

    /// Connects and applies pending migrations.
    pub fn open_at(location: StoreLocation) -> DbResult<Self> {
        let started_at = Instant::now();
        let mode = location.mode();

        match connect_and_migrate(&location) {
            Ok((conn, applied)) => {
                info!(
                    "event=store_open module=db status=ok mode={} applied={} schema_version={} duration_ms={}",
                    mode,
                    applied,
                    latest_version(),
                    started_at.elapsed().as_millis()
                );
                Ok(Self {
                    conn: Arc::new(Mutex::new(conn)),
                })
            }
            Err(err) => {
                error!(
                    "event=store_open module=db status=error mode={} duration_ms={} error_code={} error={}",
                    mode,
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    pub fn schema_version(&self) -> DbResult<u32> {
        Ok(schema_version(&self.conn.lock())?)
    }

    /// Resource catalog over this store.
    pub fn catalog(&self) -> SqliteResourceCatalog {
        SqliteResourceCatalog::new(self.clone())
    }

    /// Analytics sink over this store.
    pub fn analytics(&self) -> SqliteAnalyticsSink {
        SqliteAnalyticsSink::new(self.clone())
    }

    /// Runs `f` with exclusive access to the connection.
    pub(crate) fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E> {
        let conn = self.conn.lock();
        f(&conn)
    }
}

fn connect_and_migrate(location: &StoreLocation) -> DbResult<(Connection, usize)> {
    let mut conn = location.connect()?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    let applied = migrate(&mut conn)?;
    Ok((conn, applied))
}
