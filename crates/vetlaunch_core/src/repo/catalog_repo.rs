//! Resource catalog backed by the `resources` table.
//!
//! # Responsibility
//! - Serve `MetadataLookup` for both resource families.
//!
//! # Invariants
//! - Rows are keyed by `(family, id)`; the same id may exist in both families.
//! - A resource never names itself as `sequence_next`.

use super::{RepoError, RepoResult};
use crate::db::LocalStore;
use crate::model::resource::{ResourceFamily, ResourceMetadata};
use crate::spi::storage::MetadataLookup;
use crate::spi::CollaboratorResult;
use async_trait::async_trait;
use log::info;
use rusqlite::{params, Connection, Row};

const RESOURCE_SELECT_SQL: &str = "SELECT
    family,
    id,
    title,
    storage_path,
    secondary_path,
    mime_type,
    sequence_next
FROM resources";

pub struct SqliteResourceCatalog {
    store: LocalStore,
}

impl SqliteResourceCatalog {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Inserts or replaces one catalog entry.
    pub fn upsert(&self, metadata: &ResourceMetadata) -> RepoResult<()> {
        validate(metadata)?;
        self.store.with_conn(|conn| {
            conn.execute(
                "INSERT INTO resources (
                    family,
                    id,
                    title,
                    storage_path,
                    secondary_path,
                    mime_type,
                    sequence_next,
                    updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, (strftime('%s', 'now') * 1000))
                ON CONFLICT (family, id) DO UPDATE SET
                    title = excluded.title,
                    storage_path = excluded.storage_path,
                    secondary_path = excluded.secondary_path,
                    mime_type = excluded.mime_type,
                    sequence_next = excluded.sequence_next,
                    updated_at = excluded.updated_at;",
                params![
                    metadata.family.as_str(),
                    metadata.id.as_str(),
                    metadata.title.as_str(),
                    metadata.storage_path.as_str(),
                    metadata.secondary_path.as_deref(),
                    metadata.mime_type.as_str(),
                    metadata.sequence_next.as_deref(),
                ],
            )
        })?;
        info!(
            "event=catalog_upsert module=repo status=ok family={} id={}",
            metadata.family, metadata.id
        );
        Ok(())
    }

    pub fn find(&self, family: ResourceFamily, id: &str) -> RepoResult<Option<ResourceMetadata>> {
        self.store.with_conn(|conn| find_in(conn, family, id))
    }
}

#[async_trait]
impl MetadataLookup for SqliteResourceCatalog {
    async fn get_metadata(
        &self,
        family: ResourceFamily,
        id: &str,
    ) -> CollaboratorResult<Option<ResourceMetadata>> {
        Ok(self.find(family, id)?)
    }
}

fn find_in(
    conn: &Connection,
    family: ResourceFamily,
    id: &str,
) -> RepoResult<Option<ResourceMetadata>> {
    let mut stmt = conn.prepare(&format!(
        "{RESOURCE_SELECT_SQL} WHERE family = ?1 AND id = ?2;"
    ))?;
    let mut rows = stmt.query(params![family.as_str(), id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_resource_row(row)?));
    }
    Ok(None)
}

fn parse_resource_row(row: &Row<'_>) -> RepoResult<ResourceMetadata> {
    let family_text: String = row.get("family")?;
    let family = ResourceFamily::parse(&family_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid family `{family_text}` in resources.family"))
    })?;

    Ok(ResourceMetadata {
        id: row.get("id")?,
        family,
        title: row.get("title")?,
        storage_path: row.get("storage_path")?,
        secondary_path: row.get("secondary_path")?,
        mime_type: row.get("mime_type")?,
        sequence_next: row.get("sequence_next")?,
    })
}

fn validate(metadata: &ResourceMetadata) -> RepoResult<()> {
    if metadata.id.trim().is_empty() {
        return Err(RepoError::InvalidInput("resource id must not be blank".into()));
    }
    if metadata.storage_path.trim().is_empty() {
        return Err(RepoError::InvalidInput(format!(
            "resource `{}` has no storage path",
            metadata.id
        )));
    }
    if metadata.sequence_next.as_deref() == Some(metadata.id.as_str()) {
        return Err(RepoError::InvalidInput(format!(
            "resource `{}` cannot follow itself",
            metadata.id
        )));
    }
    Ok(())
}
