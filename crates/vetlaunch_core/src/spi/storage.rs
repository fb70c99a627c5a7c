//! Object-storage contracts: metadata lookup and signed-URL issuance.

use super::CollaboratorResult;
use crate::model::resource::{ResourceFamily, ResourceMetadata};
use async_trait::async_trait;
use std::time::Duration;

/// Catalog lookup for resource storage metadata.
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    /// Returns `Ok(None)` when the id is unknown for `family`.
    async fn get_metadata(
        &self,
        family: ResourceFamily,
        id: &str,
    ) -> CollaboratorResult<Option<ResourceMetadata>>;
}

/// Issues access-controlled, time-limited URLs for storage paths.
#[async_trait]
pub trait SignedUrlIssuer: Send + Sync {
    async fn create_signed_url(&self, storage_path: &str, ttl: Duration)
        -> CollaboratorResult<String>;
}
