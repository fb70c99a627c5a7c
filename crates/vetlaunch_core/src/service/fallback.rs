//! Placeholder handles served when lookup or signing fails.
//!
//! Only the document family has a placeholder; a failed video fetch yields
//! no handle at all.

use crate::config::ResourceConfig;
use crate::model::resource::{expiry_from, ResourceFamily, ResourceHandle, SecondaryKind};
use std::collections::BTreeMap;

/// Title of the placeholder document.
pub const FALLBACK_DOCUMENT_TITLE: &str = "Business Structure Comparison Chart";
const FALLBACK_DOCUMENT_MIME: &str = "application/pdf";

/// Builds the family placeholder for `id`, tagged `is_fallback`.
pub fn fallback_handle(
    family: ResourceFamily,
    id: &str,
    config: &ResourceConfig,
    now_ms: i64,
) -> Option<ResourceHandle> {
    match family {
        ResourceFamily::Video => None,
        ResourceFamily::Document => {
            let url = config.fallback_document_url.clone();
            let mut secondary_urls = BTreeMap::new();
            secondary_urls.insert(SecondaryKind::View, url.clone());
            Some(ResourceHandle {
                id: id.to_string(),
                family,
                title: FALLBACK_DOCUMENT_TITLE.to_string(),
                primary_url: url,
                secondary_urls,
                mime_type: FALLBACK_DOCUMENT_MIME.to_string(),
                issued_at_ms: now_ms,
                expires_at_ms: expiry_from(now_ms, config.default_ttl()),
                sequence_next: None,
                is_fallback: true,
            })
        }
    }
}
