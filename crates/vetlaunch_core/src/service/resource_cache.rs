//! Signed resource cache for one resource family.
//!
//! # Responsibility
//! - Obtain signed handles from metadata lookup + URL issuance.
//! - Hold the latest handle, last error and in-flight count per id.
//! - Answer freshness questions (`is_expiring`, `fresh_handle`).
//!
//! # Invariants
//! - A successful fetch replaces the stored `Arc<ResourceHandle>` as a whole.
//! - A failed fetch never evicts a previously stored handle.
//! - Fallback handles are returned to the caller but never stored.
//! - Concurrent fetches of one id are not coalesced; the last write wins.
//! - Refresh is advisory: nothing here schedules it.
//! - The state lock is never held across an `.await`.

use crate::clock::Clock;
use crate::config::ResourceConfig;
use crate::events::{CoreEvent, EventBus};
use crate::model::resource::{ResourceFamily, ResourceHandle, ResourceMetadata};
use crate::service::fallback::fallback_handle;
use crate::spi::storage::{MetadataLookup, SignedUrlIssuer};
use crate::spi::{with_deadline, CollaboratorError};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Fetch failure returned when no placeholder applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    InvalidId,
    NotFound {
        family: ResourceFamily,
        id: String,
    },
    InvalidMetadata(String),
    Lookup(CollaboratorError),
    Signing(CollaboratorError),
}

impl ResourceError {
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Lookup(err) | Self::Signing(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// Stable code used in log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidId => "invalid_id",
            Self::NotFound { .. } => "not_found",
            Self::InvalidMetadata(_) => "invalid_metadata",
            Self::Lookup(err) if err.is_timeout() => "lookup_timeout",
            Self::Lookup(_) => "lookup_failed",
            Self::Signing(err) if err.is_timeout() => "signing_timeout",
            Self::Signing(_) => "signing_failed",
        }
    }
}

impl Display for ResourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidId => write!(f, "resource id must not be empty"),
            Self::NotFound { family, id } => write!(f, "{family} not found: {id}"),
            Self::InvalidMetadata(message) => write!(f, "invalid resource metadata: {message}"),
            Self::Lookup(err) => write!(f, "metadata lookup failed: {err}"),
            Self::Signing(err) => write!(f, "url signing failed: {err}"),
        }
    }
}

impl Error for ResourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lookup(err) | Self::Signing(err) => Some(err),
            _ => None,
        }
    }
}

/// Cloneable handle to one family's cache.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    family: ResourceFamily,
    metadata: Arc<dyn MetadataLookup>,
    issuer: Arc<dyn SignedUrlIssuer>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: ResourceConfig,
    state: Mutex<CacheState>,
}

#[derive(Default)]
struct CacheState {
    handles: HashMap<String, Arc<ResourceHandle>>,
    errors: HashMap<String, String>,
    in_flight: HashMap<String, usize>,
}

// Counts one fetch as in flight until dropped, including when the fetch
// future itself is dropped mid-await.
struct InFlightGuard {
    inner: Arc<CacheInner>,
    id: String,
}

impl InFlightGuard {
    fn begin(inner: &Arc<CacheInner>, id: &str) -> Self {
        *inner
            .state
            .lock()
            .in_flight
            .entry(id.to_string())
            .or_insert(0) += 1;
        Self {
            inner: Arc::clone(inner),
            id: id.to_string(),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut state = self.inner.state.lock();
        if let Some(count) = state.in_flight.get_mut(&self.id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.in_flight.remove(&self.id);
            }
        }
    }
}

impl ResourceCache {
    pub fn new(
        family: ResourceFamily,
        metadata: Arc<dyn MetadataLookup>,
        issuer: Arc<dyn SignedUrlIssuer>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        config: ResourceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                family,
                metadata,
                issuer,
                clock,
                events,
                config,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn family(&self) -> ResourceFamily {
        self.inner.family
    }

    /// Requests a new signed handle for `id`.
    ///
    /// `ttl` defaults to the configured family TTL. On failure the per-id
    /// error is recorded and any earlier handle stays cached. Families with a
    /// placeholder return the earlier handle while it is still fresh, else
    /// the placeholder (tagged `is_fallback`); other families return the
    /// error.
    pub async fn fetch(
        &self,
        id: &str,
        ttl: Option<Duration>,
    ) -> Result<Arc<ResourceHandle>, ResourceError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(ResourceError::InvalidId);
        }
        let ttl = ttl.unwrap_or_else(|| self.inner.config.default_ttl());
        let family = self.inner.family;
        let _in_flight = InFlightGuard::begin(&self.inner, id);
        let started_at = Instant::now();

        match self.issue(id, ttl).await {
            Ok(handle) => {
                let handle = Arc::new(handle);
                {
                    let mut state = self.inner.state.lock();
                    state.handles.insert(id.to_string(), Arc::clone(&handle));
                    state.errors.remove(id);
                }
                info!(
                    "event=resource_fetch module=resources status=ok family={} id={} ttl_s={} duration_ms={}",
                    family,
                    id,
                    ttl.as_secs(),
                    started_at.elapsed().as_millis()
                );
                self.inner.events.emit(CoreEvent::ResourceReady {
                    family,
                    id: id.to_string(),
                    expires_at_ms: handle.expires_at_ms,
                });
                Ok(handle)
            }
            Err(err) => {
                let now = self.inner.clock.now_ms();
                let still_fresh = {
                    let mut state = self.inner.state.lock();
                    state.errors.insert(id.to_string(), err.to_string());
                    state
                        .handles
                        .get(id)
                        .filter(|handle| handle.is_fresh_at(now))
                        .cloned()
                };
                // A valid earlier handle outranks the placeholder; families
                // without a placeholder still report the error.
                let placeholder = fallback_handle(family, id, &self.inner.config, now);
                let (still_fresh, fallback) = match (still_fresh, placeholder) {
                    (Some(previous), Some(_)) => (Some(previous), None),
                    (_, placeholder) => (None, placeholder),
                };
                warn!(
                    "event=resource_fetch module=resources status=error family={} id={} duration_ms={} error_code={} kept_previous={} fallback={} error={}",
                    family,
                    id,
                    started_at.elapsed().as_millis(),
                    err.code(),
                    still_fresh.is_some(),
                    fallback.is_some(),
                    err
                );
                self.inner.events.emit(CoreEvent::ResourceFailed {
                    family,
                    id: id.to_string(),
                    error: err.to_string(),
                    fallback_served: fallback.is_some(),
                });
                match (still_fresh, fallback) {
                    (Some(handle), _) => Ok(handle),
                    (None, Some(handle)) => Ok(Arc::new(handle)),
                    (None, None) => Err(err),
                }
            }
        }
    }

    /// Re-fetches `id` with family defaults.
    pub async fn refresh(&self, id: &str) -> Result<Arc<ResourceHandle>, ResourceError> {
        debug!(
            "event=resource_refresh module=resources status=start family={} id={}",
            self.inner.family, id
        );
        self.fetch(id, None).await
    }

    /// Whether the cached handle expires at or before `now + within`.
    ///
    /// `false` when nothing is cached for `id`.
    pub fn is_expiring(&self, id: &str, within: Duration) -> bool {
        let now = self.inner.clock.now_ms();
        self.inner
            .state
            .lock()
            .handles
            .get(id)
            .is_some_and(|handle| handle.expires_within(now, within))
    }

    /// `is_expiring` with the configured warning window.
    pub fn needs_refresh(&self, id: &str) -> bool {
        self.is_expiring(id, self.inner.config.expiry_warning())
    }

    /// Latest cached handle, fresh or stale.
    pub fn handle(&self, id: &str) -> Option<Arc<ResourceHandle>> {
        self.inner.state.lock().handles.get(id).cloned()
    }

    /// Cached handle only while it is still valid for network access.
    pub fn fresh_handle(&self, id: &str) -> Option<Arc<ResourceHandle>> {
        let now = self.inner.clock.now_ms();
        self.handle(id).filter(|handle| handle.is_fresh_at(now))
    }

    /// Error message of the most recent failed fetch, cleared on success.
    pub fn last_error(&self, id: &str) -> Option<String> {
        self.inner.state.lock().errors.get(id).cloned()
    }

    pub fn is_cached(&self, id: &str) -> bool {
        self.inner.state.lock().handles.contains_key(id)
    }

    pub fn is_in_flight(&self, id: &str) -> bool {
        self.inner.state.lock().in_flight.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn issue(&self, id: &str, ttl: Duration) -> Result<ResourceHandle, ResourceError> {
        let family = self.inner.family;
        let deadline = self.inner.config.collaborator_timeout();

        let metadata = with_deadline(deadline, self.inner.metadata.get_metadata(family, id))
            .await
            .map_err(ResourceError::Lookup)?
            .ok_or_else(|| ResourceError::NotFound {
                family,
                id: id.to_string(),
            })?;
        validate_metadata(&metadata, family, id)?;

        // Captured before signing so the recorded expiry never outlives the
        // issuer's own.
        let issued_at = self.inner.clock.now_ms();
        let primary_url = with_deadline(
            deadline,
            self.inner
                .issuer
                .create_signed_url(&metadata.storage_path, ttl),
        )
        .await
        .map_err(ResourceError::Signing)?;
        if primary_url.trim().is_empty() {
            return Err(ResourceError::Signing(CollaboratorError::Rejected(
                "issuer returned an empty url".to_string(),
            )));
        }

        let mut secondary_urls = BTreeMap::new();
        if let Some(path) = metadata
            .secondary_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
        {
            match with_deadline(deadline, self.inner.issuer.create_signed_url(path, ttl)).await {
                Ok(url) if !url.trim().is_empty() => {
                    secondary_urls.insert(family.secondary_kind(), url);
                }
                Ok(_) => warn!(
                    "event=resource_secondary module=resources status=error family={family} id={id} error_code=empty_url"
                ),
                Err(err) => warn!(
                    "event=resource_secondary module=resources status=error family={} id={} error_code={} error={}",
                    family,
                    id,
                    err.code(),
                    err
                ),
            }
        }

        Ok(ResourceHandle::issue(
            &metadata,
            primary_url,
            secondary_urls,
            issued_at,
            ttl,
        ))
    }
}

fn validate_metadata(
    metadata: &ResourceMetadata,
    family: ResourceFamily,
    id: &str,
) -> Result<(), ResourceError> {
    if metadata.family != family {
        return Err(ResourceError::InvalidMetadata(format!(
            "{id} is a {} but was requested as a {family}",
            metadata.family
        )));
    }
    if metadata.id != id {
        return Err(ResourceError::InvalidMetadata(format!(
            "lookup for {id} returned record {}",
            metadata.id
        )));
    }
    if metadata.storage_path.trim().is_empty() {
        return Err(ResourceError::InvalidMetadata(format!(
            "{id} has an empty storage path"
        )));
    }
    Ok(())
}
