//! Playback progress tracking and next-resource prefetch.
//!
//! # Responsibility
//! - Forward progress samples of cached videos to the analytics sink.
//! - Prefetch the next video in a sequence once a completion threshold is
//!   crossed.
//!
//! # Invariants
//! - Samples for ids without a cached handle are ignored.
//! - Analytics and prefetch run in the background; their failures are
//!   logged and never reach the caller.
//! - At most one prefetch is issued per next-id per session, however many
//!   samples cross the threshold.

use crate::clock::Clock;
use crate::config::{PlaybackConfig, ResourceConfig};
use crate::events::{CoreEvent, EventBus};
use crate::model::resource::PlaybackSample;
use crate::service::resource_cache::ResourceCache;
use crate::spi::analytics::{AnalyticsEvent, AnalyticsSink, EVENT_PLAYBACK_PROGRESS};
use crate::spi::with_deadline;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Prefetch outcome for one progress sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefetchDecision {
    /// No handle cached for the sampled id; nothing was recorded.
    NotTracked,
    BelowThreshold,
    /// The cached handle declares no next resource.
    NoSequence,
    /// Next resource is cached, in flight, or already prefetched this session.
    AlreadyAvailable(String),
    Issued(String),
    /// Threshold crossed but no runtime was available to run the fetch.
    NoRuntime(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub percent_complete: f64,
    pub prefetch: PrefetchDecision,
}

pub struct PlaybackTracker {
    cache: ResourceCache,
    analytics: Arc<dyn AnalyticsSink>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    threshold_percent: f64,
    prefetch_ttl: Duration,
    deadline: Option<Duration>,
    session: Mutex<TrackerSession>,
}

#[derive(Default)]
struct TrackerSession {
    prefetched: HashSet<String>,
    pending: Vec<JoinHandle<()>>,
}

impl PlaybackTracker {
    pub fn new(
        cache: ResourceCache,
        analytics: Arc<dyn AnalyticsSink>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        playback: &PlaybackConfig,
        resources: &ResourceConfig,
    ) -> Self {
        Self {
            cache,
            analytics,
            clock,
            events,
            threshold_percent: playback.prefetch_threshold_percent,
            prefetch_ttl: resources.prefetch_ttl(),
            deadline: resources.collaborator_timeout(),
            session: Mutex::new(TrackerSession::default()),
        }
    }

    /// Records one progress sample and decides whether to prefetch.
    ///
    /// Must be called from within a tokio runtime for background work to run;
    /// outside one, the sample is evaluated but nothing is spawned.
    pub fn track_progress(&self, id: &str, current_time: f64, duration: f64) -> ProgressReport {
        let Some(handle) = self.cache.handle(id) else {
            debug!("event=playback_progress module=playback status=ignored reason=not_cached id={id}");
            return ProgressReport {
                percent_complete: 0.0,
                prefetch: PrefetchDecision::NotTracked,
            };
        };

        let sample = PlaybackSample {
            resource_id: id,
            current_time,
            duration,
        };
        let percent_complete = sample.percent_complete();
        self.record_analytics(AnalyticsEvent {
            event_type: EVENT_PLAYBACK_PROGRESS.to_string(),
            resource_id: id.to_string(),
            family: handle.family,
            current_time,
            duration,
            percent_complete,
            recorded_at_ms: self.clock.now_ms(),
        });

        let prefetch = if percent_complete < self.threshold_percent {
            PrefetchDecision::BelowThreshold
        } else {
            match handle.sequence_next.as_deref() {
                Some(next_id) => self.prefetch_next(id, next_id),
                None => PrefetchDecision::NoSequence,
            }
        };

        ProgressReport {
            percent_complete,
            prefetch,
        }
    }

    /// Forgets which ids were prefetched, e.g. when a new viewing session
    /// starts.
    pub fn reset_session(&self) {
        self.session.lock().prefetched.clear();
    }

    /// Waits for all background analytics posts and prefetches.
    pub async fn settle(&self) {
        loop {
            let pending = std::mem::take(&mut self.session.lock().pending);
            if pending.is_empty() {
                return;
            }
            for task in pending {
                if let Err(err) = task.await {
                    warn!("event=playback_settle module=playback status=error error={err}");
                }
            }
        }
    }

    fn prefetch_next(&self, from_id: &str, next_id: &str) -> PrefetchDecision {
        {
            let mut session = self.session.lock();
            if session.prefetched.contains(next_id)
                || self.cache.is_cached(next_id)
                || self.cache.is_in_flight(next_id)
            {
                return PrefetchDecision::AlreadyAvailable(next_id.to_string());
            }
            session.prefetched.insert(next_id.to_string());
        }

        let cache = self.cache.clone();
        let ttl = self.prefetch_ttl;
        let target = next_id.to_string();
        let spawned = self.spawn_background(async move {
            match cache.fetch(&target, Some(ttl)).await {
                Ok(handle) if handle.is_fallback => warn!(
                    "event=playback_prefetch module=playback status=fallback id={target}"
                ),
                Ok(_) => info!(
                    "event=playback_prefetch module=playback status=ok id={} ttl_s={}",
                    target,
                    ttl.as_secs()
                ),
                Err(err) => warn!(
                    "event=playback_prefetch module=playback status=error id={} error_code={} error={}",
                    target,
                    err.code(),
                    err
                ),
            }
        });

        if !spawned {
            // Allow a later sample inside a runtime to try again.
            self.session.lock().prefetched.remove(next_id);
            return PrefetchDecision::NoRuntime(next_id.to_string());
        }

        self.events.emit(CoreEvent::PrefetchIssued {
            from_id: from_id.to_string(),
            next_id: next_id.to_string(),
        });
        PrefetchDecision::Issued(next_id.to_string())
    }

    fn record_analytics(&self, event: AnalyticsEvent) {
        let sink = Arc::clone(&self.analytics);
        let deadline = self.deadline;
        self.spawn_background(async move {
            if let Err(err) = with_deadline(deadline, sink.record_event(&event)).await {
                warn!(
                    "event=playback_analytics module=playback status=error id={} error_code={} error={}",
                    event.resource_id,
                    err.code(),
                    err
                );
            }
        });
    }

    fn spawn_background<F>(&self, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("event=playback_background module=playback status=skipped reason=no_runtime");
            return false;
        };
        let handle = runtime.spawn(task);
        let mut session = self.session.lock();
        session.pending.retain(|task| !task.is_finished());
        session.pending.push(handle);
        true
    }
}
