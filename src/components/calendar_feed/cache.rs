//! Time-to-live cache over the calendar feed.
//!
//! Refresh policy is non-blocking: the first caller that finds the snapshot
//! expired performs the refetch. Callers arriving while that refetch is in
//! flight get the current snapshot immediately, flagged stale, and see the
//! fresh one on their next call.

use super::models::{CacheSnapshot, Event};
use super::parser::parse_feed;
use super::source::FeedSource;
use crate::error::BotResult;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Result of a cache read
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub snapshot: Arc<CacheSnapshot>,
    /// Set when the snapshot could not be refreshed for this read
    pub is_stale: bool,
}

impl CacheRead {
    pub fn events(&self) -> &[Event] {
        &self.snapshot.events
    }

    pub fn find(&self, uid: &str) -> Option<&Event> {
        self.snapshot.find(uid)
    }
}

pub struct EventCache {
    source: Arc<dyn FeedSource>,
    default_zone: Tz,
    snapshot: RwLock<Arc<CacheSnapshot>>,
    refreshing: AtomicBool,
    last_error: RwLock<Option<String>>,
}

/// Clears the in-flight flag even if the refreshing future is dropped
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl EventCache {
    pub fn new(source: Arc<dyn FeedSource>, default_zone: Tz) -> Self {
        Self {
            source,
            default_zone,
            snapshot: RwLock::new(Arc::new(CacheSnapshot::default())),
            refreshing: AtomicBool::new(false),
            last_error: RwLock::new(None),
        }
    }

    /// Get events, refetching when the snapshot is older than `max_age`
    pub async fn get(&self, max_age: Duration) -> CacheRead {
        self.get_at(max_age, Utc::now()).await
    }

    /// [`EventCache::get`] with an explicit clock reading
    pub async fn get_at(&self, max_age: Duration, now: DateTime<Utc>) -> CacheRead {
        let current = self.current().await;
        if current.is_fresh(now, max_age) {
            return CacheRead {
                snapshot: current,
                is_stale: false,
            };
        }

        self.refresh_expired(current, max_age, now).await
    }

    /// Refetch after `observed` was found expired, unless another caller
    /// is already refreshing or has refreshed since
    async fn refresh_expired(
        &self,
        observed: Arc<CacheSnapshot>,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> CacheRead {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Feed refresh already in flight, serving current snapshot");
            return CacheRead {
                snapshot: observed,
                is_stale: true,
            };
        }
        let _guard = RefreshGuard(&self.refreshing);

        // A refresh may have finished between the freshness check and the claim
        let current = self.current().await;
        if current.is_fresh(now, max_age) {
            return CacheRead {
                snapshot: current,
                is_stale: false,
            };
        }

        match self.refresh(now).await {
            Ok(snapshot) => CacheRead {
                snapshot,
                is_stale: false,
            },
            Err(e) => {
                error!("Failed to refresh calendar feed: {}", e);
                *self.last_error.write().await = Some(e.to_string());
                CacheRead {
                    snapshot: self.current().await,
                    is_stale: true,
                }
            }
        }
    }

    async fn refresh(&self, now: DateTime<Utc>) -> BotResult<Arc<CacheSnapshot>> {
        let text = self.source.fetch().await?;
        let events: Vec<Event> = parse_feed(&text)?
            .into_iter()
            .map(|raw| raw.normalize(self.default_zone))
            .collect();

        info!("Calendar feed refreshed with {} events", events.len());

        let snapshot = Arc::new(CacheSnapshot {
            events,
            fetched_at: Some(now),
        });
        *self.snapshot.write().await = Arc::clone(&snapshot);
        *self.last_error.write().await = None;

        Ok(snapshot)
    }

    /// Current snapshot without any freshness check
    pub async fn current(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    /// Force the next read to refetch. Events are kept for stale reads.
    pub async fn invalidate(&self) {
        let mut snapshot = self.snapshot.write().await;
        *snapshot = Arc::new(CacheSnapshot {
            events: snapshot.events.clone(),
            fetched_at: None,
        });
    }

    /// Error from the most recent failed refresh, cleared on success
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.read().await.clone()
    }

    pub fn default_zone(&self) -> Tz {
        self.default_zone
    }
}
