//! Read-through snapshot cache.
//!
//! Holds a single snapshot of the full record list behind a constant key.
//! Reads are routed by [`Freshness`]; writes patch the snapshot in place
//! from the store's response instead of invalidating it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chanda_core::{ChandaError, ChandaResult, Clock, StorageError, Timestamp};
use tokio::sync::RwLock;

use super::freshness::{staleness_between, CacheRead, Freshness, ListRead};
use super::traits::{CacheStats, CacheableEntity};

/// Configuration for the read-through cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Staleness accepted by [`ReadThroughCache::default_freshness`].
    pub max_staleness: Duration,
    /// Snapshot length cap, applied on fill and prepend.
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_staleness: Duration::from_secs(chanda_core::config::DEFAULT_FRESHNESS_WINDOW_SECS),
            max_entries: None,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_staleness(mut self, duration: Duration) -> Self {
        self.max_staleness = duration;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    fn cap<T>(&self, records: &mut Vec<T>) {
        if let Some(max) = self.max_entries {
            records.truncate(max);
        }
    }
}

/// Source of a full snapshot on cache miss.
#[async_trait]
pub trait SnapshotFetcher<T: CacheableEntity>: Send + Sync {
    async fn fetch(&self) -> ChandaResult<Vec<T>>;
}

struct Snapshot<T> {
    records: Vec<T>,
    cached_at: Timestamp,
}

struct CacheState<T> {
    snapshot: Option<Snapshot<T>>,
    stats: CacheStats,
    /// Bumped by every write to the snapshot, including writes that found
    /// no snapshot to patch.
    generation: u64,
}

impl<T> CacheState<T> {
    fn store(&mut self, records: Vec<T>, cached_at: Timestamp) {
        self.snapshot = Some(Snapshot { records, cached_at });
        self.stats.refreshes += 1;
        self.generation += 1;
        self.sync_entry_count();
    }

    fn sync_entry_count(&mut self) {
        self.stats.entry_count = self
            .snapshot
            .as_ref()
            .map(|s| s.records.len() as u64)
            .unwrap_or(0);
    }
}

/// Read-through cache over one record list.
///
/// Each instance is independent; nothing is shared between caches.
pub struct ReadThroughCache<T: CacheableEntity> {
    state: RwLock<CacheState<T>>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
}

impl<T: CacheableEntity> ReadThroughCache<T> {
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(CacheState {
                snapshot: None,
                stats: CacheStats::default(),
                generation: 0,
            }),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Best-effort freshness with the configured window.
    pub fn default_freshness(&self) -> Freshness {
        Freshness::best_effort(self.config.max_staleness)
    }

    /// Return the snapshot if it satisfies `freshness`.
    ///
    /// A snapshot is served only while strictly younger than the allowed
    /// staleness. `Consistent` never hits.
    pub async fn get(&self, freshness: &Freshness) -> Option<CacheRead<Vec<T>>> {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        let hit = match (freshness, state.snapshot.as_ref()) {
            (Freshness::BestEffort { max_staleness }, Some(snapshot))
                if staleness_between(snapshot.cached_at, now) < *max_staleness =>
            {
                Some(CacheRead::from_cache(
                    snapshot.records.clone(),
                    snapshot.cached_at,
                ))
            }
            _ => None,
        };

        if hit.is_some() {
            state.stats.hits += 1;
        } else {
            state.stats.misses += 1;
        }
        hit
    }

    /// Replace the snapshot. Returns the new snapshot time.
    pub async fn fill(&self, mut records: Vec<T>) -> Timestamp {
        self.config.cap(&mut records);
        let now = self.clock.now();
        self.state.write().await.store(records, now);
        now
    }

    /// Put a newly created entity at the head of the snapshot.
    ///
    /// Returns false (and caches nothing) when there is no snapshot to patch;
    /// the next read then fetches the full list.
    pub async fn prepend(&self, entity: T) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        state.generation += 1;
        let patched = match state.snapshot.as_mut() {
            Some(snapshot) => {
                snapshot.records.insert(0, entity);
                self.config.cap(&mut snapshot.records);
                snapshot.cached_at = now;
                true
            }
            None => false,
        };
        state.sync_entry_count();
        patched
    }

    /// Merge `patch` into the cached entity with `id`.
    ///
    /// Returns whether a cached entry was found.
    pub async fn patch(&self, id: &T::Id, patch: &T::Patch) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        state.generation += 1;
        match state.snapshot.as_mut() {
            Some(snapshot) => {
                snapshot.cached_at = now;
                match snapshot.records.iter_mut().find(|e| e.entity_id() == id) {
                    Some(entity) => {
                        entity.apply_patch(patch);
                        true
                    }
                    None => false,
                }
            }
            None => false,
        }
    }

    /// Drop the cached entity with `id`. Returns whether one was removed.
    pub async fn remove(&self, id: &T::Id) -> bool {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        state.generation += 1;
        let removed = match state.snapshot.as_mut() {
            Some(snapshot) => {
                snapshot.cached_at = now;
                let before = snapshot.records.len();
                snapshot.records.retain(|e| e.entity_id() != id);
                snapshot.records.len() != before
            }
            None => false,
        };
        state.sync_entry_count();
        removed
    }

    /// Forget the snapshot entirely.
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.snapshot = None;
        state.generation += 1;
        state.sync_entry_count();
    }

    /// The snapshot regardless of age, for degraded reads.
    pub async fn fallback(&self) -> (Vec<T>, Option<Timestamp>) {
        let state = self.state.read().await;
        match state.snapshot.as_ref() {
            Some(snapshot) => (snapshot.records.clone(), Some(snapshot.cached_at)),
            None => (Vec::new(), None),
        }
    }

    pub async fn stats(&self) -> CacheStats {
        self.state.read().await.stats.clone()
    }

    /// Serve from the snapshot, fetch on miss, fall back on failure.
    ///
    /// A failed fetch never surfaces as an error: the last snapshot (or an
    /// empty list) comes back tagged [`ListRead::Stale`].
    ///
    /// The fetch runs without holding the lock. If the snapshot is written
    /// while it is in flight, the fetched list may predate that write, so it
    /// is not stored: the patched snapshot is served instead, or the fetched
    /// list uncached when there is no snapshot.
    pub async fn read_through<F>(&self, freshness: &Freshness, fetcher: &F) -> ListRead<T>
    where
        F: SnapshotFetcher<T>,
    {
        if let Some(hit) = self.get(freshness).await {
            tracing::debug!(count = hit.value().len(), "Serving cached snapshot");
            return ListRead::Fresh(hit);
        }

        let started_at = self.state.read().await.generation;
        match fetcher.fetch().await {
            Ok(mut records) => {
                self.config.cap(&mut records);
                let now = self.clock.now();
                let mut state = self.state.write().await;
                if state.generation != started_at {
                    tracing::debug!("Snapshot written during fetch, keeping it");
                    return match state.snapshot.as_ref() {
                        Some(snapshot) => ListRead::Fresh(CacheRead::from_cache(
                            snapshot.records.clone(),
                            snapshot.cached_at,
                        )),
                        None => ListRead::Fresh(CacheRead::from_storage(records, now)),
                    };
                }
                state.store(records.clone(), now);
                ListRead::Fresh(CacheRead::from_storage(records, now))
            }
            Err(err) => {
                let reason = match err {
                    ChandaError::Storage(storage) => storage,
                    other => StorageError::FetchFailed {
                        reason: other.to_string(),
                    },
                };
                let (records, cached_at) = self.fallback().await;
                {
                    let mut state = self.state.write().await;
                    state.stats.fallbacks += 1;
                }
                tracing::warn!(
                    error = %reason,
                    fallback_count = records.len(),
                    has_snapshot = cached_at.is_some(),
                    "Fetch failed, serving fallback snapshot"
                );
                ListRead::Stale {
                    records,
                    cached_at,
                    reason,
                }
            }
        }
    }
}
