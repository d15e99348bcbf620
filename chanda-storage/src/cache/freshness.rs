//! Freshness contracts for cache reads.
//!
//! This module defines the staleness tolerance that callers specify when
//! reading, and the tagged result a list read returns.

use chanda_core::{StorageError, Timestamp};
use std::time::Duration;

/// Freshness requirement for cache reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Accept a cached snapshot younger than `max_staleness`.
    ///
    /// Older snapshots are refreshed from the store.
    BestEffort {
        /// Maximum acceptable staleness for cached data.
        max_staleness: Duration,
    },

    /// Always go to the store.
    ///
    /// The snapshot is still used as a fallback if the fetch fails.
    Consistent,
}

impl Freshness {
    /// Create a BestEffort freshness with the given max staleness.
    pub fn best_effort(max_staleness: Duration) -> Self {
        Self::BestEffort { max_staleness }
    }

    /// Create a Consistent freshness requirement.
    pub fn consistent() -> Self {
        Self::Consistent
    }

    pub fn is_consistent(&self) -> bool {
        matches!(self, Self::Consistent)
    }

    /// Get the max staleness for BestEffort, or zero for Consistent.
    pub fn max_staleness(&self) -> Duration {
        match self {
            Self::BestEffort { max_staleness } => *max_staleness,
            Self::Consistent => Duration::ZERO,
        }
    }
}

/// Result of a cache read, carrying staleness metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRead<T> {
    value: T,
    /// When this value was cached (or fetched from storage).
    cached_at: Timestamp,
    was_cache_hit: bool,
}

impl<T> CacheRead<T> {
    /// Create a new cache read from a cache hit.
    pub fn from_cache(value: T, cached_at: Timestamp) -> Self {
        Self {
            value,
            cached_at,
            was_cache_hit: true,
        }
    }

    /// Create a new cache read from a storage fetch (cache miss).
    pub fn from_storage(value: T, fetched_at: Timestamp) -> Self {
        Self {
            value,
            cached_at: fetched_at,
            was_cache_hit: false,
        }
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn cached_at(&self) -> Timestamp {
        self.cached_at
    }

    /// How old the data is as of `now`.
    pub fn staleness(&self, now: Timestamp) -> Duration {
        staleness_between(self.cached_at, now)
    }

    pub fn was_cache_hit(&self) -> bool {
        self.was_cache_hit
    }

    pub fn was_cache_miss(&self) -> bool {
        !self.was_cache_hit
    }

    /// Map the inner value to a new type.
    pub fn map<U, F>(self, f: F) -> CacheRead<U>
    where
        F: FnOnce(T) -> U,
    {
        CacheRead {
            value: f(self.value),
            cached_at: self.cached_at,
            was_cache_hit: self.was_cache_hit,
        }
    }
}

pub(crate) fn staleness_between(cached_at: Timestamp, now: Timestamp) -> Duration {
    (now - cached_at).to_std().unwrap_or(Duration::ZERO)
}

/// Outcome of a list read.
///
/// `Stale` means the store could not be reached and the records are the
/// last snapshot (possibly empty). Callers decide whether to warn.
#[derive(Debug, Clone, PartialEq)]
pub enum ListRead<T> {
    Fresh(CacheRead<Vec<T>>),
    Stale {
        records: Vec<T>,
        /// When the fallback snapshot was taken, if there was one.
        cached_at: Option<Timestamp>,
        reason: StorageError,
    },
}

impl<T> ListRead<T> {
    pub fn records(&self) -> &[T] {
        match self {
            Self::Fresh(read) => read.value(),
            Self::Stale { records, .. } => records,
        }
    }

    pub fn into_records(self) -> Vec<T> {
        match self {
            Self::Fresh(read) => read.into_value(),
            Self::Stale { records, .. } => records,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }

    pub fn is_stale(&self) -> bool {
        !self.is_fresh()
    }

    /// The fetch failure behind a stale read.
    pub fn failure(&self) -> Option<&StorageError> {
        match self {
            Self::Fresh(_) => None,
            Self::Stale { reason, .. } => Some(reason),
        }
    }

    pub fn was_cache_hit(&self) -> bool {
        matches!(self, Self::Fresh(read) if read.was_cache_hit())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_freshness_best_effort() {
        let freshness = Freshness::best_effort(Duration::from_secs(60));
        assert!(!freshness.is_consistent());
        assert_eq!(freshness.max_staleness(), Duration::from_secs(60));
    }

    #[test]
    fn test_freshness_consistent() {
        let freshness = Freshness::consistent();
        assert!(freshness.is_consistent());
        assert_eq!(freshness.max_staleness(), Duration::ZERO);
    }

    #[test]
    fn test_cache_read_staleness() {
        let now = Utc::now();
        let read = CacheRead::from_cache("test", now - chrono::Duration::seconds(5));
        assert_eq!(read.staleness(now), Duration::from_secs(5));
        assert!(read.was_cache_hit());
    }

    #[test]
    fn test_cache_read_from_future_is_not_stale() {
        let now = Utc::now();
        let read = CacheRead::from_storage(1, now + chrono::Duration::seconds(5));
        assert_eq!(read.staleness(now), Duration::ZERO);
        assert!(read.was_cache_miss());
    }

    #[test]
    fn test_cache_read_map() {
        let read = CacheRead::from_storage(42i32, Utc::now());
        let mapped = read.map(|v| v.to_string());
        assert_eq!(mapped.into_value(), "42");
    }

    #[test]
    fn test_list_read_accessors() {
        let fresh = ListRead::Fresh(CacheRead::from_cache(vec![1, 2], Utc::now()));
        assert!(fresh.is_fresh());
        assert!(fresh.was_cache_hit());
        assert_eq!(fresh.records(), &[1, 2]);
        assert!(fresh.failure().is_none());

        let stale: ListRead<i32> = ListRead::Stale {
            records: vec![],
            cached_at: None,
            reason: StorageError::FetchFailed {
                reason: "offline".to_string(),
            },
        };
        assert!(stale.is_stale());
        assert!(stale.is_empty());
        assert!(!stale.was_cache_hit());
        assert!(stale.failure().is_some());
    }
}
