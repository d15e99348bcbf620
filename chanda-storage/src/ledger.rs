//! Payment ledger: the record access layer.
//!
//! Every read and write of payment records goes through a [`PaymentLedger`].
//! Reads are served from a short-lived snapshot; writes go to the store and
//! then patch the snapshot from the store's answer.
//!
//! - Validation happens before any store call.
//! - Read failures degrade to the last snapshot (or nothing), tagged stale.
//! - Write, update and delete failures propagate with the store's message.
//!   Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chanda_core::{
    ChandaResult, Clock, CollectionSummary, LedgerSettings, PaymentDraft, PaymentId,
    PaymentPatch, PaymentRecord, StorageError, SystemClock,
};

use crate::cache::{
    CacheConfig, CacheStats, Freshness, ListRead, ReadThroughCache, SnapshotFetcher,
};
use crate::PaymentStore;

/// Collection summary plus whether it was computed from stale data.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRead {
    pub summary: CollectionSummary,
    pub is_stale: bool,
}

/// Record access layer over a [`PaymentStore`].
///
/// Owns its cache; two ledgers over the same store never share snapshots.
pub struct PaymentLedger<S: PaymentStore + ?Sized> {
    store: Arc<S>,
    cache: ReadThroughCache<PaymentRecord>,
    settings: LedgerSettings,
    clock: Arc<dyn Clock>,
}

/// Fetches the newest rows and normalizes them into records.
struct RecentPayments<'a, S: PaymentStore + ?Sized> {
    store: &'a S,
    limit: usize,
    clock: &'a dyn Clock,
}

#[async_trait]
impl<'a, S: PaymentStore + ?Sized> SnapshotFetcher<PaymentRecord> for RecentPayments<'a, S> {
    async fn fetch(&self) -> ChandaResult<Vec<PaymentRecord>> {
        let started = Instant::now();
        let rows = self
            .store
            .fetch_recent(self.limit)
            .await
            .map_err(|e| StorageError::FetchFailed { reason: e.message })?;

        let now = self.clock.now();
        let mut records: Vec<PaymentRecord> = rows
            .into_iter()
            .map(|row| PaymentRecord::from_row(row, now))
            .collect();
        // Stable, so equal timestamps keep the store's order.
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(self.limit);

        tracing::info!(
            count = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded payments"
        );
        Ok(records)
    }
}

impl<S: PaymentStore + ?Sized> PaymentLedger<S> {
    /// Create a ledger using the system clock.
    pub fn new(store: Arc<S>, settings: LedgerSettings) -> Self {
        Self::with_clock(store, settings, Arc::new(SystemClock))
    }

    /// Create a ledger reading time from `clock`.
    pub fn with_clock(store: Arc<S>, settings: LedgerSettings, clock: Arc<dyn Clock>) -> Self {
        let cache = ReadThroughCache::new(
            CacheConfig::new()
                .with_max_staleness(settings.freshness_window())
                .with_max_entries(settings.row_limit),
            Arc::clone(&clock),
        );
        Self {
            store,
            cache,
            settings,
            clock,
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // READS
    // ========================================================================

    /// All records, newest first, capped at the row limit.
    ///
    /// Served from the snapshot while it is younger than the freshness
    /// window. Never fails: a store error yields [`ListRead::Stale`].
    pub async fn list(&self) -> ListRead<PaymentRecord> {
        self.list_with(self.cache.default_freshness()).await
    }

    /// List with an explicit freshness requirement.
    pub async fn list_with(&self, freshness: Freshness) -> ListRead<PaymentRecord> {
        let fetcher = RecentPayments {
            store: self.store.as_ref(),
            limit: self.settings.row_limit,
            clock: self.clock.as_ref(),
        };
        self.cache.read_through(&freshness, &fetcher).await
    }

    /// Bypass the snapshot and fetch.
    pub async fn refresh(&self) -> ListRead<PaymentRecord> {
        self.list_with(Freshness::Consistent).await
    }

    /// Contributor count and totals over the current list.
    pub async fn summary(&self) -> SummaryRead {
        let read = self.list().await;
        SummaryRead {
            summary: CollectionSummary::from_records(read.records()),
            is_stale: read.is_stale(),
        }
    }

    // ========================================================================
    // WRITES
    // ========================================================================

    /// Validate and store a new contribution.
    ///
    /// The stored record (with store-assigned id and timestamp) is put at
    /// the head of the snapshot.
    pub async fn create(&self, draft: &PaymentDraft) -> ChandaResult<PaymentRecord> {
        let payment = draft.validate()?;

        let row = self.store.insert(&payment).await.map_err(|e| {
            tracing::error!(error = %e, status = ?e.status, "Add payment failed");
            StorageError::WriteFailed { reason: e.message }
        })?;

        let record = PaymentRecord::from_row(row, self.clock.now());
        let cached = self.cache.prepend(record.clone()).await;
        tracing::info!(id = %record.id, amount = %record.amount, cached, "Payment added");
        Ok(record)
    }

    /// Apply a partial update to the record with `id`.
    pub async fn update(&self, id: &PaymentId, patch: &PaymentPatch) -> ChandaResult<bool> {
        let patch = patch.validate()?;

        self.store.update(id, &patch).await.map_err(|e| {
            tracing::error!(id = %id, error = %e, "Update failed");
            StorageError::UpdateFailed {
                id: id.clone(),
                reason: e.message,
            }
        })?;

        let cached = self.cache.patch(id, &patch).await;
        tracing::info!(id = %id, cached, "Payment updated");
        Ok(true)
    }

    /// Permanently delete the record with `id`.
    pub async fn delete(&self, id: &PaymentId) -> ChandaResult<bool> {
        self.store.delete(id).await.map_err(|e| {
            tracing::error!(id = %id, error = %e, "Delete failed");
            StorageError::DeleteFailed {
                id: id.clone(),
                reason: e.message,
            }
        })?;

        let cached = self.cache.remove(id).await;
        tracing::info!(id = %id, cached, "Payment deleted");
        Ok(true)
    }

    // ========================================================================
    // CACHE CONTROL
    // ========================================================================

    /// Drop the snapshot; the next list goes to the store.
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        tracing::info!("Payment cache cleared");
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
