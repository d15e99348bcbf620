//! Chanda Storage - Store Trait, Cache and Record Access Layer
//!
//! Defines the seam to the hosted `payments` table ([`PaymentStore`]), an
//! in-memory [`MockStore`], the snapshot cache, and [`PaymentLedger`], which
//! mediates every read and write between callers and the store.
//! The HTTP implementation of the store lives in chanda-remote.

pub mod cache;
pub mod ledger;

pub use cache::{
    CacheConfig, CacheRead, CacheStats, CacheableEntity, Freshness, ListRead, ReadThroughCache,
    SnapshotFetcher,
};
pub use ledger::{PaymentLedger, SummaryRead};

use async_trait::async_trait;
use chanda_core::{
    BackendError, Clock, NewPayment, PaymentId, PaymentPatch, PaymentRow, SystemClock,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Remote store holding the `payments` table.
///
/// Implementations return rows as the store sent them; normalization is the
/// ledger's job. Unknown ids on update or delete are errors.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Newest rows first (`created_at` descending), at most `limit`.
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<PaymentRow>, BackendError>;

    /// Insert a payment and return the stored row with `id` and `created_at`.
    async fn insert(&self, payment: &NewPayment) -> Result<PaymentRow, BackendError>;

    /// Apply the present fields of `patch` to the row with `id`.
    async fn update(&self, id: &PaymentId, patch: &PaymentPatch) -> Result<(), BackendError>;

    /// Permanently remove the row with `id`.
    async fn delete(&self, id: &PaymentId) -> Result<(), BackendError>;
}

// ============================================================================
// MOCK STORE
// ============================================================================

/// Store operations, for call counting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Fetch,
    Insert,
    Update,
    Delete,
}

/// Number of calls the mock has received, per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub fetch: usize,
    pub insert: usize,
    pub update: usize,
    pub delete: usize,
}

impl StoreCalls {
    pub fn total(&self) -> usize {
        self.fetch + self.insert + self.update + self.delete
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    message: String,
    sticky: bool,
}

#[derive(Debug, Default)]
struct MockState {
    /// Rows in insertion order; reads return them newest first.
    rows: Vec<PaymentRow>,
    next_id: u64,
    calls: StoreCalls,
    failures: HashMap<StoreOp, InjectedFailure>,
}

impl MockState {
    fn record_call(&mut self, op: StoreOp) -> Result<(), BackendError> {
        match op {
            StoreOp::Fetch => self.calls.fetch += 1,
            StoreOp::Insert => self.calls.insert += 1,
            StoreOp::Update => self.calls.update += 1,
            StoreOp::Delete => self.calls.delete += 1,
        }
        match self.failures.get(&op).cloned() {
            Some(failure) => {
                if !failure.sticky {
                    self.failures.remove(&op);
                }
                Err(BackendError::with_status(503, failure.message))
            }
            None => Ok(()),
        }
    }

    fn position(&self, id: &PaymentId) -> Result<usize, BackendError> {
        self.rows
            .iter()
            .position(|row| &row.id == id)
            .ok_or_else(|| BackendError::with_status(404, format!("no payment with id {}", id)))
    }
}

/// In-memory payment store for tests and offline use.
///
/// Ids are `p1`, `p2`, ... and never reused. `created_at` comes from the
/// injected clock.
pub struct MockStore {
    state: Mutex<MockState>,
    clock: Arc<dyn Clock>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a raw row as if another client had written it.
    pub fn seed_row(&self, row: PaymentRow) {
        self.lock().rows.push(row);
    }

    /// Fail the next call of `op` with `message`.
    pub fn fail_next(&self, op: StoreOp, message: impl Into<String>) {
        self.lock().failures.insert(
            op,
            InjectedFailure {
                message: message.into(),
                sticky: false,
            },
        );
    }

    /// Fail every call of `op` until [`MockStore::heal`].
    pub fn fail_always(&self, op: StoreOp, message: impl Into<String>) {
        self.lock().failures.insert(
            op,
            InjectedFailure {
                message: message.into(),
                sticky: true,
            },
        );
    }

    pub fn heal(&self, op: StoreOp) {
        self.lock().failures.remove(&op);
    }

    pub fn calls(&self) -> StoreCalls {
        self.lock().calls
    }

    pub fn row_count(&self) -> usize {
        self.lock().rows.len()
    }

    pub fn row(&self, id: &PaymentId) -> Option<PaymentRow> {
        self.lock().rows.iter().find(|row| &row.id == id).cloned()
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentStore for MockStore {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<PaymentRow>, BackendError> {
        let mut state = self.lock();
        state.record_call(StoreOp::Fetch)?;
        Ok(state.rows.iter().rev().take(limit).cloned().collect())
    }

    async fn insert(&self, payment: &NewPayment) -> Result<PaymentRow, BackendError> {
        let now = self.clock.now();
        let mut state = self.lock();
        state.record_call(StoreOp::Insert)?;
        state.next_id += 1;
        let row = PaymentRow {
            id: PaymentId::new(format!("p{}", state.next_id)),
            name: Some(payment.name.clone()),
            amount: serde_json::json!(payment.amount.value()),
            branch: Some(payment.branch.clone()),
            screenshot_url: Some(payment.screenshot.clone()),
            created_at: Some(now.to_rfc3339()),
        };
        state.rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, id: &PaymentId, patch: &PaymentPatch) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.record_call(StoreOp::Update)?;
        let index = state.position(id)?;
        let row = &mut state.rows[index];
        if let Some(name) = &patch.name {
            row.name = Some(name.clone());
        }
        if let Some(amount) = patch.amount {
            row.amount = serde_json::json!(amount.value());
        }
        if let Some(branch) = &patch.branch {
            row.branch = Some(branch.clone());
        }
        if let Some(screenshot) = &patch.screenshot {
            row.screenshot_url = Some(screenshot.clone());
        }
        Ok(())
    }

    async fn delete(&self, id: &PaymentId) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.record_call(StoreOp::Delete)?;
        let index = state.position(id)?;
        state.rows.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanda_core::{Amount, ManualClock, PaymentDraft};
    use proptest::prelude::*;

    fn new_payment(name: &str) -> NewPayment {
        PaymentDraft::new(name, "501", "CS", "data:image/jpeg;base64,AAAA")
            .validate()
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids_and_clock_time() {
        let clock = ManualClock::event_day();
        let store = MockStore::with_clock(Arc::new(clock.clone()));

        let a = store.insert(&new_payment("Asha")).await.unwrap();
        let b = store.insert(&new_payment("Ravi")).await.unwrap();

        assert_eq!(a.id, PaymentId::new("p1"));
        assert_eq!(b.id, PaymentId::new("p2"));
        assert_eq!(a.created_at, Some(clock.now().to_rfc3339()));
    }

    #[tokio::test]
    async fn test_fetch_is_newest_first_and_limited() {
        let store = MockStore::new();
        for name in ["a", "b", "c"] {
            store.insert(&new_payment(name)).await.unwrap();
        }

        let rows = store.fetch_recent(2).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["p3", "p2"]);
    }

    #[tokio::test]
    async fn test_ids_never_reused_after_delete() {
        let store = MockStore::new();
        let a = store.insert(&new_payment("a")).await.unwrap();
        store.delete(&a.id).await.unwrap();
        let b = store.insert(&new_payment("b")).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_unknown_id_is_an_error() {
        let store = MockStore::new();
        let missing = PaymentId::new("p404");

        let err = store
            .update(&missing, &PaymentPatch::new().with_branch("ECE"))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(404));
        assert!(err.message.contains("p404"));

        assert!(store.delete(&missing).await.is_err());
    }

    #[tokio::test]
    async fn test_update_touches_only_present_fields() {
        let store = MockStore::new();
        let row = store.insert(&new_payment("Asha")).await.unwrap();

        store
            .update(&row.id, &PaymentPatch::new().with_amount(Amount::new(1100.0).unwrap()))
            .await
            .unwrap();

        let stored = store.row(&row.id).unwrap();
        assert_eq!(stored.amount, serde_json::json!(1100.0));
        assert_eq!(stored.name.as_deref(), Some("Asha"));
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot_and_counted() {
        let store = MockStore::new();
        store.fail_next(StoreOp::Fetch, "network down");

        let err = store.fetch_recent(10).await.unwrap_err();
        assert_eq!(err.message, "network down");
        assert!(store.fetch_recent(10).await.is_ok());
        assert_eq!(store.calls().fetch, 2);
    }

    #[tokio::test]
    async fn test_fail_always_until_heal() {
        let store = MockStore::new();
        store.fail_always(StoreOp::Insert, "read only");

        assert!(store.insert(&new_payment("a")).await.is_err());
        assert!(store.insert(&new_payment("b")).await.is_err());
        store.heal(StoreOp::Insert);
        assert!(store.insert(&new_payment("c")).await.is_ok());
        assert_eq!(store.row_count(), 1);
        assert_eq!(store.calls().total(), 3);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Fetch never returns more rows than asked for.
        #[test]
        fn prop_fetch_respects_limit(rows in 0usize..20, limit in 0usize..25) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let store = MockStore::new();
                for i in 0..rows {
                    store.insert(&new_payment(&format!("c{}", i))).await.unwrap();
                }
                let fetched = store.fetch_recent(limit).await.unwrap();
                assert_eq!(fetched.len(), rows.min(limit));
            });
        }
    }
}
