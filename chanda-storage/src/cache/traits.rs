//! Cacheable entity trait and cache statistics.

use chanda_core::{PaymentId, PaymentPatch, PaymentRecord};
use std::fmt;

/// Entities that can live in a list snapshot.
///
/// The cache needs to find an entry by id and merge a partial update into
/// it in place; everything else about the entity is opaque.
pub trait CacheableEntity: Clone + Send + Sync + 'static {
    type Id: PartialEq + fmt::Display + Send + Sync;
    type Patch: Send + Sync;

    fn entity_id(&self) -> &Self::Id;

    fn apply_patch(&mut self, patch: &Self::Patch);
}

impl CacheableEntity for PaymentRecord {
    type Id = PaymentId;
    type Patch = PaymentPatch;

    fn entity_id(&self) -> &PaymentId {
        &self.id
    }

    fn apply_patch(&mut self, patch: &PaymentPatch) {
        PaymentRecord::apply_patch(self, patch)
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Reads answered from the snapshot.
    pub hits: u64,
    /// Reads that went to the store.
    pub misses: u64,
    /// Failed fetches answered with the old snapshot (or nothing).
    pub fallbacks: u64,
    /// Successful fetches that replaced the snapshot.
    pub refreshes: u64,
    /// Number of records currently cached.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
