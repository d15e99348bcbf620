//! Read cache with explicit freshness contracts.
//!
//! The ledger keeps one snapshot of the full record list. Callers state how
//! much staleness they tolerate via [`Freshness`], and every list read comes
//! back as a [`ListRead`] that says whether the data is fresh or a degraded
//! fallback after a failed fetch.
//!
//! # Example
//!
//! ```ignore
//! let read = cache
//!     .read_through(Freshness::best_effort(Duration::from_secs(120)), &fetcher)
//!     .await;
//!
//! if let ListRead::Stale { reason, .. } = &read {
//!     tracing::warn!(%reason, "Serving cached payments");
//! }
//! let records = read.into_records();
//! ```

pub mod freshness;
pub mod read_through;
pub mod traits;

pub use freshness::{CacheRead, Freshness, ListRead};
pub use read_through::{CacheConfig, ReadThroughCache, SnapshotFetcher};
pub use traits::{CacheStats, CacheableEntity};
