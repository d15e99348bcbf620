//! Chanda Core - Entity Types
//!
//! Payment contribution records, their wire shape, validation and the error
//! taxonomy. All other crates depend on this. No IO lives here.

pub mod amount;
pub mod clock;
pub mod config;
pub mod error;
pub mod record;
pub mod summary;

pub use amount::Amount;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{LedgerSettings, MediaSettings, StoreSettings};
pub use error::{
    AuthError, BackendError, ChandaError, ChandaResult, ConfigError, MediaError, StorageError,
    ValidationError,
};
pub use record::{NewPayment, PaymentDraft, PaymentPatch, PaymentRecord, PaymentRow};
pub use summary::{BranchTotal, CollectionSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Columns selected back from the `payments` table on every read and insert.
pub const PAYMENT_COLUMNS: &str = "id,name,amount,branch,screenshot_url,created_at";

/// Opaque payment identifier assigned by the store.
///
/// Stores may hand out integers or UUIDs; both are carried in their textual
/// form and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(String);

impl PaymentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PaymentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PaymentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_id_display_and_eq() {
        let id = PaymentId::new("p1");
        assert_eq!(id.to_string(), "p1");
        assert_eq!(id, PaymentId::from("p1"));
        assert_eq!(id.as_str(), "p1");
    }

    #[test]
    fn test_payment_id_serializes_as_plain_string() {
        let id = PaymentId::new("42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
    }

    #[test]
    fn test_payment_columns_match_table_shape() {
        let columns: Vec<&str> = PAYMENT_COLUMNS.split(',').collect();
        assert_eq!(
            columns,
            vec!["id", "name", "amount", "branch", "screenshot_url", "created_at"]
        );
    }
}
