//! Chanda Test Utilities
//!
//! Shared test infrastructure for the Chanda workspace:
//! - Proptest generators for drafts, patches and store rows
//! - Fixtures for the common ledger scenarios
//! - Assertions over `ChandaResult`

// Re-export the mock store from its source crate
pub use chanda_storage::{MockStore, PaymentLedger, PaymentStore, StoreCalls, StoreOp};

// Re-export core types for convenience
pub use chanda_core::{
    Amount, ChandaError, ChandaResult, Clock, LedgerSettings, ManualClock, PaymentDraft,
    PaymentId, PaymentPatch, PaymentRecord, PaymentRow, StorageError, Timestamp,
    ValidationError,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for payment inputs.

    use super::*;
    use proptest::prelude::*;

    /// Generate a contributor name with no surrounding whitespace.
    pub fn arb_name() -> impl Strategy<Value = String> {
        "[A-Z][a-z]{1,11}( [A-Z][a-z]{1,9})?"
    }

    /// Generate a department code.
    pub fn arb_branch() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("CS".to_string()),
            Just("ECE".to_string()),
            Just("EEE".to_string()),
            Just("ME".to_string()),
            Just("CIVIL".to_string()),
            "[A-Z]{2,5}",
        ]
    }

    /// Generate a valid amount in whole rupees.
    pub fn arb_amount() -> impl Strategy<Value = Amount> {
        (0u32..100_000).prop_map(|rupees| Amount::new(rupees as f64).unwrap_or(Amount::ZERO))
    }

    /// Generate amount text as a contributor would type it.
    pub fn arb_amount_text() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u32..100_000).prop_map(|v| v.to_string()),
            (0u32..100_000, 0u32..100).prop_map(|(r, p)| format!("{}.{:02}", r, p)),
            (1u32..10_000).prop_map(|v| format!("  {} ", v)),
        ]
    }

    /// Generate text that does not parse as an amount.
    pub fn arb_bad_amount_text() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("".to_string()),
            Just("   ".to_string()),
            Just("-5".to_string()),
            "[a-z]{1,8}",
            Just("12abc".to_string()),
        ]
    }

    /// Generate a screenshot reference.
    pub fn arb_screenshot() -> impl Strategy<Value = String> {
        prop_oneof![
            "[A-Za-z0-9+/]{4,40}".prop_map(|b64| format!("data:image/jpeg;base64,{}", b64)),
            "[a-z]{3,10}".prop_map(|name| format!("https://files.example.org/{}.jpg", name)),
        ]
    }

    /// Generate a draft that passes validation.
    pub fn arb_draft() -> impl Strategy<Value = PaymentDraft> {
        (arb_name(), arb_amount_text(), arb_branch(), arb_screenshot())
            .prop_map(|(name, amount, branch, screenshot)| {
                PaymentDraft::new(name, amount, branch, screenshot)
            })
    }

    /// Generate a non-empty patch whose present fields are valid.
    pub fn arb_patch() -> impl Strategy<Value = PaymentPatch> {
        (
            proptest::option::of(arb_name()),
            proptest::option::of(arb_amount()),
            proptest::option::of(arb_branch()),
            proptest::option::of(arb_screenshot()),
        )
            .prop_map(|(name, amount, branch, screenshot)| PaymentPatch {
                name,
                amount,
                branch,
                screenshot,
            })
            .prop_filter("patch must carry at least one field", |patch| !patch.is_empty())
    }

    /// Generate the raw `amount` JSON a store might send back.
    pub fn arb_raw_amount() -> impl Strategy<Value = serde_json::Value> {
        prop_oneof![
            (0u32..100_000).prop_map(|v| serde_json::json!(v)),
            (0u32..100_000).prop_map(|v| serde_json::json!(v.to_string())),
            Just(serde_json::Value::Null),
            Just(serde_json::json!("n/a")),
            Just(serde_json::json!(-10)),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built fixtures for common ledger scenarios.

    use super::*;
    use std::sync::Arc;

    /// A tiny but well-formed JPEG data URI.
    pub const SAMPLE_SCREENSHOT: &str = "data:image/jpeg;base64,/9j/4AAQSkZJRgABAQAAAQABAAD/2Q==";

    /// The first contribution of the event.
    pub fn asha_draft() -> PaymentDraft {
        PaymentDraft::new("Asha", "501", "CS", SAMPLE_SCREENSHOT)
    }

    pub fn ravi_draft() -> PaymentDraft {
        PaymentDraft::new("Ravi", "1100", "ECE", SAMPLE_SCREENSHOT)
    }

    /// Ledger over a fresh mock store, both driven by a manual clock.
    pub fn manual_ledger() -> (PaymentLedger<MockStore>, Arc<MockStore>, ManualClock) {
        manual_ledger_with(LedgerSettings::default())
    }

    pub fn manual_ledger_with(
        settings: LedgerSettings,
    ) -> (PaymentLedger<MockStore>, Arc<MockStore>, ManualClock) {
        let clock = ManualClock::event_day();
        let store = Arc::new(MockStore::with_clock(Arc::new(clock.clone())));
        let ledger = PaymentLedger::with_clock(Arc::clone(&store), settings, Arc::new(clock.clone()));
        (ledger, store, clock)
    }

    /// A raw store row as another client might have written it.
    pub fn legacy_row(id: &str, amount: serde_json::Value, created_at: Option<&str>) -> PaymentRow {
        PaymentRow {
            id: PaymentId::new(id),
            name: Some(format!("Contributor {}", id)),
            amount,
            branch: Some("CS".to_string()),
            screenshot_url: None,
            created_at: created_at.map(str::to_string),
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for Chanda-specific results.

    use super::*;

    /// Assert that a ChandaResult is Ok.
    #[track_caller]
    pub fn assert_ok<T: std::fmt::Debug>(result: &ChandaResult<T>) {
        assert!(result.is_ok(), "Expected Ok, got Err: {:?}", result);
    }

    /// Assert that a ChandaResult is a Validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &ChandaResult<T>) {
        match result {
            Err(ChandaError::Validation(_)) => {}
            other => panic!("Expected Validation error, got: {:?}", other),
        }
    }

    /// Assert that a ChandaResult is a write failure carrying `reason`.
    #[track_caller]
    pub fn assert_write_failed<T: std::fmt::Debug>(result: &ChandaResult<T>, reason: &str) {
        match result {
            Err(ChandaError::Storage(StorageError::WriteFailed { reason: r })) => {
                assert_eq!(r, reason, "Wrong write failure reason");
            }
            other => panic!("Expected WriteFailed({}), got: {:?}", reason, other),
        }
    }

    /// Assert that records are ordered newest first.
    #[track_caller]
    pub fn assert_newest_first(records: &[PaymentRecord]) {
        for pair in records.windows(2) {
            assert!(
                pair[0].timestamp >= pair[1].timestamp,
                "Records out of order: {} ({}) before {} ({})",
                pair[0].id,
                pair[0].timestamp,
                pair[1].id,
                pair[1].timestamp
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_generated_drafts_validate(draft in arb_draft()) {
            prop_assert!(draft.validate().is_ok());
        }

        #[test]
        fn prop_bad_amount_text_rejected(text in arb_bad_amount_text()) {
            let draft = PaymentDraft::new("Asha", text, "CS", fixtures::SAMPLE_SCREENSHOT);
            prop_assert!(draft.validate().is_err());
        }

        #[test]
        fn prop_generated_patches_validate(patch in arb_patch()) {
            prop_assert!(patch.validate().is_ok());
        }
    }

    #[test]
    fn test_fixture_ledger_starts_empty() {
        let (_ledger, store, clock) = fixtures::manual_ledger();
        assert_eq!(store.row_count(), 0);
        assert_eq!(clock.now(), ManualClock::event_day().now());
    }
}
