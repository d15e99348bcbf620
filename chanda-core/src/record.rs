//! Payment records, their wire shape, submission drafts and partial updates.

use crate::{Amount, PaymentId, Timestamp, ValidationError};
use chrono::{NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// RECORD
// ============================================================================

/// A stored payment contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: PaymentId,
    pub name: String,
    pub amount: Amount,
    pub branch: String,
    /// Data URI or URL of the payment proof. May be empty on read.
    pub screenshot: String,
    pub timestamp: Timestamp,
}

impl PaymentRecord {
    /// Normalize a store row into a record.
    ///
    /// `now` stamps rows that arrive without a usable `created_at`.
    pub fn from_row(row: PaymentRow, now: Timestamp) -> Self {
        let (amount, replaced) = Amount::normalize(&row.amount);
        if replaced {
            tracing::warn!(id = %row.id, raw = %row.amount, "Unreadable amount normalized to zero");
        }
        let timestamp = row
            .created_at
            .as_deref()
            .and_then(parse_store_timestamp)
            .unwrap_or(now);

        Self {
            id: row.id,
            name: row.name.unwrap_or_default(),
            amount,
            branch: row.branch.unwrap_or_default(),
            screenshot: row.screenshot_url.unwrap_or_default(),
            timestamp,
        }
    }

    /// Merge the fields present in `patch`; absent fields stay untouched.
    pub fn apply_patch(&mut self, patch: &PaymentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(branch) = &patch.branch {
            self.branch = branch.clone();
        }
        if let Some(screenshot) = &patch.screenshot {
            self.screenshot = screenshot.clone();
        }
    }
}

/// Parse a `created_at` value. Zone-less timestamps are taken as UTC.
fn parse_store_timestamp(raw: &str) -> Option<Timestamp> {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// ============================================================================
// WIRE ROW
// ============================================================================

/// A `payments` row exactly as the store returns it.
///
/// Nothing here is trusted: every column except `id` may be missing and
/// `amount` may be a number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRow {
    #[serde(deserialize_with = "deserialize_row_id")]
    pub id: PaymentId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: serde_json::Value,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub screenshot_url: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Integer(i64),
}

fn deserialize_row_id<'de, D>(deserializer: D) -> Result<PaymentId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => PaymentId::new(s),
        RawId::Integer(n) => PaymentId::new(n.to_string()),
    })
}

// ============================================================================
// SUBMISSION
// ============================================================================

/// Raw contribution form input, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub name: String,
    pub amount: String,
    pub branch: String,
    pub screenshot: String,
}

impl PaymentDraft {
    pub fn new(
        name: impl Into<String>,
        amount: impl Into<String>,
        branch: impl Into<String>,
        screenshot: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            amount: amount.into(),
            branch: branch.into(),
            screenshot: screenshot.into(),
        }
    }

    /// Check every field before anything is sent to the store.
    pub fn validate(&self) -> Result<NewPayment, ValidationError> {
        let name = required_text("name", &self.name)?;
        let amount = Amount::parse(&self.amount)?;
        let branch = required_text("branch", &self.branch)?;
        let screenshot = required_text("screenshot", &self.screenshot)?;
        Ok(NewPayment {
            name,
            amount,
            branch,
            screenshot,
        })
    }
}

/// A validated draft, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub name: String,
    pub amount: Amount,
    pub branch: String,
    pub screenshot: String,
}

fn required_text(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(trimmed.to_string())
}

// ============================================================================
// PARTIAL UPDATE
// ============================================================================

/// Partial update. Only `Some` fields are sent and applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentPatch {
    pub name: Option<String>,
    pub amount: Option<Amount>,
    pub branch: Option<String>,
    pub screenshot: Option<String>,
}

impl PaymentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_screenshot(mut self, screenshot: impl Into<String>) -> Self {
        self.screenshot = Some(screenshot.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.amount.is_none() && self.branch.is_none() && self.screenshot.is_none()
    }

    /// Apply the draft rules to every present field, returning a trimmed copy.
    pub fn validate(&self) -> Result<PaymentPatch, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        Ok(PaymentPatch {
            name: self.name.as_deref().map(|v| required_text("name", v)).transpose()?,
            amount: self.amount,
            branch: self.branch.as_deref().map(|v| required_text("branch", v)).transpose()?,
            screenshot: self
                .screenshot
                .as_deref()
                .map(|v| required_text("screenshot", v))
                .transpose()?,
        })
    }
}
