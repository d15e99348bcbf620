//! Configuration types

use crate::{ChandaResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Row cap applied to every list read.
pub const DEFAULT_ROW_LIMIT: usize = 1000;

/// How long a fetched record list is served without a store round-trip.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 120;

pub const DEFAULT_MAX_WIDTH: u32 = 800;

pub const DEFAULT_JPEG_QUALITY: u8 = 60;

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Record access layer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerSettings {
    pub row_limit: usize,
    pub freshness_window_secs: u64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            row_limit: DEFAULT_ROW_LIMIT,
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
        }
    }
}

impl LedgerSettings {
    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn validate(&self) -> ChandaResult<()> {
        if self.row_limit == 0 {
            return Err(invalid("ledger.row_limit", self.row_limit, "must be > 0").into());
        }
        if self.freshness_window_secs == 0 {
            return Err(invalid(
                "ledger.freshness_window_secs",
                self.freshness_window_secs,
                "must be > 0",
            )
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// MEDIA
// ============================================================================

/// Screenshot compression settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaSettings {
    pub max_width: u32,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl MediaSettings {
    pub fn validate(&self) -> ChandaResult<()> {
        if self.max_width == 0 {
            return Err(invalid("media.max_width", self.max_width, "must be > 0").into());
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(invalid(
                "media.jpeg_quality",
                self.jpeg_quality,
                "must be between 1 and 100",
            )
            .into());
        }
        Ok(())
    }
}

// ============================================================================
// REMOTE STORE
// ============================================================================

/// Connection settings for the hosted `payments` table.
/// All fields are required.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreSettings {
    pub base_url: String,
    pub api_key: String,
    pub table: String,
    pub request_timeout_ms: u64,
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("table", &self.table)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl StoreSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> ChandaResult<()> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "store.base_url".to_string(),
            }
            .into());
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(invalid("store.base_url", base_url, "must be an http(s) URL").into());
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "store.api_key".to_string(),
            }
            .into());
        }
        let table_ok = !self.table.is_empty()
            && self
                .table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !table_ok {
            return Err(invalid(
                "store.table",
                &self.table,
                "must be a plain identifier",
            )
            .into());
        }
        if self.request_timeout_ms == 0 {
            return Err(invalid(
                "store.request_timeout_ms",
                self.request_timeout_ms,
                "must be > 0",
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChandaError;

    fn store() -> StoreSettings {
        StoreSettings {
            base_url: "https://example.supabase.co".to_string(),
            api_key: "anon-key".to_string(),
            table: "payments".to_string(),
            request_timeout_ms: 10_000,
        }
    }

    #[test]
    fn test_ledger_defaults() {
        let settings = LedgerSettings::default();
        assert_eq!(settings.row_limit, 1000);
        assert_eq!(settings.freshness_window(), Duration::from_secs(120));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_ledger_rejects_zero_limit() {
        let settings = LedgerSettings {
            row_limit: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ChandaError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_media_quality_bounds() {
        assert!(MediaSettings::default().validate().is_ok());
        let bad = MediaSettings {
            jpeg_quality: 0,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
        let bad = MediaSettings {
            jpeg_quality: 101,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_store_settings_validation() {
        assert!(store().validate().is_ok());

        let mut s = store();
        s.base_url = "example.supabase.co".into();
        assert!(s.validate().is_err());

        let mut s = store();
        s.api_key = " ".into();
        assert!(matches!(
            s.validate(),
            Err(ChandaError::Config(ConfigError::MissingRequired { .. }))
        ));

        let mut s = store();
        s.table = "payments; drop".into();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_store_settings_debug_hides_key() {
        let rendered = format!("{:?}", store());
        assert!(!rendered.contains("anon-key"));
        assert!(rendered.contains("REDACTED"));
    }
}
