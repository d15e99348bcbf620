//! Error types for Chanda operations

use crate::PaymentId;
use thiserror::Error;

/// Raw fault reported by a payment store.
///
/// Stores return this untyped; the ledger classifies it into the
/// [`StorageError`] variant of the operation that failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    /// HTTP status (or equivalent) when the store exposes one.
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Fetch payments failed: {reason}")]
    FetchFailed { reason: String },

    #[error("Add payment failed: {reason}")]
    WriteFailed { reason: String },

    #[error("Update failed for payment {id}: {reason}")]
    UpdateFailed { id: PaymentId, reason: String },

    #[error("Delete failed for payment {id}: {reason}")]
    DeleteFailed { id: PaymentId, reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Update contains no fields")]
    EmptyPatch,
}

impl ValidationError {
    pub fn missing(field: &str) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Image pre-processing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("File read failed for {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Image decode failed: {reason}")]
    DecodeFailed { reason: String },

    #[error("Image encode failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Invalid media settings: {reason}")]
    InvalidSettings { reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration from {path}: {reason}")]
    Load { path: String, reason: String },
}

/// Admin authentication errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid user id or password")]
    InvalidCredentials,

    #[error("Admin login required")]
    NotLoggedIn,

    #[error("Session marker error: {reason}")]
    Session { reason: String },
}

/// Master error type for all Chanda errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChandaError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ChandaError {
    /// Returns true if the failure was caught before any store round-trip.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias for Chanda operations.
pub type ChandaResult<T> = Result<T, ChandaError>;

// =============================================================================
// TESTS
// =============================================================================
