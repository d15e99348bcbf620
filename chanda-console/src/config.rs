//! Configuration loading for the Chanda console.
//!
//! All fields are required. No defaults.

use chanda_core::{ChandaResult, ConfigError, LedgerSettings, MediaSettings, StoreSettings};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "CHANDA_CONFIG";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    pub store: StoreSettings,
    pub ledger: LedgerSettings,
    pub media: MediaSettings,
    pub admin: AdminConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// The one admin account allowed to manage records.
#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    pub user_id: String,
    /// Lowercase hex SHA-256 of the password.
    pub password_sha256: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("user_id", &self.user_id)
            .field("password_sha256", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    pub json: bool,
}

impl ConsoleConfig {
    /// Load from `--config <path>` or `CHANDA_CONFIG`, then validate.
    pub fn load(args: &[String]) -> ChandaResult<Self> {
        let path = config_path_from_args(args)
            .or_else(config_path_from_env)
            .ok_or_else(|| ConfigError::MissingRequired {
                field: format!("config path (use --config or {})", CONFIG_ENV_VAR),
            })?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> ChandaResult<Self> {
        let load_error = |reason: String| ConfigError::Load {
            path: path.display().to_string(),
            reason,
        };
        let contents = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        let config: ConsoleConfig =
            toml::from_str(&contents).map_err(|e| load_error(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> ChandaResult<()> {
        self.store.validate()?;
        self.ledger.validate()?;
        self.media.validate()?;

        if self.admin.user_id.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "admin.user_id".to_string(),
            }
            .into());
        }
        let digest = &self.admin.password_sha256;
        if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigError::InvalidValue {
                field: "admin.password_sha256".to_string(),
                value: "[REDACTED]".to_string(),
                reason: "must be a 64 character hex SHA-256 digest".to_string(),
            }
            .into());
        }
        if self.session.path.as_os_str().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "session.path".to_string(),
            }
            .into());
        }
        if self.logging.filter.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "logging.filter".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from)
}

fn config_path_from_args(args: &[String]) -> Option<PathBuf> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            return iter.next().map(PathBuf::from);
        }
    }
    None
}

/// Arguments left after removing `--config <path>`.
pub fn strip_config_args(args: &[String]) -> Vec<String> {
    let mut rest = Vec::with_capacity(args.len());
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            iter.next();
        } else {
            rest.push(arg.clone());
        }
    }
    rest
}
