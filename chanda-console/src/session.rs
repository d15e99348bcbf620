//! Admin authentication and the persisted session marker.

use async_trait::async_trait;
use chanda_core::{AuthError, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Checks admin credentials.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, user_id: &str, password: &str) -> Result<(), AuthError>;
}

/// Lowercase hex SHA-256 of `input`.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Accepts the single admin account from configuration.
pub struct ConfiguredAuthenticator {
    user_id: String,
    password_sha256: String,
}

impl ConfiguredAuthenticator {
    pub fn new(user_id: impl Into<String>, password_sha256: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            password_sha256: password_sha256.into().to_ascii_lowercase(),
        }
    }
}

#[async_trait]
impl Authenticator for ConfiguredAuthenticator {
    async fn authenticate(&self, user_id: &str, password: &str) -> Result<(), AuthError> {
        let digest_matches = sha256_hex(password) == self.password_sha256;
        if user_id == self.user_id && digest_matches {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

/// Proof of an admin login, kept on disk between console runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMarker {
    pub session_id: Uuid,
    pub user_id: String,
    pub started_at: Timestamp,
}

impl SessionMarker {
    pub fn new(user_id: impl Into<String>, started_at: Timestamp) -> Self {
        Self {
            session_id: Uuid::now_v7(),
            user_id: user_id.into(),
            started_at,
        }
    }
}

/// Reads and writes the session marker file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<SessionMarker>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(session_error)?;
        let marker = serde_json::from_str::<SessionMarker>(&contents).map_err(session_error)?;
        Ok(Some(marker))
    }

    pub fn save(&self, marker: &SessionMarker) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(session_error)?;
        }
        let contents = serde_json::to_string_pretty(marker).map_err(session_error)?;
        std::fs::write(&self.path, contents).map_err(session_error)?;
        Ok(())
    }

    /// Remove the marker. Missing markers are fine.
    pub fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(session_error(e)),
        }
    }
}

fn session_error(err: impl std::fmt::Display) -> AuthError {
    AuthError::Session {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanda_core::{Clock, ManualClock};

    #[test]
    fn test_sha256_hex_known_vector() {
        assert_eq!(
            sha256_hex("password"),
            "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8"
        );
    }

    #[tokio::test]
    async fn test_configured_authenticator() {
        let auth = ConfiguredAuthenticator::new(
            "admin",
            "5E884898DA28047151D0E56F8DC6292773603D0D6AABBDD62A11EF721D1542D8",
        );
        assert!(auth.authenticate("admin", "password").await.is_ok());
        assert_eq!(
            auth.authenticate("admin", "Password").await,
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            auth.authenticate("root", "password").await,
            Err(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn test_marker_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nested").join("session.json"));
        assert_eq!(store.load().unwrap(), None);

        let marker = SessionMarker::new("admin", ManualClock::event_day().now());
        store.save(&marker).unwrap();
        assert_eq!(store.load().unwrap(), Some(marker));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_marker_is_session_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = SessionStore::new(&path).load().unwrap_err();
        assert!(matches!(err, AuthError::Session { .. }));
    }

    #[test]
    fn test_session_ids_are_unique() {
        let now = ManualClock::event_day().now();
        assert_ne!(
            SessionMarker::new("admin", now).session_id,
            SessionMarker::new("admin", now).session_id
        );
    }
}
