//! Credentials file written by an external login tool.
//!
//! The file holds a serialized [`CredentialSnapshot`]. This crate never runs
//! the login flow itself: renewal means reading the file again, so a
//! separately running login tool can replace it while a query is retrying.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::core::auth::{Authenticator, CredentialSnapshot};
use crate::error::{FortumError, Result};

/// [`Authenticator`] backed by a JSON credentials file.
pub struct FileCredentialStore {
    path: PathBuf,
    state: RwLock<CredentialSnapshot>,
    renewal: Mutex<()>,
}

impl FileCredentialStore {
    /// Load credentials from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FortumError::MissingCredentials`] if the file does not
    /// exist, or a configuration error if it is not a credentials document.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(missing(path));
        }
        let content = std::fs::read_to_string(path)?;
        let snapshot = parse(path, &content)?;
        tracing::debug!(
            path = %path.display(),
            mode = snapshot.auth_mode().label(),
            expires_at = ?snapshot.expires_at,
            "Loaded credentials"
        );
        Ok(Self::from_snapshot(path, snapshot))
    }

    /// Store seeded with `snapshot`; renewals read `path`.
    #[must_use]
    pub fn from_snapshot(path: &Path, snapshot: CredentialSnapshot) -> Self {
        Self {
            path: path.to_path_buf(),
            state: RwLock::new(snapshot),
            renewal: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and install it if the credentials are usable.
    async fn reload(&self, action: &'static str) -> Result<()> {
        let _guard = self.renewal.lock().await;

        if !self.path.exists() {
            return Err(missing(&self.path));
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        let snapshot = parse(&self.path, &content)?;

        if snapshot.expires_at.is_none() {
            tracing::warn!(path = %self.path.display(), action, "Credentials on disk have no expiry");
            return Err(FortumError::AuthFailed {
                reason: format!(
                    "credentials file {} has no expires_at, log in again",
                    self.path.display()
                ),
                source: None,
            });
        }
        if snapshot.expires_within(Duration::ZERO, Utc::now()) {
            tracing::warn!(path = %self.path.display(), action, "Credentials on disk are expired");
            return Err(FortumError::AuthFailed {
                reason: format!(
                    "credentials in {} are expired, log in again",
                    self.path.display()
                ),
                source: None,
            });
        }

        tracing::debug!(path = %self.path.display(), action, "Reloaded credentials");
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        Ok(())
    }
}

#[async_trait]
impl Authenticator for FileCredentialStore {
    fn snapshot(&self) -> CredentialSnapshot {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn refresh_access_token(&self) -> Result<()> {
        self.reload("refresh").await
    }

    async fn authenticate(&self) -> Result<()> {
        self.reload("authenticate").await
    }
}

fn missing(path: &Path) -> FortumError {
    FortumError::MissingCredentials(format!("no credentials file at {}", path.display()))
}

fn parse(path: &Path, content: &str) -> Result<CredentialSnapshot> {
    serde_json::from_str(content).map_err(|e| {
        FortumError::Config(format!(
            "Invalid credentials file {}: {e}",
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::AuthMode;
    use crate::error::ErrorKind;
    use crate::test_utils::{TestDir, make_test_credentials_json};
    use chrono::TimeDelta;

    #[test]
    fn load_reads_session_credentials() {
        let dir = TestDir::new();
        dir.create_file("creds.json", &make_test_credentials_json(TimeDelta::hours(1)));

        let store = FileCredentialStore::load(&dir.file_path("creds.json")).unwrap();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.auth_mode(), AuthMode::SessionCookie);
        assert_eq!(snapshot.session_cookies.len(), 2);
        assert!(!store.needs_renewal());
    }

    #[test]
    fn load_missing_file() {
        let dir = TestDir::new();
        let err = FileCredentialStore::load(&dir.file_path("absent.json"))
            .err()
            .unwrap();
        assert!(matches!(err, FortumError::MissingCredentials(_)));
        assert_eq!(err.kind(), ErrorKind::FatalAuth);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = TestDir::new();
        dir.create_file("creds.json", "not json");
        let err = FileCredentialStore::load(&dir.file_path("creds.json"))
            .err()
            .unwrap();
        assert!(matches!(err, FortumError::Config(_)));
    }

    #[tokio::test]
    async fn authenticate_picks_up_new_file() {
        let dir = TestDir::new();
        dir.create_file("creds.json", &make_test_credentials_json(TimeDelta::minutes(-5)));
        let store = FileCredentialStore::load(&dir.file_path("creds.json")).unwrap();
        assert!(store.is_token_expired());

        dir.create_file("creds.json", &make_test_credentials_json(TimeDelta::hours(2)));
        store.authenticate().await.unwrap();
        assert!(!store.is_token_expired());
    }

    #[tokio::test]
    async fn refresh_fails_when_file_still_expired() {
        let dir = TestDir::new();
        dir.create_file("creds.json", &make_test_credentials_json(TimeDelta::minutes(-5)));
        let store = FileCredentialStore::load(&dir.file_path("creds.json")).unwrap();

        let err = store.refresh_access_token().await.unwrap_err();
        assert!(matches!(err, FortumError::AuthFailed { .. }));
        assert!(err.to_string().contains("log in again"));
        assert!(store.is_token_expired());
    }

    #[tokio::test]
    async fn missing_expiry_is_reported_as_such() {
        let dir = TestDir::new();
        dir.create_file(
            "creds.json",
            r#"{"access_token":"at","refresh_token":"rt","session_cookies":{}}"#,
        );
        let store = FileCredentialStore::load(&dir.file_path("creds.json")).unwrap();
        assert!(store.is_token_expired());

        let err = store.authenticate().await.unwrap_err();
        assert!(matches!(err, FortumError::AuthFailed { .. }));
        let message = err.to_string();
        assert!(message.contains("has no expires_at"), "{message}");
        assert!(!message.contains("are expired"));
    }

    #[tokio::test]
    async fn authenticate_after_file_removed() {
        let dir = TestDir::new();
        dir.create_file("creds.json", &make_test_credentials_json(TimeDelta::hours(1)));
        let store = FileCredentialStore::load(&dir.file_path("creds.json")).unwrap();

        std::fs::remove_file(dir.file_path("creds.json")).unwrap();
        assert!(matches!(
            store.authenticate().await,
            Err(FortumError::MissingCredentials(_))
        ));
        assert!(!store.is_token_expired());
    }
}
