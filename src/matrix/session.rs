//! Matrix session persistence.
//!
//! The bot keeps two things under its data directory so restarts do not
//! require a fresh login:
//!
//! - `session`: a JSON file holding the authenticated session and the last
//!   sync token
//! - `sqlite`: the SDK's encrypted state store
//!
//! [`SessionStore`] owns both paths and the read/write logic around the
//! JSON file.

use std::path::PathBuf;

use log::{debug, trace};
use matrix_sdk::authentication::matrix;
use serde::{Deserialize, Serialize};
use tokio::fs;

/// On-disk session data: authentication plus the optional sync token.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSession {
    /// The authenticated Matrix session (tokens, device ID)
    auth: matrix::MatrixSession,

    /// Last sync token, used to resume the sync loop where it left off.
    ///
    /// Omitted from the file when `None`.
    #[serde(skip_serializing_if = "Option::is_none")]
    sync_token: Option<String>,
}

/// Session store rooted at the bot's data directory.
#[derive(Clone)]
pub struct SessionStore {
    /// The stored session, if the file existed and parsed.
    stored: Option<StoredSession>,
    /// Path to the SDK's sqlite state store.
    sqlite_path: String,
    /// Path to the session JSON file.
    session_path: String,
}

impl SessionStore {
    /// Opens the session store, loading the session file if present.
    ///
    /// A missing or unreadable session file is not an error; it just means
    /// the bot must log in from scratch.
    pub async fn new(dir_path: &str) -> Result<SessionStore, anyhow::Error> {
        debug!("opening session store at {}", dir_path);

        let sqlite_path = join(dir_path, "sqlite");
        let session_path = join(dir_path, "session");

        let stored = Self::read_stored(&session_path).await.ok();
        debug!("stored session found: {}", stored.is_some());

        Ok(SessionStore {
            stored,
            sqlite_path,
            session_path,
        })
    }

    async fn read_stored(session_path: &str) -> Result<StoredSession, anyhow::Error> {
        let data = fs::read_to_string(session_path).await?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Whether a previous session was found on disk.
    pub fn has_session(&self) -> bool {
        self.stored.is_some()
    }

    /// Path to the SDK's sqlite state store.
    pub fn sqlite_path(&self) -> &str {
        &self.sqlite_path
    }

    /// The stored authenticated session, if any.
    pub fn auth_session(&self) -> Option<&matrix::MatrixSession> {
        self.stored.as_ref().map(|stored| &stored.auth)
    }

    /// The stored sync token, if any.
    pub fn sync_token(&self) -> Option<String> {
        self.stored.as_ref().and_then(|s| s.sync_token.clone())
    }

    /// Updates the sync token in the session file, keeping the auth data.
    pub async fn persist_sync_token(&self, sync_token: String) -> anyhow::Result<()> {
        trace!("persist sync token {}", sync_token);

        let mut stored = Self::read_stored(&self.session_path).await?;
        stored.sync_token = Some(sync_token);
        fs::write(&self.session_path, serde_json::to_string(&stored)?).await?;

        Ok(())
    }

    /// Writes a fresh session file for a newly authenticated session.
    ///
    /// Any previously stored sync token is dropped on purpose: it belonged
    /// to the old session.
    pub async fn persist_auth_session(
        &self,
        auth: &matrix::MatrixSession,
    ) -> anyhow::Result<()> {
        trace!("persist auth session");

        let stored = StoredSession {
            auth: auth.clone(),
            sync_token: None,
        };
        fs::write(&self.session_path, serde_json::to_string(&stored)?).await?;

        Ok(())
    }
}

fn join(dir_path: &str, file: &str) -> String {
    let path: PathBuf = [dir_path, file].iter().collect();
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_sdk::{
        SessionMeta, SessionTokens, authentication::matrix::MatrixSession as SdkMatrixSession,
    };
    use tempfile::TempDir;
    use tokio::fs;

    fn create_auth_session() -> SdkMatrixSession {
        SdkMatrixSession {
            meta: SessionMeta {
                user_id: "@pigeon:example.com".try_into().unwrap(),
                device_id: "DEVICEID".into(),
            },
            tokens: SessionTokens {
                access_token: "access_token".to_string(),
                refresh_token: None,
            },
        }
    }

    fn create_session_json() -> String {
        let stored = StoredSession {
            auth: create_auth_session(),
            sync_token: Some("token_123".to_string()),
        };
        serde_json::to_string(&stored).unwrap()
    }

    #[tokio::test]
    async fn test_open_store_without_session_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().to_string_lossy().to_string();

        let store = SessionStore::new(&dir_path).await.unwrap();

        assert!(!store.has_session());
        assert!(store.auth_session().is_none());
        assert!(store.sync_token().is_none());
        assert_eq!(store.sqlite_path(), format!("{}/sqlite", dir_path));
    }

    #[tokio::test]
    async fn test_open_store_with_session_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().to_string_lossy().to_string();

        fs::write(format!("{}/session", dir_path), create_session_json())
            .await
            .unwrap();

        let store = SessionStore::new(&dir_path).await.unwrap();

        assert!(store.has_session());
        assert_eq!(
            store.auth_session().unwrap().meta.user_id.to_string(),
            "@pigeon:example.com"
        );
        assert_eq!(store.sync_token(), Some("token_123".to_string()));
    }

    #[tokio::test]
    async fn test_open_store_with_corrupt_session_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().to_string_lossy().to_string();

        fs::write(format!("{}/session", dir_path), "not json")
            .await
            .unwrap();

        let store = SessionStore::new(&dir_path).await.unwrap();
        assert!(!store.has_session());
    }

    #[tokio::test]
    async fn test_persist_auth_session_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().to_string_lossy().to_string();

        let store = SessionStore::new(&dir_path).await.unwrap();
        store
            .persist_auth_session(&create_auth_session())
            .await
            .unwrap();

        let reopened = SessionStore::new(&dir_path).await.unwrap();
        assert!(reopened.has_session());
        assert_eq!(
            reopened.auth_session().unwrap().meta.user_id.to_string(),
            "@pigeon:example.com"
        );
        // A fresh auth session starts without a sync token
        assert!(reopened.sync_token().is_none());
    }

    #[tokio::test]
    async fn test_persist_sync_token_keeps_auth() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().to_string_lossy().to_string();

        let store = SessionStore::new(&dir_path).await.unwrap();
        store
            .persist_auth_session(&create_auth_session())
            .await
            .unwrap();
        store
            .persist_sync_token("token_456".to_string())
            .await
            .unwrap();

        let reopened = SessionStore::new(&dir_path).await.unwrap();
        assert_eq!(reopened.sync_token(), Some("token_456".to_string()));
        assert!(reopened.auth_session().is_some());
    }

    #[tokio::test]
    async fn test_persist_sync_token_without_session_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let dir_path = temp_dir.path().to_string_lossy().to_string();

        let store = SessionStore::new(&dir_path).await.unwrap();
        let result = store.persist_sync_token("token".to_string()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_stored_session_omits_missing_sync_token() {
        let stored = StoredSession {
            auth: create_auth_session(),
            sync_token: None,
        };

        let serialized = serde_json::to_string(&stored).unwrap();
        assert!(!serialized.contains("sync_token"));
    }
}
