use crate::ports::SessionRepository;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use shared_http::api::User;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<User>,
}

/// Session held in process memory only.
#[derive(Debug, Default)]
pub struct MemorySessionRepository {
    inner: RwLock<StoredSession>,
}

impl MemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(StoredSession {
                token: Some(token.into()),
                user: None,
            }),
        }
    }
}

#[async_trait]
impl SessionRepository for MemorySessionRepository {
    async fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    async fn user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    async fn save(&self, token: String, user: User) -> Result<()> {
        *self.inner.write() = StoredSession {
            token: Some(token),
            user: Some(user),
        };
        Ok(())
    }

    async fn set_token(&self, token: Option<String>) -> Result<()> {
        self.inner.write().token = token;
        Ok(())
    }

    async fn set_user(&self, user: Option<User>) -> Result<()> {
        self.inner.write().user = user;
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.inner.write() = StoredSession::default();
        Ok(())
    }
}

/// Session persisted as `session.json` under the data directory, so a login
/// survives restarts of the CLI.
///
/// Writes are serialized: the file always ends up holding the last update
/// applied in memory.
#[derive(Debug)]
pub struct FileSessionRepository {
    path: PathBuf,
    inner: RwLock<StoredSession>,
    io: Mutex<()>,
}

impl FileSessionRepository {
    pub const FILE_NAME: &'static str = "session.json";

    /// Open (or lazily create) the session file in `data_dir`.
    ///
    /// A missing or corrupt file starts an empty session.
    pub async fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let path = data_dir.as_ref().join(Self::FILE_NAME);

        let stored = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                StoredSession::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredSession::default(),
            Err(e) => {
                return Err(Error::Internal(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        debug!("Opened session store at {}", path.display());
        Ok(Self {
            path,
            inner: RwLock::new(stored),
            io: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` and write the result out. An empty session removes the file.
    async fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut StoredSession),
    {
        let _io = self.io.lock().await;
        let snapshot = {
            let mut inner = self.inner.write();
            change(&mut *inner);
            inner.clone()
        };

        if snapshot == StoredSession::default() {
            return self.remove_file().await;
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Internal(format!("failed to create {}: {}", parent.display(), e)))?;
        }

        let bytes = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| Error::Internal(format!("failed to encode session: {}", e)))?;
        tokio::fs::write(&self.path, bytes)
            .await
            .map_err(|e| Error::Internal(format!("failed to write {}: {}", self.path.display(), e)))
    }

    async fn remove_file(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Internal(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[async_trait]
impl SessionRepository for FileSessionRepository {
    async fn token(&self) -> Option<String> {
        self.inner.read().token.clone()
    }

    async fn user(&self) -> Option<User> {
        self.inner.read().user.clone()
    }

    async fn save(&self, token: String, user: User) -> Result<()> {
        self.update(|session| {
            *session = StoredSession {
                token: Some(token),
                user: Some(user),
            }
        })
        .await
    }

    async fn set_token(&self, token: Option<String>) -> Result<()> {
        self.update(|session| session.token = token).await
    }

    async fn set_user(&self, user: Option<User>) -> Result<()> {
        self.update(|session| session.user = user).await
    }

    async fn clear(&self) -> Result<()> {
        self.update(|session| *session = StoredSession::default()).await
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Whether a JWT's `exp` claim lies at or before `now`.
///
/// Tokens that cannot be decoded, or carry no `exp`, count as expired.
pub fn token_expired(token: &str, now: DateTime<Utc>) -> bool {
    let Some(payload) = token.split('.').nth(1) else {
        return true;
    };

    let claims = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Claims>(&bytes).ok());

    match claims.and_then(|c| c.exp) {
        Some(exp) => exp <= now.timestamp(),
        None => true,
    }
}
