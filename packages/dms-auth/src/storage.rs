//! Durable token storage backends.
//!
//! The session store only ever persists a single value (the auth token),
//! so the interface is a narrow load/store/clear rather than a general
//! key-value map.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Error type for storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session file serialization: {0}")]
    Json(#[from] serde_json::Error),
}

/// Durable home of the persisted session token.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Read the persisted token, if one exists.
    async fn load(&self) -> Result<Option<String>, StorageError>;

    /// Persist the token, replacing any previous one.
    async fn store(&self, token: &str) -> Result<(), StorageError>;

    /// Remove the persisted token. Clearing an empty store is not an error.
    async fn clear(&self) -> Result<(), StorageError>;
}

/// In-memory backend for tests and ephemeral composition roots.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start out already holding a token, as if a previous run signed in.
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.token.lock().await.clone())
    }

    async fn store(&self, token: &str) -> Result<(), StorageError> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        *self.token.lock().await = None;
        Ok(())
    }
}

/// On-disk layout of [`FileTokenStorage`]. A JSON document rather than the
/// bare token so the format can grow fields without a migration.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    auth_token: String,
}

/// Single-file JSON backend, e.g. `~/.config/dms/session.json`.
#[derive(Debug, Clone)]
pub struct FileTokenStorage {
    path: PathBuf,
}

impl FileTokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenStorage for FileTokenStorage {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<SessionFile>(&data) {
            Ok(file) => Ok(Some(file.auth_token)),
            Err(e) => {
                // An unreadable session file and no session file are the
                // same thing to the caller.
                tracing::warn!(path = %self.path.display(), "session file unreadable: {e}");
                Ok(None)
            }
        }
    }

    async fn store(&self, token: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let data = serde_json::to_string_pretty(&SessionFile {
            auth_token: token.to_string(),
        })?;
        tokio::fs::write(&self.path, data).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
