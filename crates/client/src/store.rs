//! Credential persistence.
//!
//! The access token, refresh token, and serialized profile form one
//! [`Credentials`] record behind a [`CredentialStore`]: in-memory for tests
//! and embedding, JSON-file-backed for the CLI so a session survives across
//! invocations.
//!
//! Only the session manager writes through this interface.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweet_shop_core::UserProfile;

/// The persisted token pair plus the denormalized profile copy.
///
/// The profile is a cache for fast reads; the access token stays the source
/// of truth and the profile is recomputed whenever the tokens change.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Short-lived credential sent with each authenticated request.
    pub access_token: String,
    /// Longer-lived credential used solely to obtain a new access token.
    pub refresh_token: String,
    /// Profile decoded from the access token at login time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

// Tokens are secrets; keep them out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Errors that can occur while loading or saving credentials.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem operation failed.
    #[error("credential file I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The stored record is not valid JSON for the current schema.
    #[error("credential file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The in-memory lock was poisoned by a panicking writer.
    #[error("credential store lock poisoned")]
    Poisoned,
}

/// Durable storage for the session's credentials.
///
/// `clear` must be idempotent: clearing an already-empty store succeeds.
pub trait CredentialStore: Send + Sync {
    /// Read the stored credentials, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be read.
    fn load(&self) -> Result<Option<Credentials>, StoreError>;

    /// Replace the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be written.
    fn save(&self, credentials: &Credentials) -> Result<(), StoreError>;

    /// Remove all stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backing storage cannot be cleared.
    fn clear(&self) -> Result<(), StoreError>;
}

/// Volatile in-process store.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Option<Credentials>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credentials>, StoreError> {
        Ok(self
            .inner
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .clone())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), StoreError> {
        *self.inner.write().map_err(|_| StoreError::Poisoned)? = Some(credentials.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.inner.write().map_err(|_| StoreError::Poisoned)? = None;
        Ok(())
    }
}

/// JSON-file-backed store for the CLI.
///
/// The whole record is written atomically-enough for a single-user tool:
/// one file, replaced on every save, deleted on clear.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by `path`. Parent directories are created on
    /// first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl CredentialStore for JsonFileStore {
    fn load(&self) -> Result<Option<Credentials>, StoreError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, credentials: &Credentials) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(credentials)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
