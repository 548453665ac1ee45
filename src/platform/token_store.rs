// NeuroSuite - platform/token_store.rs
//
// Durable token storage: the one piece of client state that survives a
// restart. Absent record = logged out.
//
// Design principles:
// - Records are saved atomically (write→temp, rename→final) so a crash
//   during save never corrupts the previous good record.
// - Load errors are never surfaced: a corrupt or incompatible record is
//   logged and removed, so startup simply begins logged out.
// - The data directory is created on first save.
// - Only the token pair is persisted; the user profile lives in memory.

use crate::core::model::TokenPair;
use crate::util::error::StorageError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Version stamp for forward-compatibility checks.
///
/// Version mismatches discard the stored record.
pub const TOKEN_RECORD_VERSION: u32 = 1;

/// Durable storage for the session's token pair.
#[cfg_attr(test, mockall::automock)]
pub trait TokenStore: Send + Sync {
    /// The persisted pair, or `None` when logged out or unreadable.
    fn load(&self) -> Option<TokenPair>;

    /// Replace the persisted pair.
    fn save(&self, tokens: &TokenPair) -> Result<(), StorageError>;

    /// Remove the persisted pair. Removing an absent record succeeds.
    fn clear(&self) -> Result<(), StorageError>;
}

/// On-disk record.
#[derive(Debug, Serialize, Deserialize)]
struct TokenRecord {
    version: u32,
    saved_at: DateTime<Utc>,
    tokens: TokenPair,
}

/// JSON file implementation of [`TokenStore`].
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove a record that cannot be used. Failure only leaves it for the
    /// next save to overwrite.
    fn discard(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "Cannot remove unusable token file");
        }
    }

    fn io_error(&self, operation: &'static str, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            operation,
            source,
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<TokenPair> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| {
                // "Not found" is the normal logged-out case.
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %self.path.display(), error = %e, "Cannot read token file");
                }
            })
            .ok()?;

        let record: TokenRecord = serde_json::from_str(&content)
            .map_err(|e| {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Token file is malformed; treating as logged out"
                );
                self.discard();
            })
            .ok()?;

        if record.version != TOKEN_RECORD_VERSION {
            tracing::warn!(
                found = record.version,
                expected = TOKEN_RECORD_VERSION,
                "Token file version mismatch; treating as logged out"
            );
            self.discard();
            return None;
        }

        tracing::debug!(
            path = %self.path.display(),
            saved_at = %record.saved_at,
            "Token file loaded"
        );
        Some(record.tokens)
    }

    fn save(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| self.io_error("create directory", parent, e))?;
            }
        }

        let record = TokenRecord {
            version: TOKEN_RECORD_VERSION,
            saved_at: Utc::now(),
            tokens: tokens.clone(),
        };
        let json = serde_json::to_string_pretty(&record).map_err(|e| StorageError::Json {
            path: self.path.clone(),
            source: e,
        })?;

        // Atomic write: a crash between write and rename loses the new
        // record but never corrupts the previous one.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json.as_bytes()).map_err(|e| self.io_error("write", &tmp, e))?;

        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            self.io_error("rename", &self.path, e)
        })?;

        tracing::debug!(path = %self.path.display(), "Tokens saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Token file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove", &self.path, e)),
        }
    }
}

// =============================================================================
// Unit tests
// =============================================================================
