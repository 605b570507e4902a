//! Per-store configuration
//!
//! Read from `charter.toml` at the store root when present; every field has
//! a default, so the file may set only what it needs:
//!
//! ```toml
//! approval_mode = "strict"
//! lock_timeout_ms = 2000
//! integrity = "enforced"
//! ```

use crate::error::{CharterError, Result};
use crate::mutation::{ApprovalMode, DEFAULT_LOCK_TIMEOUT};
use charter_storage::{checkpoint, CancellationToken, FileStore};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file under the store root
pub const CONFIG_FILE: &str = "charter.toml";

/// Whether cross-record checks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntegrityMode {
    /// References and cascades are checked through the registry
    #[default]
    Enforced,
    /// Every lookup reports "unchecked"
    Disabled,
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Oversight level used by [`crate::Store::approval_level`]
    pub approval_mode: ApprovalMode,
    /// Default wait for shared-file locks, in milliseconds
    pub lock_timeout_ms: u64,
    /// Referential integrity checking
    pub integrity: IntegrityMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            approval_mode: ApprovalMode::default(),
            lock_timeout_ms: u64::try_from(DEFAULT_LOCK_TIMEOUT.as_millis()).unwrap_or(u64::MAX),
            integrity: IntegrityMode::default(),
        }
    }
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With approval mode
    #[inline]
    #[must_use]
    pub fn with_approval_mode(mut self, mode: ApprovalMode) -> Self {
        self.approval_mode = mode;
        self
    }

    /// With lock timeout
    #[inline]
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With integrity mode
    #[inline]
    #[must_use]
    pub fn with_integrity(mut self, integrity: IntegrityMode) -> Self {
        self.integrity = integrity;
        self
    }

    /// Lock timeout as a duration
    #[inline]
    #[must_use]
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// [`CharterError::Config`] on malformed input.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CharterError::Config(e.to_string()))
    }

    /// Load `charter.toml` from the store root, or defaults if it is absent
    ///
    /// # Errors
    /// [`CharterError::Config`] on malformed content, otherwise
    /// cancellation or I/O failures.
    pub async fn load(files: &FileStore, cancel: &CancellationToken) -> Result<Self> {
        checkpoint(cancel)?;
        let path = files.resolve(Path::new(CONFIG_FILE))?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => {
                let config = Self::from_toml_str(&text)?;
                tracing::debug!(?config, "loaded store configuration");
                Ok(config)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(charter_storage::StorageError::io(CONFIG_FILE, e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.approval_mode, ApprovalMode::Balanced);
        assert_eq!(config.lock_timeout(), Duration::from_secs(5));
        assert_eq!(config.integrity, IntegrityMode::Enforced);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = StoreConfig::from_toml_str("approval_mode = \"strict\"").unwrap();
        assert_eq!(config.approval_mode, ApprovalMode::Strict);
        assert_eq!(config.lock_timeout_ms, 5000);
    }

    #[test]
    fn unknown_mode_falls_back_to_balanced() {
        let config = StoreConfig::from_toml_str("approval_mode = \"whatever\"").unwrap();
        assert_eq!(config.approval_mode, ApprovalMode::Balanced);
    }

    #[test]
    fn malformed_is_config_error() {
        let err = StoreConfig::from_toml_str("lock_timeout_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, CharterError::Config(_)));
        let err = StoreConfig::from_toml_str("integrity = \"sometimes\"").unwrap_err();
        assert!(matches!(err, CharterError::Config(_)));
    }

    #[test]
    fn builders() {
        let config = StoreConfig::new()
            .with_approval_mode(ApprovalMode::Loose)
            .with_lock_timeout(Duration::from_millis(250))
            .with_integrity(IntegrityMode::Disabled);
        assert_eq!(config.lock_timeout_ms, 250);
        assert_eq!(config.integrity, IntegrityMode::Disabled);
    }

    #[tokio::test]
    async fn load_reads_file_or_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::open(dir.path()).await.unwrap();
        let cancel = CancellationToken::new();
        assert_eq!(StoreConfig::load(&files, &cancel).await.unwrap(), StoreConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE), "lock_timeout_ms = 100\n").unwrap();
        let config = StoreConfig::load(&files, &cancel).await.unwrap();
        assert_eq!(config.lock_timeout(), Duration::from_millis(100));
    }
}
