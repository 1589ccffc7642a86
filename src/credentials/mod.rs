//! Credential Store — expiring key-value storage for OAuth state.
//!
//! The orchestration core only ever reads, writes and deletes four keys:
//! the authorization code, the access token, the resolved username and the
//! user-permission flag written by the authorization callback. Each entry
//! carries its own TTL; an expired entry is indistinguishable from a missing
//! one.
//!
//! - `memory` — process-local store, the default and the test double
//! - `sqlite` — file-backed store so credentials survive CLI invocations

pub mod memory;
pub mod sqlite;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::config::{CredentialBackend, CredentialsConfig};

pub use memory::MemoryCredentialStore;
pub use sqlite::SqliteCredentialStore;

// ─── Keys ────────────────────────────────────────────────────────────────────

/// Authorization code delivered by the OAuth redirect.
pub const AUTH_CODE_KEY: &str = "reddit_auth_code";
/// Bearer token for the Reddit API.
pub const ACCESS_TOKEN_KEY: &str = "reddit_access_token";
/// Username resolved from the identity endpoint.
pub const USERNAME_KEY: &str = "reddit_username";
/// `"true"` / `"false"` flag written by the authorization callback.
pub const PERMISSION_KEY: &str = "user_permission";

/// Every key the agent writes, for status and logout.
pub const ALL_KEYS: [&str; 4] = [AUTH_CODE_KEY, ACCESS_TOKEN_KEY, USERNAME_KEY, PERMISSION_KEY];

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised by a credential store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying storage failed.
    #[error("credential store backend error: {reason}")]
    Backend { reason: String },

    /// The store could not be opened.
    #[error("failed to open credential store at {path}: {reason}")]
    Open { path: String, reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend {
            reason: e.to_string(),
        }
    }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Expiring key-value store shared by the bootstrap sequencer and handlers.
///
/// Implementations must be safe to share across concurrent runs.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch a live value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove a value. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// ─── Permission flag ─────────────────────────────────────────────────────────

/// Decoded value of [`PERMISSION_KEY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionFlag {
    Granted,
    Denied,
}

impl PermissionFlag {
    /// Anything other than `"true"` / `"false"` means "not decided yet".
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "true" => Some(PermissionFlag::Granted),
            "false" => Some(PermissionFlag::Denied),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionFlag::Granted => "true",
            PermissionFlag::Denied => "false",
        }
    }
}

// ─── TTLs ────────────────────────────────────────────────────────────────────

/// Per-key expiry applied when credentials are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialTtls {
    pub auth_code: Duration,
    pub access_token: Duration,
    pub username: Duration,
    pub permission: Duration,
}

impl Default for CredentialTtls {
    fn default() -> Self {
        Self::from(&CredentialsConfig::default())
    }
}

impl From<&CredentialsConfig> for CredentialTtls {
    fn from(config: &CredentialsConfig) -> Self {
        Self {
            auth_code: Duration::from_secs(config.auth_code_ttl_secs),
            access_token: Duration::from_secs(config.access_token_ttl_secs),
            username: Duration::from_secs(config.username_ttl_secs),
            permission: Duration::from_secs(config.permission_ttl_secs),
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Open the store selected in config.
pub fn open_store(config: &CredentialsConfig) -> Result<Arc<dyn CredentialStore>, StoreError> {
    match config.backend {
        CredentialBackend::Memory => Ok(Arc::new(MemoryCredentialStore::new())),
        CredentialBackend::Sqlite => {
            let path = config
                .path
                .as_deref()
                .map(|p| PathBuf::from(crate::config::expand_tilde(p)))
                .unwrap_or_else(|| crate::data_dir().join("credentials.db"));
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            Ok(Arc::new(SqliteCredentialStore::open(&path)?))
        }
    }
}

/// Short, non-reversible tag for a secret, safe to log.
pub fn fingerprint(secret: &str) -> String {
    let digest = Sha256::digest(secret.as_bytes());
    digest.iter().take(4).map(|b| format!("{b:02x}")).collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
