//! Credential Bootstrap Sequencer.
//!
//! Guarantees an access token and a resolved username exist before any
//! handler runs:
//!
//! 1. token present → nothing to do for it
//! 2. otherwise reuse a stored authorization code, or acquire one by sending
//!    the user through Reddit's consent screen and polling the store for the
//!    `user_permission` flag the callback writes
//! 3. exchange the code for a token
//! 4. username missing → validate the token against `/api/v1/me`
//!
//! With every credential present, [`BootstrapSequencer::ensure_credentials`]
//! makes no network calls.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use crate::agent_core::errors::AgentError;
use crate::config::{AuthConfig, RedditConfig};
use crate::credentials::{
    fingerprint, CredentialStore, CredentialTtls, PermissionFlag, ACCESS_TOKEN_KEY,
    AUTH_CODE_KEY, PERMISSION_KEY, USERNAME_KEY,
};
use crate::reddit::{auth, RedditApi, RedditError};
use crate::TokioMutex;

/// Sends the user to the consent URL.
///
/// Must return once the user has been shown the URL; the sequencer does the
/// waiting.
#[async_trait]
pub trait AuthorizationLauncher: Send + Sync {
    async fn launch(&self, url: &Url) -> Result<(), AgentError>;
}

pub struct BootstrapSequencer {
    store: Arc<dyn CredentialStore>,
    reddit: Arc<dyn RedditApi>,
    reddit_config: RedditConfig,
    auth: AuthConfig,
    ttls: CredentialTtls,
    launcher: Arc<dyn AuthorizationLauncher>,
    /// Single-flight guard: at most one bootstrap in progress.
    in_flight: TokioMutex<()>,
}

impl BootstrapSequencer {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        reddit: Arc<dyn RedditApi>,
        reddit_config: RedditConfig,
        auth: AuthConfig,
        ttls: CredentialTtls,
        launcher: Arc<dyn AuthorizationLauncher>,
    ) -> Self {
        Self {
            store,
            reddit,
            reddit_config,
            auth,
            ttls,
            launcher,
            in_flight: TokioMutex::new(()),
        }
    }

    /// Ensure `reddit_access_token` and `reddit_username` are stored.
    ///
    /// Fails with `AuthDenied` when the user declines, `AuthTimeout` when the
    /// polling budget runs out, and `Cancelled` when `cancel` fires.
    pub async fn ensure_credentials(&self, cancel: &CancellationToken) -> Result<(), AgentError> {
        if self.credentials_present().await? {
            tracing::debug!("credentials present, skipping bootstrap");
            return Ok(());
        }

        let _guard = tokio::select! {
            guard = self.in_flight.lock() => guard,
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
        };

        // Another run may have finished bootstrapping while we waited.
        let token = match self.store.get(ACCESS_TOKEN_KEY).await? {
            Some(token) => token,
            None => self.acquire_access_token(cancel).await?,
        };

        if self.store.get(USERNAME_KEY).await?.is_none() {
            self.resolve_username(&token, cancel).await?;
        }

        tracing::info!("bootstrap complete");
        Ok(())
    }

    async fn credentials_present(&self) -> Result<bool, AgentError> {
        Ok(self.store.get(ACCESS_TOKEN_KEY).await?.is_some()
            && self.store.get(USERNAME_KEY).await?.is_some())
    }

    // ─── Access token ───────────────────────────────────────────────────

    async fn acquire_access_token(&self, cancel: &CancellationToken) -> Result<String, AgentError> {
        let code = match self.store.get(AUTH_CODE_KEY).await? {
            Some(code) => {
                tracing::info!(code = %fingerprint(&code), "reusing stored authorization code");
                code
            }
            None => self.acquire_auth_code(cancel).await?,
        };

        let exchanged = tokio::select! {
            result = self.reddit.exchange_code(&code) => result,
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
        };

        // Codes are single-use: consumed on success, useless on failure.
        self.store.delete(AUTH_CODE_KEY).await?;
        self.store.delete(PERMISSION_KEY).await?;

        let token = exchanged.map_err(|e| {
            tracing::warn!(error = %e, "token exchange failed");
            AgentError::TokenExchange {
                reason: e.to_string(),
            }
        })?;

        let ttl = token
            .expires_in
            .map(std::time::Duration::from_secs)
            .map_or(self.ttls.access_token, |d| d.min(self.ttls.access_token));
        self.store
            .set(ACCESS_TOKEN_KEY, &token.access_token, ttl)
            .await?;

        tracing::info!(
            token = %fingerprint(&token.access_token),
            ttl_secs = ttl.as_secs(),
            "access token stored"
        );
        Ok(token.access_token)
    }

    // ─── Authorization code ─────────────────────────────────────────────

    async fn acquire_auth_code(&self, cancel: &CancellationToken) -> Result<String, AgentError> {
        // A flag left by an earlier attempt must not decide this one.
        self.store.delete(PERMISSION_KEY).await?;

        let url = auth::authorize_url(&self.reddit_config).map_err(|e| {
            AgentError::AuthorizationFailed {
                reason: e.to_string(),
            }
        })?;
        tracing::info!("requesting user authorization");
        self.launcher.launch(&url).await?;

        self.poll_for_code(cancel).await
    }

    /// Poll for the permission flag: once immediately, then every
    /// `poll_interval`, for at most `max_poll_attempts` reads.
    async fn poll_for_code(&self, cancel: &CancellationToken) -> Result<String, AgentError> {
        let max_attempts = self.auth.max_poll_attempts.max(1);
        let interval = self.auth.poll_interval();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = cancel.cancelled() => {
                        tracing::info!(attempt, "authorization wait cancelled");
                        return Err(AgentError::Cancelled);
                    }
                }
            } else if cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }

            let flag = self
                .store
                .get(PERMISSION_KEY)
                .await?
                .as_deref()
                .and_then(PermissionFlag::parse);

            match flag {
                Some(PermissionFlag::Denied) => {
                    tracing::warn!(attempt, "user declined authorization");
                    return Err(AgentError::AuthDenied);
                }
                Some(PermissionFlag::Granted) => {
                    if let Some(code) = self.store.get(AUTH_CODE_KEY).await? {
                        tracing::info!(attempt, code = %fingerprint(&code), "authorization granted");
                        return Ok(code);
                    }
                    tracing::debug!(attempt, "permission granted but no code yet");
                }
                None => {
                    tracing::debug!(attempt, max_attempts, "waiting for authorization");
                }
            }
        }

        tracing::warn!(max_attempts, "authorization polling budget exhausted");
        Err(AgentError::AuthTimeout {
            attempts: max_attempts,
        })
    }

    // ─── Username ───────────────────────────────────────────────────────

    async fn resolve_username(&self, token: &str, cancel: &CancellationToken) -> Result<(), AgentError> {
        let identity = tokio::select! {
            result = self.reddit.identity(token) => result,
            _ = cancel.cancelled() => return Err(AgentError::Cancelled),
        };

        let user = match identity {
            Ok(user) => user,
            Err(e) => {
                if matches!(e, RedditError::Unauthorized { .. }) {
                    tracing::warn!("stored access token rejected, discarding it");
                    self.store.delete(ACCESS_TOKEN_KEY).await?;
                }
                return Err(AgentError::IdentityValidation {
                    reason: e.to_string(),
                });
            }
        };

        if user.username.is_empty() {
            return Err(AgentError::IdentityValidation {
                reason: "identity endpoint returned no username".into(),
            });
        }

        self.store
            .set(USERNAME_KEY, &user.username, self.ttls.username)
            .await?;
        tracing::info!(username = %user.username, "username resolved");
        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
