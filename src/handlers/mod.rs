//! Operation Handlers — one per supported intent.
//!
//! Every handler implements [`Handler`]: fetch credentials from the store,
//! make exactly one backend call, and reshape the response into a stable
//! record. Failures never escape: [`Handler::handle`] turns them into a
//! [`HandlerResult`] whose `data` is the `"error"` sentinel.
//!
//! - `account` — the authenticated user's profile, karma, trophies, posts, comments, subscriptions
//! - `listing` — subreddit listings, search, comments under a post
//! - `submission` — writes (post, comment, vote) and content generation
//! - `registry` — the `Intent → Handler` table the router dispatches through
//! - `params` — loose parameter parsing and defaults

pub mod account;
pub mod listing;
pub mod params;
pub mod registry;
pub mod submission;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::agent_core::content::ContentGenerator;
use crate::agent_core::types::{Intent, Parameters};
use crate::credentials::{CredentialStore, StoreError, ACCESS_TOKEN_KEY, USERNAME_KEY};
use crate::reddit::{RedditApi, RedditError};

pub use registry::HandlerRegistry;

/// Value of `HandlerResult::data` when the handler failed.
pub const ERROR_SENTINEL: &str = "error";

// ─── HandlerResult ──────────────────────────────────────────────────────────

/// The uniform `{data, description}` envelope every handler returns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResult {
    pub data: Value,
    pub description: String,
}

impl HandlerResult {
    pub fn ok(data: Value, description: impl Into<String>) -> Self {
        Self {
            data,
            description: description.into(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            data: Value::String(ERROR_SENTINEL.to_string()),
            description: description.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.data.as_str() == Some(ERROR_SENTINEL)
    }
}

// ─── Errors ─────────────────────────────────────────────────────────────────

/// Internal handler failures. Converted to the error envelope at the
/// handler boundary; never seen by the router.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing required parameter '{name}'")]
    MissingParameter { name: String },

    #[error("invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// A credential the handler needs is absent or expired.
    #[error("credential '{key}' is not available")]
    MissingCredential { key: &'static str },

    #[error(transparent)]
    Backend(#[from] RedditError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Content generation failed or produced unusable output.
    #[error("content generation failed: {reason}")]
    Generation { reason: String },

    #[error("failed to serialize handler output: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Serialization {
            reason: e.to_string(),
        }
    }
}

// ─── Handler trait ──────────────────────────────────────────────────────────

/// A single intent's operation.
#[async_trait]
pub trait Handler: Send + Sync {
    fn intent(&self) -> Intent;

    /// Human-readable label passed to the formatter alongside the output.
    fn description(&self) -> &'static str;

    /// Run the operation. Errors are converted by [`Handler::handle`].
    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError>;

    /// Run the operation and wrap the outcome in the uniform envelope.
    async fn handle(&self, params: &Parameters) -> HandlerResult {
        let start = std::time::Instant::now();
        match self.call(params).await {
            Ok(data) => {
                tracing::info!(
                    intent = %self.intent(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "handler succeeded"
                );
                HandlerResult::ok(data, self.description())
            }
            Err(e) => {
                tracing::warn!(
                    intent = %self.intent(),
                    error = %e,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "handler failed"
                );
                HandlerResult::error(self.description())
            }
        }
    }
}

// ─── HandlerContext ─────────────────────────────────────────────────────────

/// Dependencies shared by all handlers.
#[derive(Clone)]
pub struct HandlerContext {
    pub store: Arc<dyn CredentialStore>,
    pub reddit: Arc<dyn RedditApi>,
}

impl HandlerContext {
    pub fn new(store: Arc<dyn CredentialStore>, reddit: Arc<dyn RedditApi>) -> Self {
        Self { store, reddit }
    }

    pub async fn access_token(&self) -> Result<String, HandlerError> {
        self.store
            .get(ACCESS_TOKEN_KEY)
            .await?
            .ok_or(HandlerError::MissingCredential {
                key: ACCESS_TOKEN_KEY,
            })
    }

    pub async fn username(&self) -> Result<String, HandlerError> {
        self.store
            .get(USERNAME_KEY)
            .await?
            .ok_or(HandlerError::MissingCredential { key: USERNAME_KEY })
    }

    /// Pass a backend result through, dropping the stored access token when
    /// Reddit rejected it so the next run bootstraps a fresh one.
    pub async fn checked<T>(&self, result: Result<T, RedditError>) -> Result<T, HandlerError> {
        match result {
            Err(e) if e.is_unauthorized() => {
                tracing::warn!("access token rejected, discarding it");
                if let Err(store_err) = self.store.delete(ACCESS_TOKEN_KEY).await {
                    tracing::warn!(error = %store_err, "failed to discard access token");
                }
                Err(e.into())
            }
            other => other.map_err(HandlerError::from),
        }
    }
}

/// Serialize a shaped record into handler output.
pub(crate) fn to_data<T: Serialize>(value: &T) -> Result<Value, HandlerError> {
    Ok(serde_json::to_value(value)?)
}

/// Build a registry with every handler.
pub fn default_registry(
    ctx: HandlerContext,
    generator: Arc<dyn ContentGenerator>,
) -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(account::UserInfoHandler::new(ctx.clone())));
    registry.register(Arc::new(account::UserKarmaHandler::new(ctx.clone())));
    registry.register(Arc::new(account::UserTrophiesHandler::new(ctx.clone())));
    registry.register(Arc::new(account::UserPostsHandler::new(ctx.clone())));
    registry.register(Arc::new(account::UserCommentsHandler::new(ctx.clone())));
    registry.register(Arc::new(account::SubscribedSubredditsHandler::new(
        ctx.clone(),
    )));
    registry.register(Arc::new(listing::SubredditPostsHandler::new(ctx.clone())));
    registry.register(Arc::new(listing::RedditSearchHandler::new(ctx.clone())));
    registry.register(Arc::new(listing::PostCommentsHandler::new(ctx.clone())));
    registry.register(Arc::new(submission::SubmitPostHandler::new(ctx.clone())));
    registry.register(Arc::new(submission::SubmitCommentHandler::new(ctx.clone())));
    registry.register(Arc::new(submission::VoteHandler::new(ctx)));
    registry.register(Arc::new(submission::GenerateContentHandler::new(generator)));
    registry
}
