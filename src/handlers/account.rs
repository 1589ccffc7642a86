//! Handlers scoped to the authenticated account.

use async_trait::async_trait;
use serde_json::Value;

use super::params;
use super::{to_data, Handler, HandlerContext, HandlerError};
use crate::agent_core::types::{Intent, Parameters};

// ─── user_info ──────────────────────────────────────────────────────────────

pub struct UserInfoHandler {
    ctx: HandlerContext,
}

impl UserInfoHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for UserInfoHandler {
    fn intent(&self) -> Intent {
        Intent::UserInfo
    }

    fn description(&self) -> &'static str {
        "Get Reddit User Info"
    }

    async fn call(&self, _params: &Parameters) -> Result<Value, HandlerError> {
        let token = self.ctx.access_token().await?;
        let info = self.ctx.checked(self.ctx.reddit.identity(&token).await).await?;
        to_data(&info)
    }
}

// ─── user_karma ─────────────────────────────────────────────────────────────

pub struct UserKarmaHandler {
    ctx: HandlerContext,
}

impl UserKarmaHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for UserKarmaHandler {
    fn intent(&self) -> Intent {
        Intent::UserKarma
    }

    fn description(&self) -> &'static str {
        "Get Reddit User Karma"
    }

    async fn call(&self, _params: &Parameters) -> Result<Value, HandlerError> {
        let token = self.ctx.access_token().await?;
        let karma = self.ctx.checked(self.ctx.reddit.karma(&token).await).await?;
        to_data(&karma)
    }
}

// ─── user_trophies ──────────────────────────────────────────────────────────

pub struct UserTrophiesHandler {
    ctx: HandlerContext,
}

impl UserTrophiesHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for UserTrophiesHandler {
    fn intent(&self) -> Intent {
        Intent::UserTrophies
    }

    fn description(&self) -> &'static str {
        "Get Reddit User Trophies"
    }

    async fn call(&self, _params: &Parameters) -> Result<Value, HandlerError> {
        let token = self.ctx.access_token().await?;
        let trophies = self.ctx.checked(self.ctx.reddit.trophies(&token).await).await?;
        to_data(&trophies)
    }
}

// ─── user_posts ─────────────────────────────────────────────────────────────

pub struct UserPostsHandler {
    ctx: HandlerContext,
}

impl UserPostsHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for UserPostsHandler {
    fn intent(&self) -> Intent {
        Intent::UserPosts
    }

    fn description(&self) -> &'static str {
        "Get Reddit User Posts"
    }

    async fn call(&self, _params: &Parameters) -> Result<Value, HandlerError> {
        let token = self.ctx.access_token().await?;
        let username = self.ctx.username().await?;
        let posts = self
            .ctx
            .checked(self.ctx.reddit.user_posts(&token, &username).await)
            .await?;
        to_data(&posts)
    }
}

// ─── user_comments ──────────────────────────────────────────────────────────

pub struct UserCommentsHandler {
    ctx: HandlerContext,
}

impl UserCommentsHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for UserCommentsHandler {
    fn intent(&self) -> Intent {
        Intent::UserComments
    }

    fn description(&self) -> &'static str {
        "Get Reddit User Comments"
    }

    async fn call(&self, _params: &Parameters) -> Result<Value, HandlerError> {
        let token = self.ctx.access_token().await?;
        let username = self.ctx.username().await?;
        let comments = self
            .ctx
            .checked(self.ctx.reddit.user_comments(&token, &username).await)
            .await?;
        to_data(&comments)
    }
}

// ─── subscribed_subreddits ──────────────────────────────────────────────────

pub struct SubscribedSubredditsHandler {
    ctx: HandlerContext,
}

impl SubscribedSubredditsHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for SubscribedSubredditsHandler {
    fn intent(&self) -> Intent {
        Intent::SubscribedSubreddits
    }

    fn description(&self) -> &'static str {
        "Get Subscribed Subreddits"
    }

    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError> {
        let limit = params::limit(params)?;
        let token = self.ctx.access_token().await?;
        let subs = self
            .ctx
            .checked(self.ctx.reddit.subscribed_subreddits(&token, limit).await)
            .await?;
        to_data(&subs)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::ACCESS_TOKEN_KEY;
    use crate::test_support::{context_with_credentials, FakeReddit};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn user_info_returns_profile() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = UserInfoHandler::new(ctx).handle(&Parameters::new()).await;
        assert!(!result.is_error());
        assert_eq!(result.data["username"], "test_user");
        assert_eq!(result.description, "Get Reddit User Info");
        assert_eq!(reddit.calls(), vec!["identity"]);
    }

    #[tokio::test]
    async fn user_posts_uses_stored_username() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = UserPostsHandler::new(ctx).handle(&Parameters::new()).await;
        assert!(!result.is_error());
        assert_eq!(reddit.calls(), vec!["user_posts:test_user"]);
    }

    #[tokio::test]
    async fn missing_token_yields_error_envelope() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        ctx.store.delete(ACCESS_TOKEN_KEY).await.unwrap();

        let result = UserKarmaHandler::new(ctx).handle(&Parameters::new()).await;
        assert!(result.is_error());
        assert_eq!(result.data, json!("error"));
        assert_eq!(result.description, "Get Reddit User Karma");
        assert!(reddit.calls().is_empty());
    }

    #[tokio::test]
    async fn backend_failure_yields_error_envelope() {
        let reddit = Arc::new(FakeReddit::failing());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = UserTrophiesHandler::new(ctx).handle(&Parameters::new()).await;
        assert!(result.is_error());
        assert_eq!(reddit.calls(), vec!["trophies"]);
    }

    #[tokio::test]
    async fn unauthorized_discards_access_token() {
        let reddit = Arc::new(FakeReddit::unauthorized());
        let ctx = context_with_credentials(reddit).await;
        let result = UserKarmaHandler::new(ctx.clone())
            .handle(&Parameters::new())
            .await;
        assert!(result.is_error());
        assert!(ctx.store.get(ACCESS_TOKEN_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn subscribed_passes_limit() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let params = json!({"limit": "25"}).as_object().cloned().unwrap();
        let result = SubscribedSubredditsHandler::new(ctx).handle(&params).await;
        assert!(!result.is_error());
        assert_eq!(reddit.calls(), vec!["subscribed_subreddits:25"]);
    }
}
