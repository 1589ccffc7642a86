//! Read-only handlers over public listings.

use async_trait::async_trait;
use serde_json::Value;

use super::params::{self, subreddit_name};
use super::{to_data, Handler, HandlerContext, HandlerError};
use crate::agent_core::types::{Intent, Parameters};

// ─── subreddit_posts ────────────────────────────────────────────────────────

/// Posts from one subreddit. Requires `subreddit`; `sort`, `limit`, `after`
/// default to `hot`, `10`, none.
pub struct SubredditPostsHandler {
    ctx: HandlerContext,
}

impl SubredditPostsHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for SubredditPostsHandler {
    fn intent(&self) -> Intent {
        Intent::SubredditPosts
    }

    fn description(&self) -> &'static str {
        "Get Reddit Subreddit Posts"
    }

    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError> {
        let subreddit = subreddit_name(&params::required_str(params, "subreddit")?)?;
        let page = params::page(params)?;
        let token = self.ctx.access_token().await?;
        let posts = self
            .ctx
            .checked(self.ctx.reddit.subreddit_posts(&token, &subreddit, &page).await)
            .await?;
        to_data(&posts)
    }
}

// ─── reddit_search ──────────────────────────────────────────────────────────

/// Full-text search, optionally restricted to one subreddit.
pub struct RedditSearchHandler {
    ctx: HandlerContext,
}

impl RedditSearchHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for RedditSearchHandler {
    fn intent(&self) -> Intent {
        Intent::RedditSearch
    }

    fn description(&self) -> &'static str {
        "Search Reddit"
    }

    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError> {
        let query = params::required_str(params, "query")?;
        let subreddit = params::optional_str(params, "subreddit")
            .map(|s| subreddit_name(&s))
            .transpose()?;
        let page = params::page(params)?;
        let token = self.ctx.access_token().await?;
        let results = self
            .ctx
            .checked(
                self.ctx
                    .reddit
                    .search(&token, &query, subreddit.as_deref(), &page)
                    .await,
            )
            .await?;
        to_data(&results)
    }
}

// ─── post_comments ──────────────────────────────────────────────────────────

/// Top-level comments under a post.
pub struct PostCommentsHandler {
    ctx: HandlerContext,
}

impl PostCommentsHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for PostCommentsHandler {
    fn intent(&self) -> Intent {
        Intent::PostComments
    }

    fn description(&self) -> &'static str {
        "Get Reddit Post Comments"
    }

    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError> {
        let post_id = params::post_id(&params::required_str(params, "post_id")?)?;
        let subreddit = subreddit_name(&params::required_str(params, "subreddit")?)?;
        let page = params::page(params)?;
        let token = self.ctx.access_token().await?;
        let comments = self
            .ctx
            .checked(
                self.ctx
                    .reddit
                    .post_comments(&token, &subreddit, &post_id, &page)
                    .await,
            )
            .await?;
        to_data(&comments)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_with_credentials, FakeReddit};
    use serde_json::json;
    use std::sync::Arc;

    fn params(v: Value) -> Parameters {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn subreddit_posts_applies_defaults() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = SubredditPostsHandler::new(ctx)
            .handle(&params(json!({"subreddit": "r/technology"})))
            .await;
        assert!(!result.is_error());
        assert_eq!(reddit.calls(), vec!["subreddit_posts:technology:hot:10:-"]);
    }

    #[tokio::test]
    async fn subreddit_posts_returns_exact_records() {
        let reddit = Arc::new(FakeReddit::with_posts(2));
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = SubredditPostsHandler::new(ctx)
            .handle(&params(json!({"subreddit": "technology", "limit": 2, "sort": "top"})))
            .await;
        let posts = result.data.as_array().unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0]["title"], "Post 1");
        assert_eq!(reddit.calls(), vec!["subreddit_posts:technology:top:2:-"]);
    }

    #[tokio::test]
    async fn subreddit_posts_without_subreddit_is_error_and_skips_backend() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = SubredditPostsHandler::new(ctx)
            .handle(&params(json!({"limit": 5})))
            .await;
        assert!(result.is_error());
        assert!(reddit.calls().is_empty());
    }

    #[tokio::test]
    async fn search_restricted_to_subreddit() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = RedditSearchHandler::new(ctx)
            .handle(&params(json!({"query": "tokio", "subreddit": "rust", "sort": "new"})))
            .await;
        assert!(!result.is_error());
        assert_eq!(reddit.calls(), vec!["search:tokio:rust:new:10"]);
    }

    #[tokio::test]
    async fn search_site_wide_when_subreddit_null() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        RedditSearchHandler::new(ctx)
            .handle(&params(json!({"query": "rust", "subreddit": null})))
            .await;
        assert_eq!(reddit.calls(), vec!["search:rust:-:hot:10"]);
    }

    #[tokio::test]
    async fn post_comments_requires_both_ids() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let handler = PostCommentsHandler::new(ctx);

        let missing = handler.handle(&params(json!({"post_id": "t3_abc"}))).await;
        assert!(missing.is_error());

        let ok = handler
            .handle(&params(json!({"post_id": "t3_abc", "subreddit": "rust", "limit": 3})))
            .await;
        assert!(!ok.is_error());
        assert_eq!(reddit.calls(), vec!["post_comments:rust:t3_abc:3"]);
    }

    #[tokio::test]
    async fn path_like_subreddit_is_rejected_before_any_request() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;

        let posts = SubredditPostsHandler::new(ctx.clone())
            .handle(&params(json!({"subreddit": "rust/../../api/v1/me/prefs?x="})))
            .await;
        assert!(posts.is_error());
        assert_eq!(posts.data, json!("error"));

        let search = RedditSearchHandler::new(ctx.clone())
            .handle(&params(json!({"query": "q", "subreddit": "rust/../search"})))
            .await;
        assert!(search.is_error());

        let comments = PostCommentsHandler::new(ctx)
            .handle(&params(json!({"post_id": "abc/../../api/v1/me", "subreddit": "rust"})))
            .await;
        assert!(comments.is_error());

        assert!(reddit.calls().is_empty());
    }
}
