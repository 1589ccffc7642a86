//! Write handlers and content generation.
//!
//! Writes whose payload Reddit rejects (`success: false`) are reported as
//! failures, so the formatter sees the error sentinel rather than a
//! half-successful record.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::params::{self, subreddit_name};
use super::{to_data, Handler, HandlerContext, HandlerError};
use crate::agent_core::content::ContentGenerator;
use crate::agent_core::types::{Intent, Parameters};
use crate::reddit::{NewPost, RedditError, SubmissionResult, VoteDirection};

fn accepted(result: SubmissionResult) -> Result<SubmissionResult, HandlerError> {
    if result.success {
        Ok(result)
    } else {
        tracing::warn!(errors = ?result.errors, "reddit rejected write");
        Err(RedditError::Api {
            messages: result.errors,
        }
        .into())
    }
}

// ─── submit_post ────────────────────────────────────────────────────────────

/// Self-post submission. Requires `subreddit`, `title`, `text` (`content`
/// is accepted as an alias); `nsfw` and `spoiler` default to false.
pub struct SubmitPostHandler {
    ctx: HandlerContext,
}

impl SubmitPostHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for SubmitPostHandler {
    fn intent(&self) -> Intent {
        Intent::SubmitPost
    }

    fn description(&self) -> &'static str {
        "Submit Reddit Post"
    }

    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError> {
        let text = match params::optional_str(params, "text") {
            Some(text) => text,
            None => params::required_str(params, "content").map_err(|_| {
                HandlerError::MissingParameter {
                    name: "text".into(),
                }
            })?,
        };
        let post = NewPost {
            subreddit: subreddit_name(&params::required_str(params, "subreddit")?)?,
            title: params::required_str(params, "title")?,
            text,
            nsfw: params::optional_bool(params, "nsfw", false)?,
            spoiler: params::optional_bool(params, "spoiler", false)?,
        };

        let token = self.ctx.access_token().await?;
        let result = self
            .ctx
            .checked(self.ctx.reddit.submit_post(&token, &post).await)
            .await?;
        to_data(&accepted(result)?)
    }
}

// ─── submit_comment ─────────────────────────────────────────────────────────

/// Reply to the post or comment named by `thing_id` with `text`.
pub struct SubmitCommentHandler {
    ctx: HandlerContext,
}

impl SubmitCommentHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for SubmitCommentHandler {
    fn intent(&self) -> Intent {
        Intent::SubmitComment
    }

    fn description(&self) -> &'static str {
        "Submit Reddit Comment"
    }

    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError> {
        let thing_id = params::required_str(params, "thing_id")?;
        let text = params::required_str(params, "text")?;
        let token = self.ctx.access_token().await?;
        let result = self
            .ctx
            .checked(self.ctx.reddit.submit_comment(&token, &thing_id, &text).await)
            .await?;
        to_data(&accepted(result)?)
    }
}

// ─── vote ───────────────────────────────────────────────────────────────────

/// Vote on `thing_id`. `direction` is 1, 0 or -1 and defaults to 1.
pub struct VoteHandler {
    ctx: HandlerContext,
}

impl VoteHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Handler for VoteHandler {
    fn intent(&self) -> Intent {
        Intent::Vote
    }

    fn description(&self) -> &'static str {
        "Vote on Reddit Submission"
    }

    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError> {
        let thing_id = params::required_str(params, "thing_id")?;
        let direction = match params::optional_str(params, "direction") {
            None => VoteDirection::Up,
            Some(raw) => {
                VoteDirection::parse(&raw).ok_or_else(|| HandlerError::InvalidParameter {
                    name: "direction".into(),
                    reason: format!("expected 1, 0 or -1, got '{raw}'"),
                })?
            }
        };
        let token = self.ctx.access_token().await?;
        let result = self
            .ctx
            .checked(self.ctx.reddit.vote(&token, &thing_id, direction).await)
            .await?;
        to_data(&accepted(result)?)
    }
}

// ─── generate_content ───────────────────────────────────────────────────────

/// First half of the `generate_content → submit_post` chain.
///
/// Produces `{title, text}` for the router to merge into the parameters of
/// the submission that follows. Requires `prompt` and `subreddit`.
pub struct GenerateContentHandler {
    generator: Arc<dyn ContentGenerator>,
}

impl GenerateContentHandler {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Handler for GenerateContentHandler {
    fn intent(&self) -> Intent {
        Intent::GenerateContent
    }

    fn description(&self) -> &'static str {
        "Generate Post Content"
    }

    async fn call(&self, params: &Parameters) -> Result<Value, HandlerError> {
        let prompt = params::required_str(params, "prompt")?;
        let subreddit = subreddit_name(&params::required_str(params, "subreddit")?)?;
        let content = self
            .generator
            .generate(&prompt, &subreddit)
            .await
            .map_err(|e| HandlerError::Generation {
                reason: e.to_string(),
            })?;
        to_data(&content)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{context_with_credentials, FakeGenerator, FakeReddit};
    use serde_json::json;

    fn params(v: Value) -> Parameters {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn submit_post_defaults_flags() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = SubmitPostHandler::new(ctx)
            .handle(&params(json!({"subreddit": "test", "title": "Hello", "text": "World"})))
            .await;
        assert!(!result.is_error());
        assert_eq!(result.data["success"], true);
        assert_eq!(reddit.calls(), vec!["submit_post:test:Hello:World:false:false"]);
    }

    #[tokio::test]
    async fn submit_post_accepts_content_alias_and_string_flags() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        SubmitPostHandler::new(ctx)
            .handle(&params(json!({
                "subreddit": "r/test", "title": "Hello", "content": "World", "nsfw": "true"
            })))
            .await;
        assert_eq!(reddit.calls(), vec!["submit_post:test:Hello:World:true:false"]);
    }

    #[tokio::test]
    async fn submit_post_missing_title_is_error() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = SubmitPostHandler::new(ctx)
            .handle(&params(json!({"subreddit": "test", "text": "World"})))
            .await;
        assert!(result.is_error());
        assert!(reddit.calls().is_empty());
    }

    #[tokio::test]
    async fn rejected_submission_is_error() {
        let reddit = Arc::new(FakeReddit::rejecting());
        let ctx = context_with_credentials(reddit.clone()).await;
        let result = SubmitPostHandler::new(ctx)
            .handle(&params(json!({"subreddit": "nope", "title": "t", "text": "x"})))
            .await;
        assert!(result.is_error());
    }

    #[tokio::test]
    async fn vote_direction_default_and_validation() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let handler = VoteHandler::new(ctx);

        assert!(!handler.handle(&params(json!({"thing_id": "t3_a"}))).await.is_error());
        assert!(!handler
            .handle(&params(json!({"thing_id": "t3_b", "direction": -1})))
            .await
            .is_error());
        assert!(handler
            .handle(&params(json!({"thing_id": "t3_c", "direction": 5})))
            .await
            .is_error());
        assert_eq!(reddit.calls(), vec!["vote:t3_a:1", "vote:t3_b:-1"]);
    }

    #[tokio::test]
    async fn submit_comment_requires_text() {
        let reddit = Arc::new(FakeReddit::default());
        let ctx = context_with_credentials(reddit.clone()).await;
        let handler = SubmitCommentHandler::new(ctx);
        assert!(handler.handle(&params(json!({"thing_id": "t3_a"}))).await.is_error());
        assert!(!handler
            .handle(&params(json!({"thing_id": "t3_a", "text": "nice"})))
            .await
            .is_error());
        assert_eq!(reddit.calls(), vec!["submit_comment:t3_a:nice"]);
    }

    #[tokio::test]
    async fn generate_content_returns_title_and_text() {
        let generator = Arc::new(FakeGenerator::new("Generated title", "Generated body"));
        let result = GenerateContentHandler::new(generator.clone())
            .handle(&params(json!({"prompt": "rust tips", "subreddit": "rust"})))
            .await;
        assert_eq!(
            result.data,
            json!({"title": "Generated title", "text": "Generated body"})
        );
        assert_eq!(generator.prompts(), vec!["rust tips@rust"]);
    }

    #[tokio::test]
    async fn generate_content_failure_is_error() {
        let generator = Arc::new(FakeGenerator::failing());
        let result = GenerateContentHandler::new(generator)
            .handle(&params(json!({"prompt": "x", "subreddit": "rust"})))
            .await;
        assert!(result.is_error());
    }
}
