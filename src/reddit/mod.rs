//! Reddit backend — the operations the handlers call.
//!
//! - `client` — reqwest implementation of [`RedditApi`] against `oauth.reddit.com`
//! - `auth` — authorize URL, redirect parsing and callback recording
//! - `types` — wire types and the shaped records handed to the formatter
//! - `errors` — [`RedditError`]
//!
//! The trait is the seam: the bootstrap sequencer and every handler depend on
//! `Arc<dyn RedditApi>`, and tests substitute a recording fake.

pub mod auth;
pub mod client;
pub mod errors;
pub mod types;

use async_trait::async_trait;

pub use client::RedditClient;
pub use errors::RedditError;
pub use types::{
    AccessToken, KarmaEntry, NewPost, Page, PostComment, PostSummary, SearchResult, Sort,
    SubmissionResult, SubscribedSubreddit, Trophy, UserComment, UserInfo, UserPost, VoteDirection,
};

/// One method per backend operation.
#[async_trait]
pub trait RedditApi: Send + Sync {
    /// Trade an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, RedditError>;

    /// `GET /api/v1/me`, used both to validate a token and for `user_info`.
    async fn identity(&self, token: &str) -> Result<UserInfo, RedditError>;

    async fn karma(&self, token: &str) -> Result<Vec<KarmaEntry>, RedditError>;

    async fn trophies(&self, token: &str) -> Result<Vec<Trophy>, RedditError>;

    async fn subreddit_posts(
        &self,
        token: &str,
        subreddit: &str,
        page: &Page,
    ) -> Result<Vec<PostSummary>, RedditError>;

    async fn user_posts(&self, token: &str, username: &str) -> Result<Vec<UserPost>, RedditError>;

    async fn user_comments(
        &self,
        token: &str,
        username: &str,
    ) -> Result<Vec<UserComment>, RedditError>;

    /// Site-wide search, or restricted to `subreddit` when given.
    async fn search(
        &self,
        token: &str,
        query: &str,
        subreddit: Option<&str>,
        page: &Page,
    ) -> Result<Vec<SearchResult>, RedditError>;

    async fn submit_post(&self, token: &str, post: &NewPost)
        -> Result<SubmissionResult, RedditError>;

    /// Reply to a post or comment identified by its fullname.
    async fn submit_comment(
        &self,
        token: &str,
        thing_id: &str,
        text: &str,
    ) -> Result<SubmissionResult, RedditError>;

    async fn vote(
        &self,
        token: &str,
        thing_id: &str,
        direction: VoteDirection,
    ) -> Result<SubmissionResult, RedditError>;

    /// Top-level comments of a post.
    async fn post_comments(
        &self,
        token: &str,
        subreddit: &str,
        post_id: &str,
        page: &Page,
    ) -> Result<Vec<PostComment>, RedditError>;

    async fn subscribed_subreddits(
        &self,
        token: &str,
        limit: u32,
    ) -> Result<Vec<SubscribedSubreddit>, RedditError>;
}
