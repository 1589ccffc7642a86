//! Deterministic fakes shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;

use crate::agent_core::bootstrap::AuthorizationLauncher;
use crate::agent_core::classifier::{Classification, IntentClassifier};
use crate::agent_core::content::{ContentGenerator, GeneratedContent};
use crate::agent_core::errors::AgentError;
use crate::agent_core::formatter::ResponseFormatter;
use crate::agent_core::types::{Parameters, RequestState};
use crate::config::RedditConfig;
use crate::credentials::{CredentialStore, MemoryCredentialStore, ACCESS_TOKEN_KEY, USERNAME_KEY};
use crate::handlers::HandlerContext;
use crate::inference::InferenceError;
use crate::reddit::{
    AccessToken, KarmaEntry, NewPost, Page, PostComment, PostSummary, RedditApi, RedditError,
    SearchResult, SubmissionResult, SubscribedSubreddit, Trophy, UserComment, UserInfo, UserPost,
    VoteDirection,
};

pub fn reddit_config() -> RedditConfig {
    serde_yaml::from_str(
        r#"
        client_id: "test_client"
        redirect_uri: "http://localhost:3000/api/v1/reddit/callback"
        state: "test_state"
        "#,
    )
    .unwrap()
}

/// Handler context over a memory store that already holds a token and
/// username.
pub async fn context_with_credentials(reddit: Arc<FakeReddit>) -> HandlerContext {
    let store: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
    let ttl = Duration::from_secs(3600);
    store.set(ACCESS_TOKEN_KEY, "test_token", ttl).await.unwrap();
    store.set(USERNAME_KEY, "test_user", ttl).await.unwrap();
    HandlerContext::new(store, reddit)
}

// ─── FakeReddit ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ok,
    /// Every call, including the token exchange, fails to connect.
    Failing,
    /// Token-bearing calls answer 401; the exchange still succeeds.
    Unauthorized,
    /// Writes come back with `success: false`.
    Rejecting,
}

/// Recording [`RedditApi`]. Each call is logged as a compact string such as
/// `subreddit_posts:rust:hot:10:-`.
pub struct FakeReddit {
    mode: Mode,
    posts: usize,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeReddit {
    fn default() -> Self {
        Self::with_mode(Mode::Ok)
    }
}

impl FakeReddit {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            posts: 3,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::with_mode(Mode::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::with_mode(Mode::Unauthorized)
    }

    pub fn rejecting() -> Self {
        Self::with_mode(Mode::Rejecting)
    }

    /// Subreddit listings return `n` posts titled `Post 1` … `Post n`.
    pub fn with_posts(n: usize) -> Self {
        Self {
            posts: n,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), RedditError> {
        self.calls.lock().unwrap().push(call.clone());
        match self.mode {
            Mode::Failing => Err(RedditError::Connection {
                endpoint: call,
                reason: "connection refused".into(),
            }),
            Mode::Unauthorized => Err(RedditError::Unauthorized { endpoint: call }),
            Mode::Ok | Mode::Rejecting => Ok(()),
        }
    }

    fn write_result(&self, name: &str) -> SubmissionResult {
        if self.mode == Mode::Rejecting {
            SubmissionResult {
                success: false,
                id: None,
                name: None,
                url: None,
                errors: vec!["SUBREDDIT_NOEXIST: that subreddit doesn't exist".into()],
            }
        } else {
            SubmissionResult {
                success: true,
                id: Some("abc".into()),
                name: Some(name.into()),
                url: Some("https://www.reddit.com/r/test/comments/abc/".into()),
                errors: Vec::new(),
            }
        }
    }
}

fn post(i: usize) -> PostSummary {
    PostSummary {
        title: format!("Post {i}"),
        author: format!("user{i}"),
        subreddit: "r/test".into(),
        url: format!("https://example.com/{i}"),
        thumbnail: "self".into(),
        num_comments: 3,
        score: 100 / i as i64,
        created_utc: 1_700_000_000.0,
        permalink: format!("https://www.reddit.com/r/test/comments/p{i}/"),
        selftext: String::new(),
        is_self: true,
        is_video: false,
        is_gallery: false,
        thing_id: format!("t3_p{i}"),
    }
}

#[async_trait]
impl RedditApi for FakeReddit {
    async fn exchange_code(&self, code: &str) -> Result<AccessToken, RedditError> {
        let call = format!("exchange_code:{code}");
        if self.mode == Mode::Failing {
            self.record(call)?;
        } else {
            self.calls.lock().unwrap().push(call);
        }
        Ok(AccessToken {
            access_token: "fresh_token".into(),
            token_type: "bearer".into(),
            expires_in: Some(3600),
            scope: Some("identity read".into()),
            refresh_token: None,
        })
    }

    async fn identity(&self, _token: &str) -> Result<UserInfo, RedditError> {
        self.record("identity".into())?;
        Ok(UserInfo {
            username: "test_user".into(),
            user_id: "abc123".into(),
            total_karma: 700,
            link_karma: 500,
            comment_karma: 200,
            created_utc: "2020-01-01T00:00:00+00:00".into(),
            has_verified_email: true,
            is_mod: false,
            profile_icon: String::new(),
            profile: None,
        })
    }

    async fn karma(&self, _token: &str) -> Result<Vec<KarmaEntry>, RedditError> {
        self.record("karma".into())?;
        Ok(vec![KarmaEntry {
            subreddit: "rust".into(),
            link_karma: 10,
            comment_karma: 20,
        }])
    }

    async fn trophies(&self, _token: &str) -> Result<Vec<Trophy>, RedditError> {
        self.record("trophies".into())?;
        Ok(vec![Trophy {
            name: "Verified Email".into(),
            description: None,
            award_id: None,
            icon: String::new(),
        }])
    }

    async fn subreddit_posts(
        &self,
        _token: &str,
        subreddit: &str,
        page: &Page,
    ) -> Result<Vec<PostSummary>, RedditError> {
        self.record(format!(
            "subreddit_posts:{subreddit}:{}:{}:{}",
            page.sort.as_str(),
            page.limit,
            page.after.as_deref().unwrap_or("-")
        ))?;
        let n = self.posts.min(page.limit as usize);
        Ok((1..=n).map(post).collect())
    }

    async fn user_posts(&self, _token: &str, username: &str) -> Result<Vec<UserPost>, RedditError> {
        self.record(format!("user_posts:{username}"))?;
        Ok(vec![UserPost {
            title: "My post".into(),
            subreddit: "r/test".into(),
            post_id: "t3_mine".into(),
            permalink: "https://www.reddit.com/r/test/comments/mine/".into(),
            score: 5,
            upvotes: 5,
            upvote_ratio: 1.0,
            num_comments: 0,
            flair: "None".into(),
            nsfw: false,
            spoiler: false,
            locked: false,
            created_utc: "2024-01-01T00:00:00+00:00".into(),
        }])
    }

    async fn user_comments(
        &self,
        _token: &str,
        username: &str,
    ) -> Result<Vec<UserComment>, RedditError> {
        self.record(format!("user_comments:{username}"))?;
        Ok(vec![UserComment {
            comment_id: "t1_c1".into(),
            body: "Nice".into(),
            subreddit: "r/test".into(),
            score: 2,
            permalink: "https://www.reddit.com/r/test/comments/p1/_/c1/".into(),
            post_title: "Post 1".into(),
            post_permalink: "https://www.reddit.com/r/test/comments/p1/".into(),
            created_utc: "2024-01-01T00:00:00+00:00".into(),
            edited: false,
        }])
    }

    async fn search(
        &self,
        _token: &str,
        query: &str,
        subreddit: Option<&str>,
        page: &Page,
    ) -> Result<Vec<SearchResult>, RedditError> {
        self.record(format!(
            "search:{query}:{}:{}:{}",
            subreddit.unwrap_or("-"),
            page.sort.as_str(),
            page.limit
        ))?;
        Ok(vec![SearchResult {
            title: format!("About {query}"),
            subreddit: subreddit.unwrap_or("all").into(),
            author: "user1".into(),
            score: 42,
            upvote_ratio: 0.9,
            num_comments: 7,
            flair: String::new(),
            url: "https://example.com".into(),
            permalink: "https://www.reddit.com/r/all/comments/s1/".into(),
            created_utc: 1_700_000_000.0,
            media: None,
            thumbnail: None,
            thing_id: "t3_s1".into(),
        }])
    }

    async fn submit_post(
        &self,
        _token: &str,
        post: &NewPost,
    ) -> Result<SubmissionResult, RedditError> {
        self.record(format!(
            "submit_post:{}:{}:{}:{}:{}",
            post.subreddit, post.title, post.text, post.nsfw, post.spoiler
        ))?;
        Ok(self.write_result("t3_abc"))
    }

    async fn submit_comment(
        &self,
        _token: &str,
        thing_id: &str,
        text: &str,
    ) -> Result<SubmissionResult, RedditError> {
        self.record(format!("submit_comment:{thing_id}:{text}"))?;
        Ok(self.write_result("t1_abc"))
    }

    async fn vote(
        &self,
        _token: &str,
        thing_id: &str,
        direction: VoteDirection,
    ) -> Result<SubmissionResult, RedditError> {
        self.record(format!("vote:{thing_id}:{}", direction.as_dir()))?;
        Ok(self.write_result(thing_id))
    }

    async fn post_comments(
        &self,
        _token: &str,
        subreddit: &str,
        post_id: &str,
        page: &Page,
    ) -> Result<Vec<PostComment>, RedditError> {
        self.record(format!("post_comments:{subreddit}:{post_id}:{}", page.limit))?;
        Ok(vec![PostComment {
            author: "user2".into(),
            body: "First".into(),
            score: 3,
            created_utc: 1_700_000_000.0,
            thing_id: "t1_c1".into(),
            permalink: "https://www.reddit.com/r/rust/comments/abc/_/c1/".into(),
        }])
    }

    async fn subscribed_subreddits(
        &self,
        _token: &str,
        limit: u32,
    ) -> Result<Vec<SubscribedSubreddit>, RedditError> {
        self.record(format!("subscribed_subreddits:{limit}"))?;
        Ok(vec![SubscribedSubreddit {
            name: "rust".into(),
            thing_id: "t5_2s7lj".into(),
            title: "The Rust Programming Language".into(),
            subscribers: 300_000,
            description: String::new(),
            created: "2010-01-01T00:00:00+00:00".into(),
            submission_type: "any".into(),
            user_is_subscriber: true,
        }])
    }
}

// ─── Model-side fakes ───────────────────────────────────────────────────────

/// Classifier that always gives the same answer (or always fails) and records
/// `(prompt, prior prompt)` for each call.
pub struct FakeClassifier {
    answer: Option<(String, Parameters)>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl FakeClassifier {
    pub fn returning(label: &str, parameters: Value) -> Self {
        let parameters = match parameters {
            Value::Object(map) => map,
            _ => Parameters::new(),
        };
        Self {
            answer: Some((label.to_string(), parameters)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IntentClassifier for FakeClassifier {
    async fn classify(
        &self,
        prompt: &str,
        prior: Option<&RequestState>,
    ) -> Result<Classification, AgentError> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), prior.map(|p| p.prompt().to_string())));
        match &self.answer {
            Some((label, parameters)) => Ok(Classification {
                label: label.clone(),
                parameters: parameters.clone(),
            }),
            None => Err(AgentError::ClassificationFailure {
                reason: "model unavailable".into(),
            }),
        }
    }
}

/// One recorded formatter invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCall {
    pub intent: String,
    pub data: Option<Value>,
    pub description: String,
}

#[derive(Debug, Clone, Copy)]
enum FormatMode {
    Echo,
    Failing,
    Empty,
}

/// Formatter answering `formatted {intent}`, failing, or answering nothing.
pub struct FakeFormatter {
    mode: FormatMode,
    calls: Mutex<Vec<FormatCall>>,
}

impl FakeFormatter {
    fn with_mode(mode: FormatMode) -> Self {
        Self {
            mode,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::with_mode(FormatMode::Echo)
    }

    pub fn failing() -> Self {
        Self::with_mode(FormatMode::Failing)
    }

    pub fn empty() -> Self {
        Self::with_mode(FormatMode::Empty)
    }

    pub fn calls(&self) -> Vec<FormatCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseFormatter for FakeFormatter {
    async fn format(
        &self,
        intent: &str,
        data: Option<&Value>,
        description: &str,
    ) -> Result<String, AgentError> {
        self.calls.lock().unwrap().push(FormatCall {
            intent: intent.to_string(),
            data: data.cloned(),
            description: description.to_string(),
        });
        match self.mode {
            FormatMode::Echo => Ok(format!("formatted {intent}")),
            FormatMode::Failing => Err(AgentError::FormattingFailure {
                reason: "model unavailable".into(),
            }),
            FormatMode::Empty => Ok("   ".into()),
        }
    }
}

/// Generator with a fixed answer; records `prompt@subreddit`.
pub struct FakeGenerator {
    content: Option<GeneratedContent>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn new(title: &str, text: &str) -> Self {
        Self {
            content: Some(GeneratedContent {
                title: title.into(),
                text: text.into(),
            }),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            content: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate(
        &self,
        prompt: &str,
        subreddit: &str,
    ) -> Result<GeneratedContent, InferenceError> {
        self.prompts
            .lock()
            .unwrap()
            .push(format!("{prompt}@{subreddit}"));
        self.content.clone().ok_or(InferenceError::Timeout { duration_secs: 30 })
    }
}

/// Launcher that only records the URLs it was asked to open.
#[derive(Default)]
pub struct RecordingLauncher {
    urls: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationLauncher for RecordingLauncher {
    async fn launch(&self, url: &Url) -> Result<(), AgentError> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
