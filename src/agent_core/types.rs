//! Shared types for the agent core.
//!
//! The intent vocabulary, the per-run [`RequestState`], the router's
//! [`Phase`]s and the [`RunOutcome`] returned to callers.

use std::fmt;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::handlers::HandlerResult;

/// Intent-specific arguments extracted by the classifier.
pub type Parameters = Map<String, Value>;

// ─── Intent ─────────────────────────────────────────────────────────────────

/// A classified action.
///
/// Every variant except `Unknown` and `Error` has a handler. `Error` is
/// synthetic: it labels runs that took the error path and is never produced
/// by parsing classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "&'static str")]
pub enum Intent {
    UserInfo,
    UserKarma,
    UserTrophies,
    UserPosts,
    UserComments,
    SubscribedSubreddits,
    SubredditPosts,
    RedditSearch,
    SubmitPost,
    GenerateContent,
    SubmitComment,
    Vote,
    PostComments,
    Unknown,
    Error,
}

impl Intent {
    /// Every intent that is dispatched to a handler.
    pub const HANDLED: [Intent; 13] = [
        Intent::UserInfo,
        Intent::UserKarma,
        Intent::UserTrophies,
        Intent::UserPosts,
        Intent::UserComments,
        Intent::SubscribedSubreddits,
        Intent::SubredditPosts,
        Intent::RedditSearch,
        Intent::SubmitPost,
        Intent::GenerateContent,
        Intent::SubmitComment,
        Intent::Vote,
        Intent::PostComments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Intent::UserInfo => "user_info",
            Intent::UserKarma => "user_karma",
            Intent::UserTrophies => "user_trophies",
            Intent::UserPosts => "user_posts",
            Intent::UserComments => "user_comments",
            Intent::SubscribedSubreddits => "subscribed_subreddits",
            Intent::SubredditPosts => "subreddit_posts",
            Intent::RedditSearch => "reddit_search",
            Intent::SubmitPost => "submit_post",
            Intent::GenerateContent => "generate_content",
            Intent::SubmitComment => "submit_comment",
            Intent::Vote => "vote",
            Intent::PostComments => "post_comments",
            Intent::Unknown => "unknown",
            Intent::Error => "Error",
        }
    }

    /// Exact, case-sensitive match on a classifier label.
    ///
    /// Returns `None` for anything unregistered, including `"Error"`.
    pub fn parse(label: &str) -> Option<Self> {
        if label == Intent::Unknown.as_str() {
            return Some(Intent::Unknown);
        }
        Intent::HANDLED.into_iter().find(|i| i.as_str() == label)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Intent> for &'static str {
    fn from(intent: Intent) -> Self {
        intent.as_str()
    }
}

// ─── RequestState ───────────────────────────────────────────────────────────

/// The mutable record threaded through one orchestration run.
///
/// `prompt` is fixed at construction. `intent` and `final_response` are
/// write-once; later writes are refused and logged.
#[derive(Debug, Clone, Serialize)]
pub struct RequestState {
    prompt: String,
    /// Raw label the classifier produced, before registry resolution.
    classified_label: Option<String>,
    intent: Option<Intent>,
    pub parameters: Parameters,
    pub tool_output: Option<Value>,
    pub description: Option<String>,
    final_response: Option<String>,
}

impl RequestState {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            classified_label: None,
            intent: None,
            parameters: Parameters::new(),
            tool_output: None,
            description: None,
            final_response: None,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn intent(&self) -> Option<Intent> {
        self.intent
    }

    pub fn classified_label(&self) -> Option<&str> {
        self.classified_label.as_deref()
    }

    pub fn final_response(&self) -> Option<&str> {
        self.final_response.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.final_response.is_some()
    }

    /// Store classifier output.
    pub fn record_classification(&mut self, label: String, parameters: Parameters) {
        self.classified_label = Some(label);
        self.parameters = parameters;
    }

    /// Set the intent. Returns `false` (and leaves it unchanged) if already set.
    pub fn set_intent(&mut self, intent: Intent) -> bool {
        if let Some(existing) = self.intent {
            tracing::warn!(%existing, rejected = %intent, "intent already set");
            return false;
        }
        self.intent = Some(intent);
        true
    }

    /// Record a handler's envelope as the current tool output.
    pub fn record_result(&mut self, result: HandlerResult) {
        self.tool_output = Some(result.data);
        self.description = Some(result.description);
    }

    /// Set the final response. Returns `false` if the run already finished.
    pub fn finish(&mut self, response: String) -> bool {
        if self.final_response.is_some() {
            tracing::warn!("final response already set");
            return false;
        }
        self.final_response = Some(response);
        true
    }

    /// The subset of state a follow-up classification may refer to.
    pub fn context_snapshot(&self) -> Value {
        json!({
            "prompt": self.prompt,
            "intent": self.intent.map(Intent::as_str).or(self.classified_label.as_deref()),
            "parameters": self.parameters,
        })
    }
}

// ─── Router phases ──────────────────────────────────────────────────────────

/// States of the dispatch router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "intent", rename_all = "snake_case")]
pub enum Phase {
    Start,
    Classifying,
    Dispatching,
    Executing(Intent),
    Error,
    Formatting,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Executing(intent) => write!(f, "executing<{intent}>"),
            Phase::Start => f.write_str("start"),
            Phase::Classifying => f.write_str("classifying"),
            Phase::Dispatching => f.write_str("dispatching"),
            Phase::Error => f.write_str("error"),
            Phase::Formatting => f.write_str("formatting"),
            Phase::Done => f.write_str("done"),
        }
    }
}

/// Result of one orchestration run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// The user-facing answer. Never empty.
    pub response: String,
    /// Final state, usable as prior context for a follow-up request.
    pub state: RequestState,
    /// Phases visited, in order, starting at `Start` and ending at `Done`.
    pub trace: Vec<Phase>,
}

// ─── Tests ──────────────────────────────────────────────────────────────────
