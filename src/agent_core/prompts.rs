//! Prompt construction for the classifier, formatter and content generator.

use serde_json::Value;

use crate::agent_core::types::Intent;
use crate::inference::ChatMessage;

/// What the classifier is told about one intent.
#[derive(Debug, Clone, Copy)]
pub struct IntentSpec {
    pub intent: Intent,
    pub summary: &'static str,
    pub required: &'static [&'static str],
    pub optional: &'static [&'static str],
}

const NONE: &[&str] = &[];
const PAGING: &[&str] = &["sort", "limit", "after"];

/// Classifier-facing description of an intent.
pub fn intent_spec(intent: Intent) -> IntentSpec {
    let spec = |summary: &'static str,
                required: &'static [&'static str],
                optional: &'static [&'static str]| IntentSpec {
        intent,
        summary,
        required,
        optional,
    };
    match intent {
        Intent::UserInfo => spec("profile of the signed-in user", NONE, NONE),
        Intent::UserKarma => spec("karma breakdown per subreddit for the signed-in user", NONE, NONE),
        Intent::UserTrophies => spec("trophies awarded to the signed-in user", NONE, NONE),
        Intent::UserPosts => spec("posts submitted by the signed-in user", NONE, NONE),
        Intent::UserComments => spec("comments written by the signed-in user", NONE, NONE),
        Intent::SubscribedSubreddits => spec(
            "subreddits the signed-in user is subscribed to",
            NONE,
            &["limit"],
        ),
        Intent::SubredditPosts => spec("posts from one subreddit", &["subreddit"], PAGING),
        Intent::RedditSearch => spec(
            "search posts site-wide or within one subreddit",
            &["query"],
            &["sort", "limit", "after", "subreddit"],
        ),
        Intent::SubmitPost => spec(
            "submit a text post the user has written out",
            &["subreddit", "title", "text"],
            &["nsfw", "spoiler"],
        ),
        Intent::GenerateContent => spec(
            "write a new post about a topic and submit it",
            &["prompt", "subreddit"],
            NONE,
        ),
        Intent::SubmitComment => spec(
            "reply to a post or comment by its id (t3_… or t1_…)",
            &["thing_id", "text"],
            NONE,
        ),
        Intent::Vote => spec(
            "upvote (1), clear (0) or downvote (-1) a post or comment",
            &["thing_id"],
            &["direction"],
        ),
        Intent::PostComments => spec(
            "top-level comments under one post",
            &["post_id", "subreddit"],
            PAGING,
        ),
        Intent::Unknown | Intent::Error => spec("not a supported request", NONE, NONE),
    }
}

fn param_list(names: &[&str]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names
            .iter()
            .map(|n| format!("\"{n}\""))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// ─── Classifier ─────────────────────────────────────────────────────────────

/// System prompt listing the enabled intents and their parameters.
pub fn classifier_system_prompt(intents: &[Intent]) -> String {
    let lines: Vec<String> = intents
        .iter()
        .map(|i| {
            let spec = intent_spec(*i);
            format!(
                "- \"{}\": {}. Required: {}. Optional: {}.",
                i.as_str(),
                spec.summary,
                param_list(spec.required),
                param_list(spec.optional)
            )
        })
        .collect();

    format!(
        "You route Reddit requests. Read the user's message and pick exactly one intent \
         from the list below, then extract its parameters.\n\n\
         Intents:\n{}\n\n\
         Rules:\n\
         - Answer with one JSON object: {{\"intent\": \"<name>\", \"parameters\": {{...}}}}.\n\
         - Use the intent names exactly as written.\n\
         - Subreddit names go without the r/ prefix.\n\
         - Leave out parameters the message does not mention. Never invent values.\n\
         - If nothing fits, answer {{\"intent\": \"unknown\", \"parameters\": {{}}}}.\n\n\
         Examples:\n\
         \"top 5 posts of r/technology\" -> \
         {{\"intent\": \"subreddit_posts\", \"parameters\": {{\"subreddit\": \"technology\", \"sort\": \"top\", \"limit\": 5}}}}\n\
         \"what's the weather?\" -> {{\"intent\": \"unknown\", \"parameters\": {{}}}}",
        lines.join("\n")
    )
}

/// Messages for one classification. `prior` is the previous run's context
/// snapshot, included so follow-ups like "now only the top 3" resolve.
pub fn classifier_messages(
    intents: &[Intent],
    prompt: &str,
    prior: Option<&Value>,
) -> Vec<ChatMessage> {
    let user = match prior {
        Some(prior) => format!("Previous request: {prior}\n\nMessage: {prompt}"),
        None => format!("Message: {prompt}"),
    };
    vec![
        ChatMessage::system(classifier_system_prompt(intents)),
        ChatMessage::user(user),
    ]
}

// ─── Formatter ──────────────────────────────────────────────────────────────

const FORMATTER_SYSTEM_PROMPT: &str = "You turn raw Reddit API results into a short, friendly answer.\n\
     - Summarize only what is in the data. Never invent posts, numbers or users.\n\
     - Lists: number the items and keep each to one line (title, author, score).\n\
     - Writes (submit_post, submit_comment, vote): say whether it worked and give the link or id.\n\
     - If the data is the string \"error\", apologize briefly and say the Reddit request failed.\n\
     - If the intent is \"unknown\" or the data is null, say you couldn't help with that \
       and mention what you can do (read posts, search, show the user's account, post).\n\
     - If the intent is \"Error\", explain the request could not be matched to a Reddit action.\n\
     Answer with a JSON object: {\"response\": \"<text>\"}.";

/// Limit on the serialized tool output handed to the formatter.
const MAX_FORMATTER_DATA_CHARS: usize = 12_000;

pub fn formatter_messages(intent: &str, data: Option<&Value>, description: &str) -> Vec<ChatMessage> {
    let data = data.map(Value::to_string).unwrap_or_else(|| "null".into());
    let data = truncate_chars(&data, MAX_FORMATTER_DATA_CHARS);
    vec![
        ChatMessage::system(FORMATTER_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Intent: \"{intent}\"\nOperation: {description}\nData: {data}"
        )),
    ]
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ─── Content generation ─────────────────────────────────────────────────────

const CONTENT_SYSTEM_PROMPT: &str = "You write Reddit posts. Given a topic and a subreddit, \
     write a post that fits the community: a specific title under 300 characters and a \
     body of a few short paragraphs in plain markdown. No hashtags, no emoji spam.\n\
     Answer with a JSON object: {\"title\": \"<title>\", \"text\": \"<body>\"}.";

pub fn content_messages(prompt: &str, subreddit: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(CONTENT_SYSTEM_PROMPT),
        ChatMessage::user(format!("Subreddit: r/{subreddit}\nTopic: {prompt}")),
    ]
}
