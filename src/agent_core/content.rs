//! Post generation for the `generate_content` intent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent_core::prompts;
use crate::inference::{InferenceClient, InferenceError, SamplingOverrides};

/// A generated post, ready to be merged into `submit_post` parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub title: String,
    pub text: String,
}

/// Writes a post title and body from a short topic.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, subreddit: &str)
        -> Result<GeneratedContent, InferenceError>;
}

/// [`ContentGenerator`] backed by the chat-completion client.
pub struct LlmContentGenerator {
    client: Arc<InferenceClient>,
}

impl LlmContentGenerator {
    pub fn new(client: Arc<InferenceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(
        &self,
        prompt: &str,
        subreddit: &str,
    ) -> Result<GeneratedContent, InferenceError> {
        let messages = prompts::content_messages(prompt, subreddit);
        let sampling = SamplingOverrides {
            temperature: Some(0.7),
            top_p: Some(0.9),
            json_output: true,
        };
        let object = self
            .client
            .json_completion(messages, sampling)
            .await?;
        let content = content_from_json(object)?;
        tracing::info!(
            subreddit,
            title_chars = content.title.chars().count(),
            text_chars = content.text.chars().count(),
            "generated post content"
        );
        Ok(content)
    }
}

/// Pull `title` and `text` (or `content`/`body`) out of the model's answer.
pub fn content_from_json(mut object: Map<String, Value>) -> Result<GeneratedContent, InferenceError> {
    let mut take = |keys: &[&str]| -> Option<String> {
        keys.iter().find_map(|k| match object.remove(*k) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
    };
    let title = take(&["title"]);
    let text = take(&["text", "content", "body"]);
    match (title, text) {
        (Some(title), Some(text)) => Ok(GeneratedContent { title, text }),
        (title, _) => Err(InferenceError::InvalidJson {
            raw_output: String::new(),
            reason: if title.is_none() {
                "missing 'title'".into()
            } else {
                "missing 'text'".into()
            },
        }),
    }
}
