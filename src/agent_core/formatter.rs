//! Response Formatter Adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent_core::errors::AgentError;
use crate::agent_core::prompts;
use crate::inference::{InferenceClient, SamplingOverrides};

/// Turns a handler's output into the text shown to the user.
#[async_trait]
pub trait ResponseFormatter: Send + Sync {
    /// `data` is `None` when no handler ran (the `unknown` intent).
    async fn format(
        &self,
        intent: &str,
        data: Option<&Value>,
        description: &str,
    ) -> Result<String, AgentError>;
}

/// [`ResponseFormatter`] backed by the chat-completion client.
pub struct LlmResponseFormatter {
    client: Arc<InferenceClient>,
}

impl LlmResponseFormatter {
    pub fn new(client: Arc<InferenceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResponseFormatter for LlmResponseFormatter {
    async fn format(
        &self,
        intent: &str,
        data: Option<&Value>,
        description: &str,
    ) -> Result<String, AgentError> {
        let messages = prompts::formatter_messages(intent, data, description);
        let sampling = SamplingOverrides {
            temperature: Some(0.3),
            top_p: Some(0.9),
            json_output: true,
        };

        let completion = self
            .client
            .chat_completion(messages, sampling)
            .await
            .map_err(|e| AgentError::FormattingFailure {
                reason: e.to_string(),
            })?;

        let raw = completion.content.unwrap_or_default();
        let text = response_text(&raw);
        if text.is_empty() {
            return Err(AgentError::FormattingFailure {
                reason: "formatter produced an empty response".into(),
            });
        }
        Ok(text)
    }
}

/// The `response` field of a `{"response": …}` answer, or the raw text when
/// the model ignored the JSON instruction.
pub fn response_text(raw: &str) -> String {
    if let Ok(object) = crate::inference::parse_json_object(raw) {
        if let Some(Value::String(text)) = object.get("response") {
            return text.trim().to_string();
        }
    }
    raw.trim().to_string()
}
