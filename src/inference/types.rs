//! Shared types for the inference client.
//!
//! These mirror the OpenAI Chat Completions API types, used for both
//! request building and response parsing.

use serde::{Deserialize, Serialize};

// ─── Request Types ───────────────────────────────────────────────────────────

/// A single message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Structured output format hint for the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    /// The format type. Only `"json_object"` is used.
    pub r#type: String,
}

/// Request body for `POST /v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Per-call options.
///
/// Classification wants low temperature and a JSON object back; content
/// generation wants a little more creativity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamplingOverrides {
    /// Override temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: Option<f32>,
    /// Override top_p (nucleus sampling threshold).
    pub top_p: Option<f32>,
    /// Ask for `response_format: json_object` when the model supports it.
    pub json_output: bool,
}

// ─── Response Types ──────────────────────────────────────────────────────────

/// The assistant's answer to a non-streaming completion.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// Message text. `None` when the model returned empty content.
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}
