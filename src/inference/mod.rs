//! Inference Client — OpenAI-compatible chat-completion client.
//!
//! Every language-model call the agent makes goes through here:
//! - Non-streaming chat completions with a model fallback chain
//! - JSON-object extraction and repair for structured answers
//! - Model configuration (the `models` section of `config/agent.yaml`)
//!
//! The client speaks the OpenAI Chat Completions API, so switching between a
//! hosted model and a local runtime is a config change, not a code change.

pub mod client;
pub mod config;
pub mod errors;
pub mod json_output;
pub mod types;

// Re-exports for convenience
pub use client::InferenceClient;
pub use config::{ModelConfig, ModelsConfig};
pub use errors::InferenceError;
pub use json_output::parse_json_object;
pub use types::{ChatMessage, Completion, Role, SamplingOverrides};
