//! Agent Core — intent-routed orchestration of Reddit requests.
//!
//! Submodules:
//! - `orchestrator`: the dispatch router / per-run state machine
//! - `bootstrap`: credential bootstrap, consent polling, token exchange
//! - `classifier`: free text → `{intent, parameters}`
//! - `formatter`: handler output → user-facing text
//! - `content`: post generation for `generate_content`
//! - `prompts`: prompt construction for the three model calls
//! - `types`: intents, request state, phases
//! - `errors`: agent-level error types

pub mod bootstrap;
pub mod classifier;
pub mod content;
pub mod errors;
pub mod formatter;
pub mod orchestrator;
pub mod prompts;
pub mod types;

// Re-exports for convenience
pub use bootstrap::{AuthorizationLauncher, BootstrapSequencer};
pub use classifier::{Classification, IntentClassifier, LlmIntentClassifier};
pub use content::{ContentGenerator, GeneratedContent, LlmContentGenerator};
pub use errors::AgentError;
pub use formatter::{LlmResponseFormatter, ResponseFormatter};
pub use orchestrator::Orchestrator;
pub use types::{Intent, Parameters, Phase, RequestState, RunOutcome};
