//! OpenAI-compatible inference client.
//!
//! Sends non-streaming chat completion requests and walks the fallback chain
//! when the current model is unavailable.

use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::config::{ModelConfig, ModelsConfig};
use super::errors::InferenceError;
use super::json_output::parse_json_object;
use super::types::{ChatCompletionRequest, ChatMessage, Completion, ResponseFormat, SamplingOverrides};

// ─── Constants ───────────────────────────────────────────────────────────────

/// TCP connection timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request timeout for a completion call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ─── InferenceClient ─────────────────────────────────────────────────────────

/// Client for the chat-completion endpoint.
///
/// Holds no per-request state: every call starts at the active model and
/// walks the fallback chain on its own, so one client can be shared by
/// concurrent runs behind a plain `Arc`.
pub struct InferenceClient {
    http: HttpClient,
    /// The full models configuration (for the fallback chain).
    config: ModelsConfig,
    /// The active model key (e.g., "gpt-4o-mini").
    active_model_key: String,
    active_model: ModelConfig,
}

impl InferenceClient {
    /// Create a new inference client from the models configuration.
    ///
    /// Does NOT check connectivity; that happens on the first request.
    pub fn from_config(config: ModelsConfig) -> Result<Self, InferenceError> {
        let (key, model) = super::config::resolve_active_model(&config)?;

        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| InferenceError::ConnectionFailed {
                endpoint: model.base_url.clone(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            active_model_key: key,
            active_model: model,
        })
    }

    /// The display name of the active model.
    pub fn active_model_name(&self) -> &str {
        &self.active_model.display_name
    }

    // ─── Chat Completion ─────────────────────────────────────────────────

    /// Send a non-streaming chat completion request.
    ///
    /// Retriable failures move on to the next model in the fallback chain;
    /// the last error is returned once the chain is exhausted.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        sampling: SamplingOverrides,
    ) -> Result<Completion, InferenceError> {
        let mut attempted = Vec::new();
        let mut last_error: Option<InferenceError> = None;

        for (key, model) in self.model_chain() {
            match self.try_request(key, model, &messages, &sampling).await {
                Ok(completion) => return Ok(completion),
                Err(e) if e.is_retriable() => {
                    tracing::warn!(
                        model = %key,
                        error = %e,
                        "inference request failed, trying next model"
                    );
                    attempted.push(key.to_string());
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(InferenceError::AllModelsUnavailable { attempted }))
    }

    /// Run a completion that must answer with a JSON object.
    pub async fn json_completion(
        &self,
        messages: Vec<ChatMessage>,
        sampling: SamplingOverrides,
    ) -> Result<Map<String, Value>, InferenceError> {
        let sampling = SamplingOverrides {
            json_output: true,
            ..sampling
        };
        let completion = self.chat_completion(messages, sampling).await?;
        let content = completion.content.unwrap_or_default();
        parse_json_object(&content)
    }

    /// Attempt a single request to one model.
    async fn try_request(
        &self,
        key: &str,
        model: &ModelConfig,
        messages: &[ChatMessage],
        sampling: &SamplingOverrides,
    ) -> Result<Completion, InferenceError> {
        let url = format!("{}/chat/completions", model.base_url);
        let body = build_request(key, model, messages, sampling);

        tracing::info!(
            url = %url,
            model = %body.model,
            message_count = body.messages.len(),
            json_output = body.response_format.is_some(),
            max_tokens = body.max_tokens,
            "=== LLM REQUEST ==="
        );

        let mut request = self.http.post(&url).json(&body);
        if let Some(api_key) = model.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                InferenceError::Timeout {
                    duration_secs: REQUEST_TIMEOUT.as_secs(),
                }
            } else {
                InferenceError::ConnectionFailed {
                    endpoint: url.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(InferenceError::HttpError {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let body_text = response
            .text()
            .await
            .map_err(|e| InferenceError::MalformedResponse {
                reason: format!("failed to read response body: {e}"),
            })?;

        let completion = parse_completion_response(&body_text)?;
        tracing::info!(
            model = %key,
            content_len = completion.content.as_ref().map(|c| c.len()).unwrap_or(0),
            finish_reason = ?completion.finish_reason,
            "=== LLM RESPONSE ==="
        );
        Ok(completion)
    }

    // ─── Fallback Chain ──────────────────────────────────────────────────

    /// The active model followed by each configured fallback, in order.
    ///
    /// Unknown keys and repeats are skipped, so every model is tried at most
    /// once per request.
    fn model_chain(&self) -> Vec<(&str, &ModelConfig)> {
        let mut chain = vec![(self.active_model_key.as_str(), &self.active_model)];
        for key in &self.config.fallback_chain {
            if chain.iter().any(|(k, _)| *k == key.as_str()) {
                continue;
            }
            if let Some(model) = self.config.models.get(key) {
                chain.push((key.as_str(), model));
            }
        }
        chain
    }
}

fn build_request(
    key: &str,
    model: &ModelConfig,
    messages: &[ChatMessage],
    sampling: &SamplingOverrides,
) -> ChatCompletionRequest {
    let model_name = model.model_name.clone().unwrap_or_else(|| key.to_string());

    let response_format = (sampling.json_output && model.force_json_response).then(|| {
        ResponseFormat {
            r#type: "json_object".to_string(),
        }
    });

    ChatCompletionRequest {
        model: model_name,
        messages: messages.to_vec(),
        temperature: sampling.temperature.unwrap_or(model.temperature),
        top_p: sampling.top_p,
        max_tokens: model.max_tokens,
        stream: false,
        response_format,
    }
}

// ─── Response Parsing ────────────────────────────────────────────────────────

/// Parse a non-streaming `/chat/completions` response body.
pub fn parse_completion_response(body: &str) -> Result<Completion, InferenceError> {
    #[derive(Deserialize)]
    struct CompletionResponse {
        choices: Vec<CompletionChoice>,
    }

    #[derive(Deserialize)]
    struct CompletionChoice {
        message: CompletionMessage,
        finish_reason: Option<String>,
    }

    #[derive(Deserialize)]
    struct CompletionMessage {
        content: Option<String>,
    }

    let resp: CompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::MalformedResponse {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    let choice = resp
        .choices
        .into_iter()
        .next()
        .ok_or(InferenceError::MalformedResponse {
            reason: "empty choices array".into(),
        })?;

    Ok(Completion {
        content: choice.message.content.filter(|c| !c.trim().is_empty()),
        finish_reason: choice.finish_reason,
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
