//! Model configuration and fallback resolution.
//!
//! The `models` section of `config/agent.yaml` lists every chat model the
//! agent may talk to, which one is active, and the order in which the others
//! are tried when the active endpoint is unreachable.

use std::collections::HashMap;

use serde::Deserialize;

use super::errors::InferenceError;

// ─── Public Types ────────────────────────────────────────────────────────────

/// A single model's runtime configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub display_name: String,
    /// Model identifier sent in the request body. Defaults to the config key.
    #[serde(default)]
    pub model_name: Option<String>,
    /// OpenAI-compatible base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Bearer token for hosted endpoints. Local runtimes leave this unset.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// When `true`, JSON-producing calls send
    /// `response_format: {"type":"json_object"}`.
    #[serde(default)]
    pub force_json_response: bool,
}

fn default_temperature() -> f32 {
    0.2
}
fn default_max_tokens() -> u32 {
    1024
}

/// Model registry (the `models` section of the agent config).
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub active_model: String,
    pub models: HashMap<String, ModelConfig>,
    #[serde(default)]
    pub fallback_chain: Vec<String>,
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// Resolve the active model configuration, respecting the fallback chain.
///
/// Returns `(model_key, ModelConfig)` for the first model present in the
/// config. Connectivity is checked at request time by the client.
pub fn resolve_active_model(
    config: &ModelsConfig,
) -> Result<(String, ModelConfig), InferenceError> {
    if let Some(model) = config.models.get(&config.active_model) {
        return Ok((config.active_model.clone(), model.clone()));
    }

    for key in &config.fallback_chain {
        if let Some(model) = config.models.get(key) {
            tracing::warn!(
                active = %config.active_model,
                fallback = %key,
                "active model missing from config, using fallback"
            );
            return Ok((key.clone(), model.clone()));
        }
    }

    Err(InferenceError::ConfigError {
        reason: format!(
            "active model '{}' not found in config and no fallback available",
            config.active_model
        ),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
        active_model: gpt
        models:
          gpt:
            display_name: "GPT"
            model_name: "gpt-4o-mini"
            base_url: "https://api.openai.com/v1"
            api_key: "sk-test"
          local:
            display_name: "Local"
            base_url: "http://localhost:11434/v1"
        fallback_chain: [gpt, local]
    "#;

    #[test]
    fn test_defaults_applied() {
        let config: ModelsConfig = serde_yaml::from_str(YAML).unwrap();
        let local = config.models.get("local").unwrap();
        assert!(local.api_key.is_none());
        assert!(!local.force_json_response);
        assert_eq!(local.max_tokens, 1024);
    }

    #[test]
    fn test_resolve_active_model() {
        let config: ModelsConfig = serde_yaml::from_str(YAML).unwrap();
        let (key, model) = resolve_active_model(&config).unwrap();
        assert_eq!(key, "gpt");
        assert_eq!(model.model_name.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_resolve_falls_back_when_active_missing() {
        let mut config: ModelsConfig = serde_yaml::from_str(YAML).unwrap();
        config.active_model = "missing".into();
        config.fallback_chain = vec!["nope".into(), "local".into()];
        let (key, _) = resolve_active_model(&config).unwrap();
        assert_eq!(key, "local");
    }

    #[test]
    fn test_resolve_active_model_not_found() {
        let config = ModelsConfig {
            active_model: "nonexistent".into(),
            models: HashMap::new(),
            fallback_chain: vec![],
        };
        assert!(resolve_active_model(&config).is_err());
    }
}
