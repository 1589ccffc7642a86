//! Intent Classifier Adapter.
//!
//! Turns free text (plus the previous run's state, if any) into a raw intent
//! label and a parameter object. Resolving the label against the registry is
//! the router's job, so the classifier never rejects a label it doesn't know.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::agent_core::errors::AgentError;
use crate::agent_core::prompts;
use crate::agent_core::types::{Intent, Parameters, RequestState};
use crate::inference::{InferenceClient, SamplingOverrides};

/// Raw classifier answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub parameters: Parameters,
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(
        &self,
        prompt: &str,
        prior: Option<&RequestState>,
    ) -> Result<Classification, AgentError>;
}

/// [`IntentClassifier`] backed by the chat-completion client.
pub struct LlmIntentClassifier {
    client: Arc<InferenceClient>,
    intents: Vec<Intent>,
}

impl LlmIntentClassifier {
    /// `intents` is the set offered to the model, normally the registry's.
    pub fn new(client: Arc<InferenceClient>, intents: Vec<Intent>) -> Self {
        Self { client, intents }
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(
        &self,
        prompt: &str,
        prior: Option<&RequestState>,
    ) -> Result<Classification, AgentError> {
        let snapshot = prior.map(RequestState::context_snapshot);
        let messages = prompts::classifier_messages(&self.intents, prompt, snapshot.as_ref());
        let sampling = SamplingOverrides {
            temperature: Some(0.0),
            top_p: None,
            json_output: true,
        };

        let object = self
            .client
            .json_completion(messages, sampling)
            .await
            .map_err(|e| AgentError::ClassificationFailure {
                reason: e.to_string(),
            })?;

        classification_from_json(object)
    }
}

/// Validate the `{intent, parameters}` object.
///
/// `intent` must be a string. Missing or null `parameters` means `{}`; any
/// other non-object value is malformed.
pub fn classification_from_json(
    mut object: Map<String, Value>,
) -> Result<Classification, AgentError> {
    let label = match object.remove("intent") {
        Some(Value::String(label)) => label,
        Some(other) => {
            return Err(AgentError::ClassificationFailure {
                reason: format!("'intent' is not a string: {other}"),
            })
        }
        None => {
            return Err(AgentError::ClassificationFailure {
                reason: "missing 'intent'".into(),
            })
        }
    };

    let parameters = match object.remove("parameters") {
        None | Some(Value::Null) => Parameters::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(AgentError::ClassificationFailure {
                reason: format!("'parameters' is not an object: {other}"),
            })
        }
    };

    Ok(Classification { label, parameters })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_label_and_parameters() {
        let c = classification_from_json(object(json!({
            "intent": "subreddit_posts",
            "parameters": {"subreddit": "technology", "limit": 2}
        })))
        .unwrap();
        assert_eq!(c.label, "subreddit_posts");
        assert_eq!(c.parameters["limit"], 2);
    }

    #[test]
    fn missing_parameters_default_to_empty() {
        let c = classification_from_json(object(json!({"intent": "unknown"}))).unwrap();
        assert!(c.parameters.is_empty());
    }

    #[test]
    fn unregistered_labels_pass_through() {
        let c = classification_from_json(object(json!({"intent": "delete_everything"}))).unwrap();
        assert_eq!(c.label, "delete_everything");
    }

    #[test]
    fn malformed_output_is_failure() {
        assert!(classification_from_json(object(json!({"parameters": {}}))).is_err());
        assert!(classification_from_json(object(json!({"intent": 3}))).is_err());
        assert!(classification_from_json(object(json!({
            "intent": "submit_post",
            "parameters": [{"subreddit": "test"}]
        })))
        .is_err());
    }
}
