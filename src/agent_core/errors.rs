//! Agent Core error types.

use thiserror::Error;

use crate::credentials::StoreError;

/// Errors that can occur during an orchestration run.
///
/// Only the bootstrap variants and `Cancelled` abort a run. Classification
/// and formatting failures are logged and degraded inside the router.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The user declined the authorization request.
    #[error("authorization was declined by the user")]
    AuthDenied,

    /// No permission flag appeared within the polling budget.
    #[error("no authorization response after {attempts} polls")]
    AuthTimeout { attempts: u32 },

    /// The authorization request could not be started.
    #[error("authorization failed: {reason}")]
    AuthorizationFailed { reason: String },

    /// Exchanging the authorization code for an access token failed.
    #[error("token exchange failed: {reason}")]
    TokenExchange { reason: String },

    /// The identity endpoint rejected the token or was unreachable.
    #[error("identity validation failed: {reason}")]
    IdentityValidation { reason: String },

    /// Credential store read or write failed.
    #[error("credential store error: {reason}")]
    CredentialStore { reason: String },

    /// Classifier transport error or malformed classifier output.
    #[error("classification failed: {reason}")]
    ClassificationFailure { reason: String },

    /// Formatter transport error or empty output.
    #[error("formatting failed: {reason}")]
    FormattingFailure { reason: String },

    /// The caller abandoned the run.
    #[error("run cancelled")]
    Cancelled,

    /// Invalid configuration when wiring the agent.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl AgentError {
    /// Text shown to the user when a run aborts before dispatch.
    pub fn user_message(&self) -> String {
        match self {
            AgentError::AuthDenied => {
                "Reddit authorization was declined, so I can't access your account. \
                 Ask again if you change your mind."
                    .to_string()
            }
            AgentError::AuthTimeout { .. } => {
                "I didn't hear back from Reddit authorization in time. Please try again."
                    .to_string()
            }
            AgentError::AuthorizationFailed { .. }
            | AgentError::TokenExchange { .. }
            | AgentError::IdentityValidation { .. } => {
                "I couldn't sign in to Reddit. Please try again.".to_string()
            }
            AgentError::Cancelled => "The request was cancelled.".to_string(),
            other => format!("Something went wrong: {other}"),
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AgentError::AuthDenied | AgentError::Config { .. })
    }
}

impl From<StoreError> for AgentError {
    fn from(e: StoreError) -> Self {
        AgentError::CredentialStore {
            reason: e.to_string(),
        }
    }
}
