//! Reddit API error types.

use thiserror::Error;

/// Errors raised by a [`super::RedditApi`] call.
#[derive(Debug, Error)]
pub enum RedditError {
    /// TCP/TLS/HTTP transport failure.
    #[error("connection failed to {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },

    /// The request did not complete within the client timeout.
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// The bearer token was rejected (expired or revoked).
    #[error("access token rejected by {endpoint}")]
    Unauthorized { endpoint: String },

    /// Non-2xx response other than 401.
    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The body was not the JSON shape the endpoint documents.
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    /// The endpoint answered 200 but reported errors in its payload.
    #[error("reddit rejected the request: {}", messages.join("; "))]
    Api { messages: Vec<String> },

    /// Client construction or configuration problem.
    #[error("reddit client config error: {reason}")]
    Config { reason: String },
}

impl RedditError {
    /// Whether the caller should discard its access token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RedditError::Unauthorized { .. })
    }
}
