//! OAuth authorization-code plumbing.
//!
//! The bootstrap sequencer hands [`authorize_url`] to the user and then polls
//! the credential store. Whatever receives the browser redirect (the CLI's
//! paste prompt, or an HTTP route in a server deployment) reports it through
//! [`record_authorization_callback`], which writes exactly what the poller
//! looks for.

use reqwest::Url;

use super::errors::RedditError;
use crate::config::RedditConfig;
use crate::credentials::{
    fingerprint, CredentialStore, CredentialTtls, PermissionFlag, StoreError, AUTH_CODE_KEY,
    PERMISSION_KEY,
};

/// Query parameters Reddit appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    /// e.g. `access_denied` when the user clicked "Decline".
    pub error: Option<String>,
}

/// What a callback did to the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Code stored and permission granted.
    Granted,
    /// The user declined; permission recorded as denied.
    Denied { reason: String },
    /// State mismatch or missing code; nothing written.
    Rejected { reason: String },
}

/// Build the consent URL the user must open.
pub fn authorize_url(config: &RedditConfig) -> Result<Url, RedditError> {
    let base = format!(
        "{}/api/v1/authorize",
        config.auth_base_url.trim_end_matches('/')
    );
    let scope = config.scopes.join(" ");
    Url::parse_with_params(
        &base,
        &[
            ("client_id", config.client_id.as_str()),
            ("response_type", "code"),
            ("state", config.state.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("duration", config.duration.as_str()),
            ("scope", scope.as_str()),
        ],
    )
    .map_err(|e| RedditError::Config {
        reason: format!("invalid auth_base_url '{base}': {e}"),
    })
}

/// Extract callback parameters from a full redirect URL.
pub fn parse_redirect_url(raw: &str) -> Result<CallbackParams, RedditError> {
    let url = Url::parse(raw.trim()).map_err(|e| RedditError::Config {
        reason: format!("not a redirect URL: {e}"),
    })?;
    let mut params = CallbackParams::default();
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => params.code = Some(value.into_owned()),
            "state" => params.state = Some(value.into_owned()),
            "error" => params.error = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok(params)
}

/// Record the outcome of the user's consent decision.
///
/// - `error` present: `user_permission = "false"` so the poller fails fast.
/// - `state` differs from `expected_state`, or no `code`: rejected, the store
///   is untouched and the poller keeps waiting.
/// - otherwise: `reddit_auth_code = code` and `user_permission = "true"`.
pub async fn record_authorization_callback(
    store: &dyn CredentialStore,
    params: &CallbackParams,
    expected_state: &str,
    ttls: &CredentialTtls,
) -> Result<CallbackOutcome, StoreError> {
    if let Some(error) = &params.error {
        tracing::warn!(error = %error, "authorization declined at consent screen");
        store
            .set(PERMISSION_KEY, PermissionFlag::Denied.as_str(), ttls.permission)
            .await?;
        return Ok(CallbackOutcome::Denied {
            reason: error.clone(),
        });
    }

    if params.state.as_deref() != Some(expected_state) {
        tracing::warn!("authorization callback state mismatch, ignoring");
        return Ok(CallbackOutcome::Rejected {
            reason: "state parameter does not match".into(),
        });
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        tracing::warn!("authorization callback without a code, ignoring");
        return Ok(CallbackOutcome::Rejected {
            reason: "no authorization code in callback".into(),
        });
    };

    // Code first: the poller treats "true" without a code as still pending.
    store.set(AUTH_CODE_KEY, code, ttls.auth_code).await?;
    store
        .set(PERMISSION_KEY, PermissionFlag::Granted.as_str(), ttls.permission)
        .await?;
    tracing::info!(code = %fingerprint(code), "authorization code recorded");
    Ok(CallbackOutcome::Granted)
}
