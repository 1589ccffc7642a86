//! Application configuration loading.
//!
//! Reads `config/agent.yaml` and resolves environment variables. The file is
//! the single source of truth for Reddit app credentials, the authorization
//! polling budget, credential TTLs and the model registry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::inference::ModelsConfig;

/// Environment variable that overrides config discovery.
pub const CONFIG_ENV_VAR: &str = "REDDIT_AGENT_CONFIG";

/// Config file location relative to the project root.
const CONFIG_RELATIVE_PATH: &str = "config/agent.yaml";

/// Upper bound for any credential TTL (30 days).
pub const MAX_TTL_SECS: u64 = 30 * 24 * 60 * 60;

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Errors raised while locating or parsing the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file in the env override or any ancestor directory.
    #[error("could not find config/agent.yaml (set REDDIT_AGENT_CONFIG to override)")]
    NotFound,

    #[error("failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("failed to parse config: {reason}")]
    Parse { reason: String },

    /// The file parsed but a value is unusable.
    #[error("invalid config: {reason}")]
    Invalid { reason: String },
}

// ─── Public Types ────────────────────────────────────────────────────────────

/// Top-level agent configuration (mirrors `config/agent.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub reddit: RedditConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    pub models: ModelsConfig,
    /// Optional allowlist of intents to expose.
    ///
    /// When set, handlers for intents not listed are dropped from the
    /// registry and requests classified into them take the error path.
    ///
    /// Default: `None` (every intent is served).
    #[serde(default)]
    pub enabled_intents: Option<Vec<String>>,
}

/// Reddit OAuth application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    pub client_id: String,
    /// Empty for "installed app" registrations.
    #[serde(default)]
    pub client_secret: String,
    pub redirect_uri: String,
    /// Used to build the `User-Agent` header (`{app_name}/0.1`).
    #[serde(default = "default_app_name")]
    pub app_name: String,
    /// Opaque value echoed back by the authorization callback.
    pub state: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// `temporary` or `permanent`.
    #[serde(default = "default_duration")]
    pub duration: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_auth_base_url")]
    pub auth_base_url: String,
}

fn default_app_name() -> String {
    "reddit-agent".into()
}
fn default_scopes() -> Vec<String> {
    ["identity", "read", "history", "mysubreddits", "submit", "vote"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_duration() -> String {
    "temporary".into()
}
fn default_api_base_url() -> String {
    "https://oauth.reddit.com".into()
}
fn default_auth_base_url() -> String {
    "https://www.reddit.com".into()
}

/// Authorization-code polling budget.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

fn default_poll_interval_secs() -> u64 {
    10
}
fn default_max_poll_attempts() -> u32 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl AuthConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Which credential store implementation backs the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialBackend {
    /// Process-local; credentials vanish on exit.
    #[default]
    Memory,
    /// SQLite file under the data directory (or `credentials.path`).
    Sqlite,
}

/// Credential store selection and per-key TTLs.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub backend: CredentialBackend,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default = "default_short_ttl_secs")]
    pub auth_code_ttl_secs: u64,
    #[serde(default = "default_long_ttl_secs")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_long_ttl_secs")]
    pub username_ttl_secs: u64,
    #[serde(default = "default_short_ttl_secs")]
    pub permission_ttl_secs: u64,
}

fn default_short_ttl_secs() -> u64 {
    300
}
fn default_long_ttl_secs() -> u64 {
    3600
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            backend: CredentialBackend::default(),
            path: None,
            auth_code_ttl_secs: default_short_ttl_secs(),
            access_token_ttl_secs: default_long_ttl_secs(),
            username_ttl_secs: default_long_ttl_secs(),
            permission_ttl_secs: default_short_ttl_secs(),
        }
    }
}

// ─── Loading ─────────────────────────────────────────────────────────────────

/// Locate the config file.
///
/// Checks `REDDIT_AGENT_CONFIG` first (a file path), then searches upward
/// from `start` for `config/agent.yaml`.
pub fn find_config_path(start: &Path) -> Result<PathBuf, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(expand_tilde(&path));
        if candidate.exists() {
            return Ok(candidate);
        }
        tracing::warn!(
            path = %candidate.display(),
            "REDDIT_AGENT_CONFIG points at a missing file"
        );
    }

    let mut dir = start.to_path_buf();
    loop {
        let candidate = dir.join(CONFIG_RELATIVE_PATH);
        if candidate.exists() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(ConfigError::NotFound)
}

/// Load, interpolate and validate the configuration file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let config = parse_config(&raw)?;
    tracing::info!(
        path = %path.display(),
        backend = ?config.credentials.backend,
        active_model = %config.models.active_model,
        "loaded agent config"
    );
    Ok(config)
}

/// Parse config text. Performs `${VAR}` / `${VAR:-default}` interpolation.
pub fn parse_config(raw: &str) -> Result<AppConfig, ConfigError> {
    let interpolated = interpolate_env_vars(raw);

    let config: AppConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), ConfigError> {
    if config.reddit.client_id.trim().is_empty() {
        return Err(ConfigError::Invalid {
            reason: "reddit.client_id is empty".into(),
        });
    }
    if config.reddit.state.trim().is_empty() {
        return Err(ConfigError::Invalid {
            reason: "reddit.state is empty".into(),
        });
    }
    if config.auth.max_poll_attempts == 0 {
        return Err(ConfigError::Invalid {
            reason: "auth.max_poll_attempts must be at least 1".into(),
        });
    }
    let creds = &config.credentials;
    for (name, secs) in [
        ("auth_code_ttl_secs", creds.auth_code_ttl_secs),
        ("access_token_ttl_secs", creds.access_token_ttl_secs),
        ("username_ttl_secs", creds.username_ttl_secs),
        ("permission_ttl_secs", creds.permission_ttl_secs),
    ] {
        if secs > MAX_TTL_SECS {
            return Err(ConfigError::Invalid {
                reason: format!("credentials.{name} must be at most {MAX_TTL_SECS}"),
            });
        }
    }
    Ok(())
}

// ─── Env-var interpolation ───────────────────────────────────────────────────

/// Replace `${VAR}` and `${VAR:-default}` in a string.
fn interpolate_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let mut var_expr = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_expr.push(c);
            }
            result.push_str(&resolve_var_expr(&var_expr));
        } else {
            result.push(ch);
        }
    }

    result
}

/// Resolve a variable expression like `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> String {
    match expr.split_once(":-") {
        Some((var_name, default)) => {
            std::env::var(var_name).unwrap_or_else(|_| expand_tilde(default))
        }
        None => std::env::var(expr).unwrap_or_default(),
    }
}

/// Expand a leading `~` to the user's home directory.
pub(crate) fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.display());
        }
    }
    path.to_string()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
