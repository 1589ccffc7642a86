pub mod agent_core;
pub mod config;
pub mod credentials;
pub mod handlers;
pub mod inference;
pub mod reddit;

#[cfg(test)]
mod test_support;

use std::collections::HashSet;
use std::sync::Arc;

use agent_core::{
    AgentError, AuthorizationLauncher, BootstrapSequencer, LlmContentGenerator,
    LlmIntentClassifier, LlmResponseFormatter, Orchestrator,
};
use config::AppConfig;
use credentials::{CredentialStore, CredentialTtls};
use handlers::HandlerContext;
use inference::InferenceClient;
use reddit::{RedditApi, RedditClient};

/// Async mutex for types that require `.await` inside their methods.
pub type TokioMutex<T> = tokio::sync::Mutex<T>;

/// Return the platform-standard data directory for the agent.
///
/// - macOS: `~/Library/Application Support/com.reddit-agent/`
/// - Windows: `{FOLDERID_RoamingAppData}\com.reddit-agent\`
/// - Linux: `$XDG_DATA_HOME/com.reddit-agent/` (fallback `~/.local/share/...`)
///
/// Falls back to `~/.reddit-agent/` only if none of the above can be resolved.
pub(crate) fn data_dir() -> std::path::PathBuf {
    if let Some(dir) = dirs::data_dir() {
        return dir.join("com.reddit-agent");
    }
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".reddit-agent")
}

// ─── Agent wiring ────────────────────────────────────────────────────────────

/// Wire the orchestrator from config.
///
/// `store` is passed in because the front end's authorization callback must
/// write to the same store the sequencer polls. One inference client (and so
/// one fallback position) is shared by the classifier, the formatter and the
/// content generator.
pub fn build_orchestrator(
    config: &AppConfig,
    store: Arc<dyn CredentialStore>,
    launcher: Arc<dyn AuthorizationLauncher>,
) -> Result<Orchestrator, AgentError> {
    let reddit: Arc<dyn RedditApi> =
        Arc::new(RedditClient::from_config(&config.reddit).map_err(|e| AgentError::Config {
            reason: e.to_string(),
        })?);

    let inference = InferenceClient::from_config(config.models.clone()).map_err(|e| {
        AgentError::Config {
            reason: e.to_string(),
        }
    })?;
    tracing::info!(model = %inference.active_model_name(), "inference client ready");
    let inference = Arc::new(inference);

    let generator = Arc::new(LlmContentGenerator::new(inference.clone()));
    let mut registry =
        handlers::default_registry(HandlerContext::new(store.clone(), reddit.clone()), generator);
    if let Some(enabled) = &config.enabled_intents {
        let allowed: HashSet<String> = enabled.iter().cloned().collect();
        registry.retain_intents(&allowed);
    }
    if registry.is_empty() {
        return Err(AgentError::Config {
            reason: "enabled_intents leaves no handlers registered".into(),
        });
    }

    let classifier = Arc::new(LlmIntentClassifier::new(
        inference.clone(),
        registry.intents(),
    ));
    let formatter = Arc::new(LlmResponseFormatter::new(inference));

    let bootstrap = Arc::new(BootstrapSequencer::new(
        store,
        reddit,
        config.reddit.clone(),
        config.auth.clone(),
        CredentialTtls::from(&config.credentials),
        launcher,
    ));

    tracing::info!(
        intents = registry.len(),
        backend = ?config.credentials.backend,
        "agent ready"
    );

    Ok(Orchestrator::new(
        bootstrap,
        classifier,
        Arc::new(registry),
        formatter,
    ))
}

// ─── Logging ─────────────────────────────────────────────────────────────────

/// Where log lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    /// `agent.log` in the data directory, rotated on startup.
    File,
    /// Human-readable lines on stderr.
    Stderr,
    /// One JSON object per line on stderr.
    StderrJson,
}

/// Initialize the tracing subscriber.
///
/// For [`LogTarget::File`]:
/// 1. Rotates existing logs (agent.log → agent.log.1 → .2 → .3, keeps last 3).
/// 2. Opens a fresh agent.log with a line-flushing writer for crash resilience.
/// 3. Logs a startup banner with the data directory path for discoverability.
///
/// Falls back to stderr when the log file cannot be opened.
pub fn init_tracing(target: LogTarget) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("reddit_agent=info,warn"));

    let log_dir = data_dir();
    let log_path = log_dir.join("agent.log");

    let file = match target {
        LogTarget::File => {
            let _ = std::fs::create_dir_all(&log_dir);
            rotate_log_file(&log_path, 3);
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .ok()
        }
        LogTarget::Stderr | LogTarget::StderrJson => None,
    };
    let file_failed = target == LogTarget::File && file.is_none();

    match (file, target) {
        (Some(file), _) => fmt::fmt()
            .with_env_filter(filter)
            .with_writer(FlushingWriter::new(file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false)
            .init(),
        (None, LogTarget::StderrJson) => fmt::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .init(),
        (None, _) => fmt::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init(),
    }

    if file_failed {
        tracing::warn!(log_file = %log_path.display(), "could not open log file, logging to stderr");
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_dir = %log_dir.display(),
        pid = std::process::id(),
        "=== reddit-agent starting ==="
    );
}

/// Rotate log files: `agent.log` → `agent.log.1` → `.2` → … → `.{keep}`.
///
/// Oldest file beyond `keep` is deleted. Missing files in the chain are skipped.
fn rotate_log_file(base_path: &std::path::Path, keep: u32) {
    let oldest = format!("{}.{keep}", base_path.display());
    let _ = std::fs::remove_file(&oldest);

    for i in (1..keep).rev() {
        let from = format!("{}.{i}", base_path.display());
        let to = format!("{}.{}", base_path.display(), i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    if base_path.exists() {
        let to = format!("{}.1", base_path.display());
        let _ = std::fs::rename(base_path, &to);
    }
}

/// A writer that wraps `std::fs::File` and flushes after every write, so a
/// crash never loses the lines leading up to it.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<std::sync::Mutex<std::fs::File>>,
}

impl FlushingWriter {
    fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(std::sync::Mutex::new(file)),
        }
    }
}

impl std::io::Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        let n = std::io::Write::write(&mut *f, buf)?;
        std::io::Write::flush(&mut *f)?;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let mut f = self
            .file
            .lock()
            .map_err(|e| std::io::Error::other(format!("lock poisoned: {e}")))?;
        std::io::Write::flush(&mut *f)
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rotate_keeps_last_three() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("agent.log");
        for round in 0..5 {
            std::fs::write(&log, format!("round {round}")).unwrap();
            rotate_log_file(&log, 3);
        }
        assert!(!log.exists());
        let read = |suffix: u32| {
            std::fs::read_to_string(dir.path().join(format!("agent.log.{suffix}"))).unwrap()
        };
        assert_eq!(read(1), "round 4");
        assert_eq!(read(2), "round 3");
        assert_eq!(read(3), "round 2");
        assert!(!dir.path().join("agent.log.4").exists());
    }

    #[test]
    fn flushing_writer_writes_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = FlushingWriter::new(file);
        writer.write_all(b"line\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "line\n");
    }

    #[test]
    fn build_agent_rejects_empty_allowlist() {
        let mut config = config::parse_config(
            r#"
reddit:
  client_id: "cid"
  redirect_uri: "http://localhost:3000/api/v1/reddit/callback"
  state: "st"
models:
  active_model: local
  models:
    local:
      display_name: "Local"
      base_url: "http://localhost:11434/v1"
"#,
        )
        .unwrap();
        config.enabled_intents = Some(vec!["not_an_intent".into()]);
        let store = credentials::open_store(&config.credentials).unwrap();
        let launcher: Arc<dyn AuthorizationLauncher> =
            Arc::new(test_support::RecordingLauncher::default());
        assert!(matches!(
            build_orchestrator(&config, store, launcher),
            Err(AgentError::Config { .. })
        ));
    }
}
