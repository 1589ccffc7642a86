//! `reddit-agent` — command-line front end for the orchestrator.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Parser;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use reddit_agent::agent_core::{AgentError, AuthorizationLauncher, RequestState};
use reddit_agent::config::{self, AppConfig};
use reddit_agent::credentials::{self, CredentialStore, CredentialTtls, ALL_KEYS};
use reddit_agent::reddit::auth::{self, CallbackOutcome};
use reddit_agent::{build_orchestrator, init_tracing, LogTarget};

use crate::cli::{Cli, Commands};

mod cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let result = runtime.block_on(run(cli));
    // A consent prompt may still be blocked reading stdin; don't wait for it.
    runtime.shutdown_background();
    result
}

async fn run(cli: Cli) -> Result<()> {
    init_tracing(match (cli.verbose, cli.json_logs) {
        (true, true) => LogTarget::StderrJson,
        (true, false) => LogTarget::Stderr,
        (false, _) => LogTarget::File,
    });

    let config = load_config(&cli)?;
    let store = credentials::open_store(&config.credentials)
        .context("failed to open credential store")?;

    match cli.command {
        Commands::Ask { prompt, trace } => ask(&config, store, &prompt.join(" "), trace).await,
        Commands::Chat => chat(&config, store).await,
        Commands::Callback { url } => callback(&config, store.as_ref(), &url).await,
        Commands::Status => status(&config, store.as_ref()).await,
        Commands::Logout => logout(store.as_ref()).await,
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let path = match &cli.config {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir().context("cannot read current directory")?;
            config::find_config_path(&cwd)?
        }
    };
    config::load_config(&path).with_context(|| format!("failed to load {}", path.display()))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\ncancelling…");
            token.cancel();
        }
    });
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn ask(
    config: &AppConfig,
    store: Arc<dyn CredentialStore>,
    prompt: &str,
    trace: bool,
) -> Result<()> {
    let launcher = Arc::new(TerminalLauncher::new(config, store.clone()));
    let orchestrator = build_orchestrator(config, store, launcher)?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    match orchestrator.run(prompt, None, &cancel).await {
        Ok(outcome) => {
            println!("{}", outcome.response);
            if trace {
                let phases: Vec<String> = outcome.trace.iter().map(ToString::to_string).collect();
                eprintln!("[{}]", phases.join(" → "));
            }
            Ok(())
        }
        Err(e) => {
            println!("{}", e.user_message());
            Err(e.into())
        }
    }
}

async fn chat(config: &AppConfig, store: Arc<dyn CredentialStore>) -> Result<()> {
    let launcher = Arc::new(TerminalLauncher::new(config, store.clone()));
    let orchestrator = build_orchestrator(config, store, launcher)?;
    let mut prior: Option<RequestState> = None;

    eprintln!("Ask about Reddit. Empty line or Ctrl-D to quit.");
    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();
        let Some(line) = read_line().await? else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            break;
        }

        let cancel = CancellationToken::new();
        let run = orchestrator.run(prompt, prior.as_ref(), &cancel);
        let outcome = tokio::select! {
            outcome = run => outcome,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                eprintln!("\ncancelled");
                continue;
            }
        };

        match outcome {
            Ok(outcome) => {
                println!("{}\n", outcome.response);
                prior = Some(outcome.state);
            }
            Err(AgentError::Cancelled) => eprintln!("cancelled"),
            Err(e) => {
                tracing::warn!(error = %e, "run aborted");
                println!("{}\n", e.user_message());
            }
        }
    }
    Ok(())
}

async fn callback(config: &AppConfig, store: &dyn CredentialStore, url: &str) -> Result<()> {
    if config.credentials.backend == config::CredentialBackend::Memory {
        eprintln!(
            "warning: the memory credential backend does not outlive this process; \
             set credentials.backend to sqlite to hand a callback to another run"
        );
    }
    let params = auth::parse_redirect_url(url)?;
    let ttls = CredentialTtls::from(&config.credentials);
    let outcome =
        auth::record_authorization_callback(store, &params, &config.reddit.state, &ttls).await?;
    println!("{}", describe_callback(&outcome));
    Ok(())
}

async fn status(config: &AppConfig, store: &dyn CredentialStore) -> Result<()> {
    println!("credential backend: {:?}", config.credentials.backend);
    for key in ALL_KEYS {
        let present = store.get(key).await?.is_some();
        println!("  {key:<22} {}", if present { "present" } else { "-" });
    }
    Ok(())
}

async fn logout(store: &dyn CredentialStore) -> Result<()> {
    for key in ALL_KEYS {
        store.delete(key).await?;
    }
    println!("credentials cleared");
    Ok(())
}

fn describe_callback(outcome: &CallbackOutcome) -> String {
    match outcome {
        CallbackOutcome::Granted => "authorization recorded".to_string(),
        CallbackOutcome::Denied { reason } => format!("authorization declined ({reason})"),
        CallbackOutcome::Rejected { reason } => format!("callback ignored: {reason}"),
    }
}

/// Read one line from stdin without blocking the runtime. `None` on EOF.
async fn read_line() -> Result<Option<String>> {
    let line = tokio::task::spawn_blocking(|| {
        let mut buf = String::new();
        std::io::stdin().read_line(&mut buf).map(|n| (n > 0).then_some(buf))
    })
    .await
    .context("stdin reader panicked")??;
    Ok(line)
}

// ─── Terminal launcher ───────────────────────────────────────────────────────

/// Prints the consent URL and records the redirect URL the user pastes back.
///
/// Returns as soon as the URL is printed; the pasted line is handled on a
/// background task while the sequencer polls the store.
struct TerminalLauncher {
    store: Arc<dyn CredentialStore>,
    state: String,
    ttls: CredentialTtls,
}

impl TerminalLauncher {
    fn new(config: &AppConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            state: config.reddit.state.clone(),
            ttls: CredentialTtls::from(&config.credentials),
        }
    }
}

#[async_trait]
impl AuthorizationLauncher for TerminalLauncher {
    async fn launch(&self, url: &Url) -> Result<(), AgentError> {
        eprintln!("\nOpen this URL to let reddit-agent use your account:\n\n  {url}\n");
        eprintln!("Then paste the address your browser was redirected to and press Enter:");

        let store = self.store.clone();
        let state = self.state.clone();
        let ttls = self.ttls;
        tokio::spawn(async move {
            let line = match read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read redirect URL");
                    return;
                }
            };
            let params = match auth::parse_redirect_url(&line) {
                Ok(params) => params,
                Err(e) => {
                    eprintln!("{e}");
                    return;
                }
            };
            match auth::record_authorization_callback(store.as_ref(), &params, &state, &ttls).await
            {
                Ok(outcome) => eprintln!("{}", describe_callback(&outcome)),
                Err(e) => tracing::warn!(error = %e, "failed to record authorization callback"),
            }
        });
        Ok(())
    }
}
