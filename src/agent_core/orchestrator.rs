//! Dispatch Router — the per-request state machine.
//!
//! ```text
//! Start → Classifying → Dispatching → Executing<intent> → Formatting → Done
//!                  │            │ └──────── unknown ────────↗
//!                  └──── Error ←┘ (unregistered / disabled / classifier failed)
//! ```
//!
//! Bootstrap runs before `Classifying` and is the only step allowed to abort
//! a run. Handler and formatter failures become data, so every run that gets
//! past bootstrap reaches `Done` with a non-empty response.
//!
//! `generate_content` is the one compound intent: its `{title, text}` output
//! is merged into the parameters and fed to `submit_post` before formatting.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::agent_core::bootstrap::BootstrapSequencer;
use crate::agent_core::classifier::IntentClassifier;
use crate::agent_core::errors::AgentError;
use crate::agent_core::formatter::ResponseFormatter;
use crate::agent_core::types::{Intent, Phase, RequestState, RunOutcome};
use crate::handlers::{HandlerRegistry, HandlerResult};

/// `toolOutput` set by the `Error` phase.
pub const ERROR_TOOL_OUTPUT: &str =
    "the request could not be routed to a supported Reddit operation";

/// `description` set by the `Error` phase.
pub const ERROR_DESCRIPTION: &str = "Error";

/// Final response when the formatter fails or answers with nothing.
pub const FORMATTER_APOLOGY: &str = "Sorry, something went wrong while preparing your answer.";

// ─── Orchestrator ───────────────────────────────────────────────────────────

pub struct Orchestrator {
    bootstrap: Arc<BootstrapSequencer>,
    classifier: Arc<dyn IntentClassifier>,
    registry: Arc<HandlerRegistry>,
    formatter: Arc<dyn ResponseFormatter>,
}

/// Where `Dispatching` or `Classifying` sends the run next.
enum Route {
    Execute(Intent),
    Format,
    Error,
}

/// Per-run bookkeeping: the state plus the phase trace.
struct Run {
    state: RequestState,
    trace: Vec<Phase>,
}

impl Run {
    fn enter(&mut self, phase: Phase) {
        tracing::debug!(from = %self.current(), to = %phase, "transition");
        self.trace.push(phase);
    }

    fn current(&self) -> Phase {
        self.trace.last().copied().unwrap_or(Phase::Start)
    }
}

impl Orchestrator {
    pub fn new(
        bootstrap: Arc<BootstrapSequencer>,
        classifier: Arc<dyn IntentClassifier>,
        registry: Arc<HandlerRegistry>,
        formatter: Arc<dyn ResponseFormatter>,
    ) -> Self {
        Self {
            bootstrap,
            classifier,
            registry,
            formatter,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Run one request to completion.
    ///
    /// `prior` is the finished state of the previous run, passed to the
    /// classifier for follow-up requests. Errors are bootstrap failures and
    /// cancellation only.
    pub async fn run(
        &self,
        prompt: &str,
        prior: Option<&RequestState>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, AgentError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("run", %run_id);
        self.run_inner(prompt, prior, cancel).instrument(span).await
    }

    /// Like [`Orchestrator::run`] but always yields text: aborted runs are
    /// answered with [`AgentError::user_message`].
    pub async fn respond(
        &self,
        prompt: &str,
        prior: Option<&RequestState>,
        cancel: &CancellationToken,
    ) -> String {
        match self.run(prompt, prior, cancel).await {
            Ok(outcome) => outcome.response,
            Err(e) => e.user_message(),
        }
    }

    async fn run_inner(
        &self,
        prompt: &str,
        prior: Option<&RequestState>,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, AgentError> {
        let start = std::time::Instant::now();
        let mut run = Run {
            state: RequestState::new(prompt),
            trace: vec![Phase::Start],
        };

        if let Err(e) = self.bootstrap.ensure_credentials(cancel).await {
            tracing::warn!(error = %e, "bootstrap failed, aborting run");
            return Err(e);
        }

        run.enter(Phase::Classifying);
        let route = match cancellable(cancel, self.classifier.classify(prompt, prior)).await? {
            Ok(classification) => {
                tracing::info!(label = %classification.label, "classified request");
                run.state
                    .record_classification(classification.label, classification.parameters);
                run.enter(Phase::Dispatching);
                self.resolve(&mut run)
            }
            Err(e) => {
                tracing::warn!(error = %e, "classification failed");
                Route::Error
            }
        };

        match route {
            Route::Execute(intent) => self.execute(&mut run, intent, cancel).await?,
            Route::Error => {
                run.enter(Phase::Error);
                run.state.set_intent(Intent::Error);
                run.state.tool_output = Some(Value::String(ERROR_TOOL_OUTPUT.to_string()));
                run.state.description = Some(ERROR_DESCRIPTION.to_string());
            }
            Route::Format => {}
        }

        run.enter(Phase::Formatting);
        let response = self.format(&run.state, cancel).await?;
        run.state.finish(response.clone());
        run.enter(Phase::Done);

        tracing::info!(
            intent = %run.state.intent().map_or("-", Intent::as_str),
            phases = run.trace.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "run complete"
        );

        Ok(RunOutcome {
            response,
            state: run.state,
            trace: run.trace,
        })
    }

    /// `Dispatching`: exact match of the classifier label against the registry.
    fn resolve(&self, run: &mut Run) -> Route {
        let label = run.state.classified_label().unwrap_or_default().to_string();
        match Intent::parse(&label) {
            Some(Intent::Unknown) => {
                run.state.set_intent(Intent::Unknown);
                Route::Format
            }
            Some(intent) if self.registry.contains(intent) => {
                run.state.set_intent(intent);
                Route::Execute(intent)
            }
            Some(intent) => {
                tracing::warn!(%intent, "intent is not enabled");
                Route::Error
            }
            None => {
                tracing::warn!(label = %label, "unregistered intent");
                Route::Error
            }
        }
    }

    /// `Executing<intent>`, including the `generate_content → submit_post` chain.
    async fn execute(
        &self,
        run: &mut Run,
        intent: Intent,
        cancel: &CancellationToken,
    ) -> Result<(), AgentError> {
        if intent == Intent::GenerateContent && !run.state.parameters.contains_key("prompt") {
            run.state
                .parameters
                .insert("prompt".into(), Value::String(run.state.prompt().to_string()));
        }

        let result = self.invoke(run, intent, cancel).await?;
        if intent != Intent::GenerateContent || result.is_error() {
            run.state.record_result(result);
            return Ok(());
        }

        if !self.registry.contains(Intent::SubmitPost) {
            tracing::info!("submit_post disabled, returning generated content only");
            run.state.record_result(result);
            return Ok(());
        }

        if let Value::Object(generated) = result.data {
            for (key, value) in generated {
                run.state.parameters.insert(key, value);
            }
        }
        let submitted = self.invoke(run, Intent::SubmitPost, cancel).await?;
        run.state.record_result(submitted);
        Ok(())
    }

    async fn invoke(
        &self,
        run: &mut Run,
        intent: Intent,
        cancel: &CancellationToken,
    ) -> Result<HandlerResult, AgentError> {
        run.enter(Phase::Executing(intent));
        let Some(handler) = self.registry.get(intent).cloned() else {
            tracing::error!(%intent, "no handler registered");
            return Ok(HandlerResult::error(ERROR_DESCRIPTION));
        };
        tracing::info!(%intent, params = run.state.parameters.len(), "invoking handler");
        cancellable(cancel, handler.handle(&run.state.parameters)).await
    }

    /// `Formatting`: never fails except on cancellation.
    async fn format(&self, state: &RequestState, cancel: &CancellationToken) -> Result<String, AgentError> {
        let intent = state.intent().map_or(Intent::Unknown.as_str(), Intent::as_str);
        let description = state.description.as_deref().unwrap_or_default();
        let formatted = cancellable(
            cancel,
            self.formatter
                .format(intent, state.tool_output.as_ref(), description),
        )
        .await?;

        match formatted {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => {
                tracing::warn!(intent, "formatter returned an empty response");
                Ok(FORMATTER_APOLOGY.to_string())
            }
            Err(e) => {
                tracing::warn!(intent, error = %e, "formatting failed");
                Ok(FORMATTER_APOLOGY.to_string())
            }
        }
    }
}

/// Race `fut` against cancellation of the run.
async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, AgentError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::info!("run cancelled");
            Err(AgentError::Cancelled)
        }
        out = fut => Ok(out),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
