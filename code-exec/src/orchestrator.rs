use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    client::RuntimeClient,
    error::Error,
    languages::LanguageTable,
    session::EditorSession,
    types::{ExecutionOutcome, ExecutionStatus, Language, RuntimeRequest, RuntimeResponse},
};

pub const NO_CODE_ERROR: &str = "no code to run";
pub const TRANSPORT_ERROR: &str = "execution request failed";
pub const CANCELLED_ERROR: &str = "execution cancelled";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Validating,
    Dispatching,
    AwaitingResult,
    Succeeded,
    Failed,
}

impl RunState {
    fn can_advance_to(self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Dispatching)
                | (Validating, Failed)
                | (Dispatching, AwaitingResult)
                | (Dispatching, Failed)
                | (AwaitingResult, Succeeded)
                | (AwaitingResult, Failed)
                | (Succeeded, Idle)
                | (Failed, Idle)
        )
    }
}

/// Records the states a run passes through
#[derive(Debug)]
pub(crate) struct RunTracker {
    state: RunState,
    history: Vec<RunState>,
    started: Instant,
}

impl RunTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: RunState::Idle,
            history: vec![RunState::Idle],
            started: Instant::now(),
        }
    }

    fn advance(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!(from = ?self.state, to = ?next, "Run state transition");
        self.state = next;
        self.history.push(next);
    }

    fn finish(&mut self, outcome: ExecutionOutcome) -> ExecutionOutcome {
        self.advance(if outcome.is_success() {
            RunState::Succeeded
        } else {
            RunState::Failed
        });
        self.advance(RunState::Idle);
        info!(
            status = %outcome.status,
            elapsed_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Execution finished"
        );
        outcome
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &[RunState] {
        &self.history
    }
}

/// Drives one submission through validation, dispatch to the remote runtime
/// and classification of the response.
///
/// Every call makes at most one outbound request and never retries. Failures
/// at any layer are folded into the returned [`ExecutionOutcome`].
#[derive(Clone)]
pub struct ExecutionOrchestrator {
    client: Arc<dyn RuntimeClient>,
    languages: Arc<LanguageTable>,
    timeout: Duration,
}

impl ExecutionOrchestrator {
    pub fn new(client: Arc<dyn RuntimeClient>, languages: LanguageTable) -> Self {
        Self {
            client,
            languages: Arc::new(languages),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self, language: &str, code: &str) -> ExecutionOutcome {
        self.run_with_cancel(language, code, &CancellationToken::new())
            .await
    }

    /// Run, giving up early when `cancel` fires
    pub async fn run_with_cancel(
        &self,
        language: &str,
        code: &str,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        let mut tracker = RunTracker::new();
        self.run_tracked(language, code, cancel, &mut tracker).await
    }

    /// Run the session's current draft and record the outcome on it
    pub async fn run_session(&self, session: &mut EditorSession) -> ExecutionOutcome {
        let language = session.language();
        let code = session.code().to_string();

        session.begin_run();
        let outcome = self.run(language.as_str(), &code).await;
        session.finish_run(outcome.clone());
        outcome
    }

    pub(crate) async fn run_tracked(
        &self,
        language: &str,
        code: &str,
        cancel: &CancellationToken,
        tracker: &mut RunTracker,
    ) -> ExecutionOutcome {
        tracker.advance(RunState::Validating);
        if code.trim().is_empty() {
            return tracker.finish(ExecutionOutcome::failed(
                code,
                ExecutionStatus::InputError,
                NO_CODE_ERROR,
            ));
        }

        tracker.advance(RunState::Dispatching);
        let spec = match language
            .parse::<Language>()
            .and_then(|language| self.languages.resolve(language).cloned())
        {
            Ok(spec) => spec,
            Err(e) => {
                return tracker.finish(ExecutionOutcome::failed(
                    code,
                    ExecutionStatus::InputError,
                    e.to_string(),
                ))
            }
        };
        let request = RuntimeRequest::single_file(&spec, code);

        tracker.advance(RunState::AwaitingResult);
        let outcome = match self.dispatch(&request, cancel).await {
            Ok(response) => classify(code, response),
            Err(e) => outcome_from_error(code, e),
        };
        tracker.finish(outcome)
    }

    async fn dispatch(
        &self,
        request: &RuntimeRequest,
        cancel: &CancellationToken,
    ) -> Result<RuntimeResponse, Error> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(self.timeout, self.client.execute(request)) => {
                result.map_err(|_| Error::Timeout(self.timeout))?
            }
        }
    }
}

/// Classify a runtime response. The first matching layer wins: API message,
/// compile failure, run failure, then success.
pub fn classify(code: &str, response: RuntimeResponse) -> ExecutionOutcome {
    if let Some(message) = response.message.filter(|m| !m.is_empty()) {
        return ExecutionOutcome::failed(code, ExecutionStatus::ApiError, message);
    }

    if let Some(compile) = response.compile.as_ref().filter(|phase| phase.failed()) {
        return ExecutionOutcome::failed(
            code,
            ExecutionStatus::CompilationError,
            compile.diagnostic(),
        );
    }

    match response.run {
        Some(run) if run.failed() => {
            ExecutionOutcome::failed(code, ExecutionStatus::RuntimeError, run.diagnostic())
        }
        Some(run) => ExecutionOutcome::succeeded(code, run.combined_output().trim()),
        None => {
            warn!("Runtime response carried neither a message nor a run phase");
            ExecutionOutcome::failed(code, ExecutionStatus::TransportError, TRANSPORT_ERROR)
        }
    }
}

fn outcome_from_error(code: &str, error: Error) -> ExecutionOutcome {
    match error {
        Error::Timeout(timeout) => ExecutionOutcome::failed(
            code,
            ExecutionStatus::Timeout,
            format!("execution timed out after {}s", timeout.as_secs()),
        ),
        Error::Cancelled => {
            ExecutionOutcome::failed(code, ExecutionStatus::Cancelled, CANCELLED_ERROR)
        }
        other => {
            warn!(error = %other, "Runtime request failed");
            ExecutionOutcome::failed(code, ExecutionStatus::TransportError, TRANSPORT_ERROR)
        }
    }
}
