use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::annotator::backend::{Completion, CompletionBackend, HttpCompletionBackend};
use crate::annotator::gate::AdmissionGate;
use crate::annotator::labels::classify;
use crate::annotator::retry::{AttemptState, RetryPolicy};
use crate::config::ClientConfig;
use crate::data_model::{LabelOrError, NO_RESULT_TEXT};
use crate::error::{PipelineError, RequestError, Result};
use crate::utils::prometheus_metrics::*;

/// Issues one logical annotation request per text, under the shared
/// admission gate, with a per-attempt timeout and retry with backoff.
///
/// Cloning shares the backend and the gate.
#[derive(Clone)]
pub struct AnnotationClient {
    backend: Arc<dyn CompletionBackend>,
    gate: AdmissionGate,
    policy: RetryPolicy,
    request_timeout: Duration,
}

impl AnnotationClient {
    /// Client talking to the HTTP chat-completions endpoint from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let backend = HttpCompletionBackend::new(config)?;
        Self::with_backend(config, Arc::new(backend))
    }

    pub fn with_backend(config: &ClientConfig, backend: Arc<dyn CompletionBackend>) -> Result<Self> {
        if config.request_timeout.is_zero() {
            return Err(PipelineError::ConfigValidationError(
                "AnnotationClient: request_timeout must be greater than 0".to_string(),
            ));
        }
        let gate = AdmissionGate::new(config.max_concurrent_requests)?;
        info!(config = ?config, backend = backend.name(), "Annotation client ready");

        Ok(AnnotationClient {
            backend,
            gate,
            policy: RetryPolicy::new(config.max_retries, config.base_retry_delay),
            request_timeout: config.request_timeout,
        })
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Annotates one text.
    ///
    /// Every per-item problem ends up inside the returned `LabelOrError`. The
    /// only `Err` is `PipelineError::GateClosed`: the gate can never admit the
    /// request, which no amount of retrying fixes.
    pub async fn annotate(&self, text: impl ToString) -> Result<LabelOrError> {
        let text = text.to_string();
        let mut state = AttemptState::Attempting(0);

        loop {
            state = match state {
                AttemptState::Attempting(attempt) => match self.attempt(&text, attempt).await? {
                    Ok(Completion::Reply(reply)) => AttemptState::Finished(classify(&reply)),
                    Ok(Completion::NoChoice(body)) => AttemptState::Finished(
                        LabelOrError::Unrecognized(format!("{}: {}", NO_RESULT_TEXT, body)),
                    ),
                    Err(error) => {
                        let next =
                            self.policy
                                .on_failure(attempt, &error, RetryPolicy::sample_jitter());
                        match &next {
                            AttemptState::WaitingToRetry { delay, .. } => {
                                REQUEST_RETRIES_TOTAL.inc();
                                warn!(
                                    attempt,
                                    error = %error,
                                    delay_ms = delay.as_millis() as u64,
                                    "Request failed, retrying"
                                );
                            }
                            _ => warn!(attempt, error = %error, "Request failed, giving up"),
                        }
                        next
                    }
                },
                AttemptState::WaitingToRetry {
                    next_attempt,
                    delay,
                } => {
                    sleep(delay).await;
                    AttemptState::Attempting(next_attempt)
                }
                AttemptState::Finished(outcome) => {
                    record_outcome(&outcome);
                    return Ok(outcome);
                }
            };
        }
    }

    /// One attempt. The admission slot is held only for the duration of the
    /// request itself, never across a backoff sleep.
    async fn attempt(
        &self,
        text: &str,
        attempt: u32,
    ) -> Result<std::result::Result<Completion, RequestError>> {
        let _permit = self.gate.acquire().await?;
        REQUESTS_ATTEMPTED_TOTAL.inc();
        let timer = REQUEST_DURATION_SECONDS.start_timer();

        let result = match timeout(self.request_timeout, self.backend.complete(text)).await {
            Ok(result) => result,
            Err(_) => {
                REQUEST_TIMEOUTS_TOTAL.inc();
                Err(RequestError::Timeout(self.request_timeout))
            }
        };

        timer.observe_duration();
        debug!(attempt, ok = result.is_ok(), "Request attempt finished");
        Ok(result)
    }
}

fn record_outcome(outcome: &LabelOrError) {
    match outcome {
        LabelOrError::Label(_) => ITEMS_LABELLED_TOTAL.inc(),
        LabelOrError::Unrecognized(_) => ITEMS_UNRECOGNIZED_TOTAL.inc(),
        LabelOrError::Failed(_) => ITEMS_FAILED_TOTAL.inc(),
    }
}
