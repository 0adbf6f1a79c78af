//! Completion polling for queued prompts.
//!
//! [`await_completion`] queries the history endpoint on a fixed interval
//! until the prompt reaches a terminal state or the deadline passes. The
//! deadline is checked before every query and the status is checked
//! before every sleep.
//!
//! A failed history query is a [`PollStep::Tolerated`] step: it is logged
//! and treated as "still pending". It never becomes a service error and
//! never resets the clock.

use std::time::Duration;

use tokio::time::Instant;

use crate::api::ComfyUIApiError;
use crate::history::{HistoryResponse, JobHistory, StatusKind};
use crate::service::{JobHandle, RenderService};

/// Default delay between history queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Default per-job completion deadline.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(300);

/// Timing parameters for [`await_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between consecutive history queries.
    pub interval: Duration,
    /// Wall-clock ceiling measured from the first query.
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_JOB_TIMEOUT,
        }
    }
}

/// Result of a single history query.
#[derive(Debug)]
pub enum PollStep {
    /// Not recorded yet, or recorded without a terminal status.
    Pending,
    /// The query itself failed; treated as pending for this iteration.
    Tolerated(ComfyUIApiError),
    /// Terminal: the prompt finished successfully.
    Succeeded(JobHistory),
    /// Terminal: the server reported an execution error.
    Failed(String),
}

/// Terminal outcome of [`await_completion`].
#[derive(Debug)]
pub enum PollOutcome {
    Completed(JobHistory),
    ServiceError(String),
    TimedOut { timeout: Duration, attempts: u32 },
}

/// Classify one history query result for `handle`.
pub fn classify(
    handle: &JobHandle,
    result: Result<HistoryResponse, ComfyUIApiError>,
) -> PollStep {
    let mut response = match result {
        Ok(response) => response,
        Err(e) => return PollStep::Tolerated(e),
    };

    let Some(entry) = response.remove(handle.as_str()) else {
        return PollStep::Pending;
    };

    match entry.status.kind() {
        StatusKind::Success => PollStep::Succeeded(entry),
        StatusKind::Error => PollStep::Failed(entry.status.diagnostic()),
        StatusKind::Pending => PollStep::Pending,
    }
}

/// Poll the history endpoint until `handle` reaches a terminal state.
pub async fn await_completion<S>(
    service: &S,
    handle: &JobHandle,
    config: &PollConfig,
) -> PollOutcome
where
    S: RenderService + ?Sized,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        if start.elapsed() >= config.timeout {
            tracing::warn!(
                prompt_id = %handle,
                attempts,
                timeout_secs = config.timeout.as_secs(),
                "Timed out waiting for completion",
            );
            return PollOutcome::TimedOut {
                timeout: config.timeout,
                attempts,
            };
        }

        attempts += 1;
        match classify(handle, service.history(handle).await) {
            PollStep::Succeeded(history) => {
                tracing::info!(
                    prompt_id = %handle,
                    attempts,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Prompt completed",
                );
                return PollOutcome::Completed(history);
            }
            PollStep::Failed(diagnostic) => {
                tracing::error!(
                    prompt_id = %handle,
                    attempts,
                    diagnostic = %diagnostic,
                    "Prompt failed on the server",
                );
                return PollOutcome::ServiceError(diagnostic);
            }
            PollStep::Tolerated(e) => {
                tracing::warn!(
                    prompt_id = %handle,
                    attempt = attempts,
                    error = %e,
                    "History query failed, still waiting",
                );
            }
            PollStep::Pending => {
                tracing::trace!(prompt_id = %handle, attempt = attempts, "Prompt pending");
            }
        }

        tokio::time::sleep(config.interval).await;
    }
}
