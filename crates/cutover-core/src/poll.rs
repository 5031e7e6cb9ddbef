//! Waiting for an endpoint to settle after a cutover.

use crate::error::{CutoverError, CutoverResult};
use crate::progress::{ProgressEvent, ProgressSink};
use cutover_platform::{EndpointDescription, EndpointStatus, HostingPlatform};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Bounds on how long to wait for an endpoint transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between status checks.
    pub interval: Duration,
    /// Stop after this many status checks.
    pub max_attempts: Option<u32>,
    /// Stop once this much time has passed since the first check.
    pub timeout: Option<Duration>,
}

impl PollPolicy {
    /// Checks every `interval` with no other bound.
    #[must_use]
    pub const fn every(interval: Duration) -> Self {
        Self { interval, max_attempts: None, timeout: None }
    }

    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Terminal endpoint state and how many checks it took to observe it.
#[derive(Debug, Clone)]
pub struct PollOutcome {
    pub endpoint: EndpointDescription,
    pub checks: u32,
}

/// Polls `endpoint` while it is `Creating` or `Updating`.
///
/// Returns once the endpoint is `InService`. Any other settled status, or an
/// endpoint that disappeared, is `EndpointTransitionFailed`. Running out of
/// attempts or time is `Timeout`; a fired `cancel` token is `Cancelled`.
/// Both bounds also apply to a status request that never answers.
pub async fn await_terminal_status(
    platform: &dyn HostingPlatform,
    endpoint: &str,
    policy: &PollPolicy,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
) -> CutoverResult<PollOutcome> {
    let started = Instant::now();
    let deadline = policy.timeout.map(|timeout| started + timeout);
    let mut checks: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(CutoverError::Cancelled);
        }

        let description = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CutoverError::Cancelled),
            result = platform.describe_endpoint(endpoint) => result?,
            () = sleep_until(deadline) => {
                error!(endpoint, "Status request outlived the poll timeout");
                return Err(CutoverError::Timeout { attempts: checks + 1, elapsed: started.elapsed() });
            }
        };
        checks += 1;

        let Some(description) = description else {
            error!(endpoint, "Endpoint disappeared while waiting for it");
            return Err(CutoverError::EndpointTransitionFailed {
                status: "Missing".to_string(),
                reason: Some("endpoint no longer exists".to_string()),
            });
        };
        sink.on_event(ProgressEvent::StatusChecked {
            endpoint: endpoint.to_string(),
            attempt: checks,
            status: description.status.clone(),
        });

        if !description.status.is_transitional() {
            if description.status == EndpointStatus::InService {
                return Ok(PollOutcome { endpoint: description, checks });
            }
            error!(
                endpoint,
                status = %description.status,
                reason = ?description.failure_reason,
                "Unexpected endpoint status"
            );
            return Err(CutoverError::EndpointTransitionFailed {
                status: description.status.to_string(),
                reason: description.failure_reason,
            });
        }

        let elapsed = started.elapsed();
        let attempts_spent = policy.max_attempts.is_some_and(|max| checks >= max);
        let time_spent = policy.timeout.is_some_and(|timeout| elapsed >= timeout);
        if attempts_spent || time_spent {
            return Err(CutoverError::Timeout { attempts: checks, elapsed });
        }

        debug!(endpoint, status = %description.status, interval = ?policy.interval, "Endpoint still transitioning");
        tokio::select! {
            () = cancel.cancelled() => return Err(CutoverError::Cancelled),
            () = tokio::time::sleep(policy.interval) => {}
        }
    }
}

/// Sleeps until `deadline`, or forever without one.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
