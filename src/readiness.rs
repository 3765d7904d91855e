//! Bounded readiness polling.
//!
//! One primitive serves every wait in the crate: "container is running",
//! "container is stopped", and "healthcheck passes". The caller supplies a
//! tri-state predicate; [`poll_until`] evaluates it until it reports ready,
//! reports a terminal state, fails, or the budget runs out.
//!
//! The budget has two independent limits: an attempt cap and a wall-clock
//! deadline. Whichever is reached first ends the poll with
//! [`Error::ReadinessTimeout`].

use crate::config::ProbeSpec;
use crate::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Result of one predicate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Not there yet; try again after the interval.
    Pending,
    /// Target reached.
    Ready,
    /// Target can no longer be reached; carries the observed state.
    Terminal(String),
}

/// Polling budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32, timeout: Duration) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
            timeout,
        }
    }

    /// Budget for an application healthcheck: the probe's own interval and
    /// timeout, still subject to the global attempt cap.
    pub fn for_probe(probe: &ProbeSpec, max_attempts: u32) -> Self {
        Self::new(probe.interval, max_attempts, probe.timeout)
    }
}

/// Evaluate `predicate` until it is ready or the budget is exhausted.
///
/// - The predicate is always evaluated at least once.
/// - `Ready` returns immediately; `Terminal` fails immediately with
///   [`Error::TerminalState`] and is never retried.
/// - A predicate error is returned as-is, also without retrying.
/// - An evaluation still running at the deadline is abandoned.
pub async fn poll_until<F, Fut>(target: &str, policy: PollPolicy, mut predicate: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<PollOutcome>>,
{
    let start = Instant::now();
    // A timeout too large to represent means no wall-clock deadline.
    let deadline = start.checked_add(policy.timeout);
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        let outcome = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, predicate()).await {
                Ok(result) => result?,
                Err(_) => {
                    tracing::debug!("{}: check still running at deadline", target);
                    return Err(timeout_error(target, attempts, start));
                }
            },
            None => predicate().await?,
        };

        match outcome {
            PollOutcome::Ready => {
                tracing::debug!("{}: ready after {} check(s)", target, attempts);
                return Ok(());
            }
            PollOutcome::Terminal(state) => {
                return Err(Error::TerminalState {
                    target: target.to_string(),
                    state,
                });
            }
            PollOutcome::Pending => {}
        }

        let now = Instant::now();
        if attempts >= policy.max_attempts || deadline.is_some_and(|d| now >= d) {
            return Err(timeout_error(target, attempts, start));
        }

        tracing::debug!(
            "{}: not ready (check {}/{}), retrying in {:?}",
            target,
            attempts,
            policy.max_attempts,
            policy.interval
        );
        let pause = match deadline {
            Some(deadline) => policy.interval.min(deadline - now),
            None => policy.interval,
        };
        tokio::time::sleep(pause).await;
    }
}

fn timeout_error(target: &str, attempts: u32, start: Instant) -> Error {
    Error::ReadinessTimeout {
        target: target.to_string(),
        attempts,
        elapsed: start.elapsed(),
    }
}
