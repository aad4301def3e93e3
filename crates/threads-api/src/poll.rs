//! Container poll state machine
//!
//! `decide` is pure: given the last observed status and how long the workflow
//! has already waited, it says what to do next. The workflow performs the I/O.
//! Waiting goes through the `Waiter` trait so tests can substitute an
//! instantaneous clock.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;

use crate::types::ContainerStatus;

/// Default pause between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default cap on total waiting before the timeout policy applies
pub const DEFAULT_POLL_CEILING: Duration = Duration::from_secs(60);

/// What to do when the ceiling is reached while the container is still
/// `IN_PROGRESS`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutPolicy {
    /// Fail with `Error::PollTimeout`
    #[default]
    Fail,
    /// Call publish anyway; the container may finish between the last poll
    /// and the publish call, and the API rejects it if not
    AttemptPublish,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub ceiling: Duration,
    pub on_timeout: TimeoutPolicy,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            ceiling: DEFAULT_POLL_CEILING,
            on_timeout: TimeoutPolicy::default(),
        }
    }
}

/// Next step after observing a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    /// Call publish
    Publish,
    /// Wait one interval, then poll again
    Wait,
    /// Terminal failure (ERROR or EXPIRED)
    Unpublishable(ContainerStatus),
    /// Ceiling reached without a publishable status
    TimedOut(ContainerStatus),
}

/// Decide the next step. Pure function: no I/O.
///
/// `UNKNOWN` is polled like `IN_PROGRESS` but never published, even under
/// `TimeoutPolicy::AttemptPublish`.
pub fn decide(status: ContainerStatus, waited: Duration, settings: &PollSettings) -> PollDecision {
    if status.is_publishable() {
        return PollDecision::Publish;
    }
    if status.is_failed() {
        return PollDecision::Unpublishable(status);
    }
    if waited < settings.ceiling {
        return PollDecision::Wait;
    }
    match (status, settings.on_timeout) {
        (ContainerStatus::InProgress, TimeoutPolicy::AttemptPublish) => PollDecision::Publish,
        _ => PollDecision::TimedOut(status),
    }
}

/// Wait strategy between status checks.
///
/// Uses `Pin<Box<dyn Future>>` so workflows can hold `&dyn Waiter`.
pub trait Waiter: Send + Sync {
    fn wait(&self, interval: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioWaiter;

impl Waiter for TokioWaiter {
    fn wait(&self, interval: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(tokio::time::sleep(interval))
    }
}
