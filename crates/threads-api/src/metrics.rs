//! Workflow counters
//!
//! Emitted through the `metrics` facade; they are no-ops until the embedding
//! application installs a recorder.
//!
//! - `threads_container_polls_total` (counter): label `status`
//! - `threads_publish_total` (counter): label `outcome`

use crate::types::ContainerStatus;

/// How a `post_thread` run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Published,
    Unpublishable,
    TimedOut,
    Cancelled,
    Failed,
}

impl PublishOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PublishOutcome::Published => "published",
            PublishOutcome::Unpublishable => "unpublishable",
            PublishOutcome::TimedOut => "timed_out",
            PublishOutcome::Cancelled => "cancelled",
            PublishOutcome::Failed => "failed",
        }
    }
}

/// Record one status check and the status it observed.
pub fn record_poll(status: ContainerStatus) {
    metrics::counter!("threads_container_polls_total", "status" => status.as_str()).increment(1);
}

/// Record the end of a publish workflow run.
pub fn record_publish(outcome: PublishOutcome) {
    metrics::counter!("threads_publish_total", "outcome" => outcome.label()).increment(1);
}
