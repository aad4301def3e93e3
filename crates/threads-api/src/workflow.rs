//! Create → poll → publish orchestration
//!
//! The workflow drives a container through the poll state machine in
//! `poll::decide`: one create call, strictly sequential status checks
//! separated by the waiter, then at most one publish call. Nothing runs
//! concurrently within a run. A failed run leaves the container on the
//! server; the API offers no way to delete it.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::metrics::{PublishOutcome, record_poll, record_publish};
use crate::poll::{PollDecision, PollSettings, Waiter, decide};
use crate::types::{Container, ContainerStatus, PublishedPost};

/// Boxed future returned by `PublishApi` methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// The three container calls the workflow needs.
///
/// `ThreadsClient` is the production implementation. Uses
/// `Pin<Box<dyn Future>>` return types for dyn-compatibility.
pub trait PublishApi: Send + Sync {
    fn create_container<'a>(
        &'a self,
        text: &'a str,
        image_url: Option<&'a str>,
    ) -> ApiFuture<'a, Container>;

    fn poll_status<'a>(&'a self, container_id: &'a str) -> ApiFuture<'a, ContainerStatus>;

    fn publish<'a>(&'a self, container_id: &'a str) -> ApiFuture<'a, PublishedPost>;
}

/// One configured publish run.
pub struct PublishWorkflow<'a> {
    api: &'a dyn PublishApi,
    waiter: &'a dyn Waiter,
    settings: PollSettings,
    cancel: CancellationToken,
}

impl<'a> PublishWorkflow<'a> {
    pub fn new(api: &'a dyn PublishApi, waiter: &'a dyn Waiter, settings: PollSettings) -> Self {
        Self {
            api,
            waiter,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the poll loop early when `cancel` fires. The run then fails with
    /// `Error::Cancelled`, never `Error::PollTimeout`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Create a container, wait for it to become publishable, publish it.
    pub async fn run(&self, text: &str, image_url: Option<&str>) -> Result<PublishedPost> {
        let outcome = self.run_inner(text, image_url).await;
        record_publish(match &outcome {
            Ok(_) => PublishOutcome::Published,
            Err(Error::ContainerUnpublishable { .. }) => PublishOutcome::Unpublishable,
            Err(Error::PollTimeout { .. }) => PublishOutcome::TimedOut,
            Err(Error::Cancelled { .. }) => PublishOutcome::Cancelled,
            Err(_) => PublishOutcome::Failed,
        });
        outcome
    }

    async fn run_inner(&self, text: &str, image_url: Option<&str>) -> Result<PublishedPost> {
        let container = self.api.create_container(text, image_url).await?;
        info!(container_id = %container.id, media_type = container.media_type.as_str(), "container created");

        self.await_publishable(&container.id).await?;

        let post = self.api.publish(&container.id).await?;
        info!(container_id = %container.id, post_id = %post.id, "thread published");
        Ok(post)
    }

    /// Poll `container_id` until `decide` says publish, then return the last
    /// observed status.
    #[instrument(skip(self), fields(interval = ?self.settings.interval, ceiling = ?self.settings.ceiling))]
    pub async fn await_publishable(&self, container_id: &str) -> Result<ContainerStatus> {
        let mut waited = Duration::ZERO;
        loop {
            if self.cancel.is_cancelled() {
                return Err(cancelled(container_id));
            }

            let status = self.api.poll_status(container_id).await?;
            record_poll(status);
            debug!(%status, waited_secs = waited.as_secs(), "polled container status");

            match decide(status, waited, &self.settings) {
                PollDecision::Publish => {
                    if !status.is_publishable() {
                        warn!(%status, waited_secs = waited.as_secs(), "poll ceiling reached, attempting publish anyway");
                    }
                    return Ok(status);
                }
                PollDecision::Wait => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Err(cancelled(container_id)),
                        _ = self.waiter.wait(self.settings.interval) => {}
                    }
                    waited += self.settings.interval;
                }
                PollDecision::Unpublishable(status) => {
                    warn!(%status, "container reached a failed status");
                    return Err(Error::ContainerUnpublishable {
                        container_id: container_id.to_string(),
                        status,
                    });
                }
                PollDecision::TimedOut(status) => {
                    warn!(%status, waited_secs = waited.as_secs(), "container not ready before poll ceiling");
                    return Err(Error::PollTimeout {
                        container_id: container_id.to_string(),
                        status,
                        waited,
                    });
                }
            }
        }
    }
}

fn cancelled(container_id: &str) -> Error {
    info!(container_id, "publish workflow cancelled");
    Error::Cancelled {
        container_id: container_id.to_string(),
    }
}
