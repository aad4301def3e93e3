//! Threads content API client
//!
//! `ThreadsClient` wraps the Graph endpoints for profile, container, publish,
//! post read-back and insights calls. Every call runs through the shared
//! `threads_auth::TokenManager`, which refreshes an expired token and retries
//! the call once.
//!
//! Publishing is two-phase: create a media container, poll its status until
//! it is publishable, then publish. `PublishWorkflow` drives that sequence
//! against any `PublishApi`, bounded by `PollSettings` and cancellable via a
//! `CancellationToken`.

pub mod client;
pub mod error;
pub mod metrics;
pub mod poll;
pub(crate) mod request;
pub mod types;
pub mod workflow;

pub use client::ThreadsClient;
pub use error::{Error, ErrorBody, Result};
pub use poll::{
    DEFAULT_POLL_CEILING, DEFAULT_POLL_INTERVAL, PollDecision, PollSettings, TimeoutPolicy,
    TokioWaiter, Waiter, decide,
};
pub use threads_auth::GRAPH_BASE_URL;
pub use types::{
    Container, ContainerStatus, MediaType, MetricsSnapshot, PostSnapshot, Profile, PublishedPost,
};
pub use workflow::{ApiFuture, PublishApi, PublishWorkflow};
