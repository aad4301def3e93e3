//! Error types for Threads API calls and the publish workflow

use std::fmt;
use std::time::Duration;

use threads_auth::{AuthFailure, FailureReason, GraphError, classify::classify};

use crate::types::ContainerStatus;

/// Body of a non-2xx response: the parsed JSON error object when the body is
/// JSON, the raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Json(serde_json::Value),
    Text(String),
}

impl ErrorBody {
    pub fn parse(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => ErrorBody::Json(value),
            Err(_) => ErrorBody::Text(raw),
        }
    }

    /// The Graph `error` object, if the body carries one.
    pub fn graph_error(&self) -> Option<GraphError> {
        match self {
            ErrorBody::Json(value) => GraphError::from_value(value),
            ErrorBody::Text(text) => GraphError::from_body(text),
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorBody::Json(value) => write!(f, "{value}"),
            ErrorBody::Text(text) => f.write_str(text),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{method} {url} failed: {message}")]
    Transport {
        method: reqwest::Method,
        url: String,
        message: String,
    },

    #[error("{method} {url} returned {status}: {body}")]
    HttpStatus {
        method: reqwest::Method,
        url: String,
        status: u16,
        body: ErrorBody,
    },

    #[error(transparent)]
    Auth(#[from] threads_auth::Error),

    #[error("container {container_id} cannot be published: status {status}")]
    ContainerUnpublishable {
        container_id: String,
        status: ContainerStatus,
    },

    #[error("container {container_id} still {status} after waiting {waited:?}")]
    PollTimeout {
        container_id: String,
        status: ContainerStatus,
        waited: Duration,
    },

    #[error("publish of container {container_id} was cancelled")]
    Cancelled { container_id: String },

    #[error("invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("post {media_id} not found")]
    PostNotFound { media_id: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl AuthFailure for Error {
    fn failure_reason(&self) -> FailureReason {
        match self {
            Error::HttpStatus { status, body, .. } => classify(*status, body.graph_error().as_ref()),
            _ => FailureReason::Other,
        }
    }
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;
