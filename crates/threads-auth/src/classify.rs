//! Expiry detection for Graph API error responses
//!
//! The Graph API reports auth failures as a JSON error object:
//! `{"error":{"message":"...","type":"OAuthException","code":190,"error_subcode":463}}`.
//! Only a 401 carrying one of the expiry markers counts as an expired
//! credential; that is the one failure `TokenManager::ensure_valid` recovers from.

use serde::Deserialize;

/// Graph error code for an invalid or expired access token
pub const INVALID_TOKEN_CODE: i64 = 190;

/// Error type the Graph API attaches to token failures
pub const AUTH_EXCEPTION_TYPE: &str = "OAuthException";

/// Phrases in a normalized error message that indicate expiry
const EXPIRY_PATTERNS: &[&str] = &["expired", "session has expired", "token has expired"];

/// Why an upstream call failed, as far as credential handling is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// 401 with an expiry marker; refreshing the token may fix it
    CredentialExpired,
    /// 401 without any expiry marker (revoked token, missing permission)
    Unauthorized,
    /// Anything else: transport errors, 4xx/5xx, workflow failures
    Other,
}

/// Lets `TokenManager::ensure_valid` classify the error type of any probe.
pub trait AuthFailure {
    fn failure_reason(&self) -> FailureReason;
}

impl AuthFailure for crate::Error {
    fn failure_reason(&self) -> FailureReason {
        // A failed refresh is never itself retried
        FailureReason::Other
    }
}

/// The `error` member of a Graph API error response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GraphError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: String,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub error_subcode: Option<i64>,
    #[serde(default)]
    pub fbtrace_id: Option<String>,
}

#[derive(Deserialize)]
struct Envelope {
    error: GraphError,
}

impl GraphError {
    /// Parse a raw response body. Returns `None` for non-JSON or bodies
    /// without an `error` object.
    pub fn from_body(body: &str) -> Option<Self> {
        serde_json::from_str::<Envelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }

    /// Extract from an already-parsed response body.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        Envelope::deserialize(value)
            .ok()
            .map(|envelope| envelope.error)
    }

    fn has_expiry_marker(&self) -> bool {
        if self.code == Some(INVALID_TOKEN_CODE) || self.error_type == AUTH_EXCEPTION_TYPE {
            return true;
        }
        let message = self.message.to_lowercase();
        EXPIRY_PATTERNS.iter().any(|p| message.contains(p))
    }
}

/// Classify a failure from its HTTP status and parsed Graph error, if any.
pub fn classify(status: u16, error: Option<&GraphError>) -> FailureReason {
    match (status, error) {
        (401, Some(error)) if error.has_expiry_marker() => FailureReason::CredentialExpired,
        (401, _) => FailureReason::Unauthorized,
        _ => FailureReason::Other,
    }
}

/// Classify a failure from its HTTP status and raw response body.
pub fn classify_failure(status: u16, body: &str) -> FailureReason {
    classify(status, GraphError::from_body(body).as_ref())
}
