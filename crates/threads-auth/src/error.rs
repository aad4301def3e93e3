//! Error types for credential operations

/// Errors from token refresh, exchange, and credential storage.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The refresh exchange failed. `status` is `None` when the request never
    /// got a response.
    #[error("token refresh failed (status {status:?}): {body}")]
    Refresh { status: Option<u16>, body: String },

    #[error("access token expired and auto-refresh is disabled")]
    CredentialExpired,

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
