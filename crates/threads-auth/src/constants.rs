//! Threads Graph API endpoints
//!
//! The refresh and exchange endpoints live on the graph host but outside the
//! versioned base path.

/// Versioned base for all content and profile calls
pub const GRAPH_BASE_URL: &str = "https://graph.threads.net/v1.0";

/// Long-lived token refresh endpoint
pub const REFRESH_ENDPOINT: &str = "https://graph.threads.net/refresh_access_token";

/// Short-lived to long-lived token exchange endpoint
pub const EXCHANGE_ENDPOINT: &str = "https://graph.threads.net/access_token";

/// Grant type marker for refreshing a long-lived token
pub const REFRESH_GRANT_TYPE: &str = "th_refresh_token";

/// Grant type marker for exchanging a short-lived token
pub const EXCHANGE_GRANT_TYPE: &str = "th_exchange_token";
