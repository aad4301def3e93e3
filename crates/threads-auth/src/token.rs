//! Token refresh and long-lived exchange
//!
//! Both calls are GETs against endpoints outside the versioned graph base,
//! with the grant type and tokens carried as query parameters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{EXCHANGE_GRANT_TYPE, REFRESH_GRANT_TYPE};
use crate::error::{Error, Result};

/// Response from the refresh and exchange endpoints.
///
/// `expires_in` is a delta in seconds from the response time.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Exchange the current long-lived token for a renewed one.
///
/// Transport failures and non-2xx responses both surface as `Error::Refresh`,
/// carrying the upstream status (when there was one) and the response body.
pub async fn refresh_token(
    client: &reqwest::Client,
    endpoint: &str,
    access_token: &str,
) -> Result<TokenResponse> {
    debug!(endpoint, "requesting token refresh");
    let response = client
        .get(endpoint)
        .query(&[
            ("grant_type", REFRESH_GRANT_TYPE),
            ("access_token", access_token),
        ])
        .send()
        .await
        .map_err(|e| Error::Refresh {
            status: None,
            body: format!("refresh request failed: {e}"),
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));

    if !status.is_success() {
        return Err(Error::Refresh {
            status: Some(status.as_u16()),
            body,
        });
    }

    serde_json::from_str::<TokenResponse>(&body).map_err(|e| Error::Refresh {
        status: Some(status.as_u16()),
        body: format!("invalid refresh response ({e}): {body}"),
    })
}

/// Exchange a short-lived token for a long-lived one.
///
/// Requires the app secret, so this is an operator action rather than part of
/// the automatic refresh path.
pub async fn exchange_long_lived(
    client: &reqwest::Client,
    endpoint: &str,
    client_secret: &str,
    short_lived_token: &str,
) -> Result<TokenResponse> {
    let response = client
        .get(endpoint)
        .query(&[
            ("grant_type", EXCHANGE_GRANT_TYPE),
            ("client_secret", client_secret),
            ("access_token", short_lived_token),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange(format!(
            "exchange endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid exchange response: {e}")))
}
