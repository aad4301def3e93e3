//! Request encodings
//!
//! Reads authenticate with an `Authorization: Bearer` header. Writes to the
//! container endpoints are form-encoded with the token as an `access_token`
//! form field, since those endpoints reject header auth. Every non-2xx
//! response is turned into `Error::HttpStatus` with its body preserved.

use reqwest::Method;
use reqwest::header::{ACCEPT, HeaderValue};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, ErrorBody, Result};

/// `GET url?query` with bearer auth, decoding a JSON response.
pub(crate) async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    token: &str,
    query: &[(&str, &str)],
) -> Result<T> {
    debug!(url, "GET");
    let response = http
        .get(url)
        .bearer_auth(token)
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .query(query)
        .send()
        .await
        .map_err(|e| transport_error(Method::GET, url, e))?;
    decode(Method::GET, url, response).await
}

/// `POST url` with a form body carrying `access_token` plus `fields`.
pub(crate) async fn post_form<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    token: &str,
    fields: &[(&'static str, String)],
) -> Result<T> {
    debug!(url, fields = fields.len(), "POST");
    let mut form: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    form.push(("access_token", token));

    let response = http
        .post(url)
        .header(ACCEPT, HeaderValue::from_static("application/json"))
        .form(&form)
        .send()
        .await
        .map_err(|e| transport_error(Method::POST, url, e))?;
    decode(Method::POST, url, response).await
}

fn transport_error(method: Method, url: &str, e: reqwest::Error) -> Error {
    warn!(%method, url, error = %e, "request failed before a response");
    Error::Transport {
        method,
        url: url.to_string(),
        message: e.to_string(),
    }
}

async fn decode<T: DeserializeOwned>(
    method: Method,
    url: &str,
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    let raw = response.text().await.map_err(|e| Error::Decode {
        url: url.to_string(),
        message: format!("reading body: {e}"),
    })?;

    if !status.is_success() {
        warn!(%method, url, status = status.as_u16(), body = %raw, "upstream returned an error");
        return Err(Error::HttpStatus {
            method,
            url: url.to_string(),
            status: status.as_u16(),
            body: ErrorBody::parse(raw),
        });
    }

    serde_json::from_str(&raw).map_err(|e| Error::Decode {
        url: url.to_string(),
        message: format!("{e}: {raw}"),
    })
}
