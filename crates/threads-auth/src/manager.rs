//! Token manager: the single owner of the live credential
//!
//! The credential sits in a tokio `watch` channel: readers clone the current
//! value without awaiting, and a refresh swaps the whole value in one step, so
//! a reader sees either the old or the new credential, never a mix. Refreshes
//! are serialized by an async mutex.

use std::future::Future;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::classify::{AuthFailure, FailureReason};
use crate::constants::REFRESH_ENDPOINT;
use crate::credentials::{Credential, now_millis};
use crate::error::{Error, Result};
use crate::token::refresh_token;

pub struct TokenManager {
    client: reqwest::Client,
    refresh_endpoint: String,
    auto_refresh: bool,
    credential: watch::Sender<Credential>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    /// Create a manager holding `credential`, with auto-refresh enabled and the
    /// production refresh endpoint.
    pub fn new(client: reqwest::Client, credential: Credential) -> Self {
        Self {
            client,
            refresh_endpoint: REFRESH_ENDPOINT.to_string(),
            auto_refresh: true,
            credential: watch::Sender::new(credential),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn with_refresh_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.refresh_endpoint = endpoint.into();
        self
    }

    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh = enabled;
        self
    }

    /// The live credential. Never waits on an in-flight refresh.
    pub fn current_credential(&self) -> Credential {
        self.credential.borrow().clone()
    }

    /// Receiver that is marked changed after every successful refresh.
    ///
    /// This crate never persists tokens; whoever owns storage subscribes here.
    pub fn subscribe(&self) -> watch::Receiver<Credential> {
        self.credential.subscribe()
    }

    /// Exchange the current credential for a renewed one and install it.
    pub async fn refresh(&self) -> Result<Credential> {
        let seen = self.current_credential();
        self.refresh_from(&seen).await
    }

    /// Refresh ahead of time if the live credential expires within
    /// `threshold`. Returns the renewed credential, or `None` when the token
    /// is not close to expiry, has no known expiry, or auto-refresh is off.
    pub async fn refresh_if_expiring(&self, threshold: Duration) -> Result<Option<Credential>> {
        let seen = self.current_credential();
        if !seen.expires_within(threshold, now_millis()) {
            return Ok(None);
        }
        if !self.auto_refresh {
            warn!(expires_at = ?seen.expires_at, "access token expiring soon and auto-refresh is disabled");
            return Ok(None);
        }
        debug!(expires_at = ?seen.expires_at, "access token expiring within threshold, refreshing");
        self.refresh_from(&seen).await.map(Some)
    }

    /// Refresh unless another caller already replaced `seen` while we waited
    /// for the lock, in which case the newer credential is returned as-is.
    async fn refresh_from(&self, seen: &Credential) -> Result<Credential> {
        let _guard = self.refresh_lock.lock().await;

        let live = self.current_credential();
        if live.access_token != seen.access_token {
            debug!("credential already replaced by a concurrent refresh");
            return Ok(live);
        }

        let response = refresh_token(&self.client, &self.refresh_endpoint, live.token())
            .await
            .inspect_err(|e| warn!(error = %e, "token refresh failed"))?;
        let renewed = Credential::from_token_response(response, now_millis());
        self.credential.send_replace(renewed.clone());
        info!(expires_at = ?renewed.expires_at, "access token refreshed");
        Ok(renewed)
    }

    /// Run `probe`, recovering once from an expired credential.
    ///
    /// If `probe` fails with `FailureReason::CredentialExpired`, the token is
    /// refreshed and `probe` runs exactly one more time; its second outcome is
    /// returned whatever it is. With auto-refresh disabled the expiry surfaces
    /// as `Error::CredentialExpired` and no refresh is attempted. Every other
    /// failure propagates untouched.
    pub async fn ensure_valid<T, E, F, Fut>(&self, mut probe: F) -> std::result::Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: AuthFailure + From<Error>,
    {
        let seen = self.current_credential();
        match probe().await {
            Err(e) if e.failure_reason() == FailureReason::CredentialExpired => {
                if !self.auto_refresh {
                    warn!("access token expired and auto-refresh is disabled");
                    return Err(Error::CredentialExpired.into());
                }
                info!("access token expired, refreshing and retrying once");
                self.refresh_from(&seen).await?;
                probe().await
            }
            outcome => outcome,
        }
    }
}
