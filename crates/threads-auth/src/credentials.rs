//! Bearer credential and its on-disk store
//!
//! The store holds a single credential as JSON. Writes use atomic temp-file +
//! rename so a crash mid-write never leaves a truncated token file behind, and
//! a tokio Mutex serializes concurrent saves.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::token::TokenResponse;

/// The live bearer credential.
///
/// `expires_at` is a unix timestamp in milliseconds, computed from the
/// `expires_in` delta when the token was issued. `None` when the issuer did
/// not say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: Secret<String>,
    pub token_type: Option<String>,
    pub expires_at: Option<u64>,
}

impl Credential {
    /// A credential with no expiry metadata, e.g. from an env var.
    pub fn new(access_token: impl Into<Secret<String>>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            expires_at: None,
        }
    }

    /// Build from a token endpoint response received at `now_millis`.
    pub fn from_token_response(response: TokenResponse, now_millis: u64) -> Self {
        Self {
            access_token: Secret::new(response.access_token),
            token_type: response.token_type,
            expires_at: response
                .expires_in
                .map(|secs| now_millis.saturating_add(secs.saturating_mul(1000))),
        }
    }

    /// The raw token, for building a request.
    pub fn token(&self) -> &str {
        self.access_token.expose()
    }

    /// Whether the token expires within `window` of `now_millis`. Unknown
    /// expiry is never considered close.
    pub fn expires_within(&self, window: Duration, now_millis: u64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now_millis.saturating_add(window.as_millis() as u64),
            None => false,
        }
    }
}

/// Current time as unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Serialized form of a credential.
#[derive(Serialize, Deserialize)]
struct StoredCredential {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<u64>,
}

impl From<StoredCredential> for Credential {
    fn from(stored: StoredCredential) -> Self {
        Self {
            access_token: Secret::new(stored.access_token),
            token_type: stored.token_type,
            expires_at: stored.expires_at,
        }
    }
}

/// File-backed store for the operator's credential.
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored credential. Returns `Ok(None)` if the file doesn't exist.
    pub async fn load(&self) -> Result<Option<Credential>> {
        if !tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| Error::Io(format!("checking credential file: {e}")))?
        {
            debug!(path = %self.path.display(), "credential file not found");
            return Ok(None);
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
        let stored: StoredCredential = serde_json::from_str(&contents)
            .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
        if stored.access_token.trim().is_empty() {
            return Err(Error::CredentialParse(
                "credential file has an empty access_token".into(),
            ));
        }
        info!(path = %self.path.display(), expires_at = ?stored.expires_at, "loaded credential");
        Ok(Some(stored.into()))
    }

    /// Persist `credential`, replacing whatever was stored.
    pub async fn save(&self, credential: &Credential) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let stored = StoredCredential {
            access_token: credential.token().to_owned(),
            token_type: credential.token_type.clone(),
            expires_at: credential.expires_at,
        };
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| Error::CredentialParse(format!("serializing credential: {e}")))?;
        write_atomic(&self.path, json.as_bytes()).await
    }
}

/// Write `data` to `path` atomically with 0600 permissions on unix.
async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credential.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, data)
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credential");
    Ok(())
}
