//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The access token is never stored in the TOML directly: it comes from
//! THREADS_ACCESS_TOKEN, the credentials file, or access_token_file.

use common::Secret;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use threads_api::{PollSettings, TimeoutPolicy};
use threads_auth::{EXCHANGE_ENDPOINT, GRAPH_BASE_URL, REFRESH_ENDPOINT};

/// Default config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "threads-publish.toml";

/// Env var holding a long-lived access token
pub const ACCESS_TOKEN_ENV: &str = "THREADS_ACCESS_TOKEN";

/// Long-lived tokens last 60 days; renew during the last week
pub const DEFAULT_REFRESH_THRESHOLD_SECS: u64 = 7 * 24 * 60 * 60;

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poll: PollConfig,
    /// Token found in the environment or access_token_file. The credentials
    /// file is read asynchronously by the caller and sits between the two.
    #[serde(skip)]
    pub token_source: Option<TokenSource>,
}

/// Where a statically configured access token came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    Env(Secret<String>),
    File(Secret<String>),
}

/// Graph API settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub refresh_url: String,
    pub exchange_url: String,
    pub timeout_secs: u64,
    pub auto_refresh: bool,
    /// Refresh before a command when the token expires within this many
    /// seconds; 0 disables the check
    pub refresh_threshold_secs: u64,
    /// JSON credential written after every refresh
    pub credentials_file: Option<PathBuf>,
    /// Plain-text file containing only the access token
    pub access_token_file: Option<PathBuf>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: GRAPH_BASE_URL.to_string(),
            refresh_url: REFRESH_ENDPOINT.to_string(),
            exchange_url: EXCHANGE_ENDPOINT.to_string(),
            timeout_secs: 30,
            auto_refresh: true,
            refresh_threshold_secs: DEFAULT_REFRESH_THRESHOLD_SECS,
            credentials_file: None,
            access_token_file: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_threshold(&self) -> Duration {
        Duration::from_secs(self.refresh_threshold_secs)
    }
}

/// Container status polling
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub ceiling_secs: u64,
    pub on_timeout: TimeoutPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        let defaults = PollSettings::default();
        Self {
            interval_secs: defaults.interval.as_secs(),
            ceiling_secs: defaults.ceiling.as_secs(),
            on_timeout: defaults.on_timeout,
        }
    }
}

impl PollConfig {
    pub fn settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.interval_secs),
            ceiling: Duration::from_secs(self.ceiling_secs),
            on_timeout: self.on_timeout,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Like `load`, but a missing file yields the defaults. Used for the
    /// implicit default path only; an explicitly named file must exist.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Config::default().finish()
        }
    }

    fn finish(mut self) -> common::Result<Self> {
        self.validate()?;
        self.token_source = self.resolve_token()?;
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        for (name, url) in [
            ("base_url", &self.api.base_url),
            ("refresh_url", &self.api.refresh_url),
            ("exchange_url", &self.api.exchange_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.poll.interval_secs == 0 {
            return Err(common::Error::Config(
                "interval_secs must be greater than 0".into(),
            ));
        }
        if self.poll.ceiling_secs == 0 {
            return Err(common::Error::Config(
                "ceiling_secs must be greater than 0".into(),
            ));
        }
        if self.poll.interval_secs > self.poll.ceiling_secs {
            return Err(common::Error::Config(format!(
                "interval_secs ({}) must not exceed ceiling_secs ({})",
                self.poll.interval_secs, self.poll.ceiling_secs
            )));
        }
        Ok(())
    }

    /// Token resolution order:
    /// 1. THREADS_ACCESS_TOKEN env var
    /// 2. access_token_file path from config
    fn resolve_token(&self) -> common::Result<Option<TokenSource>> {
        if let Ok(token) = std::env::var(ACCESS_TOKEN_ENV) {
            let token = Secret::new(token.trim().to_owned());
            if !token.is_blank() {
                return Ok(Some(TokenSource::Env(token)));
            }
        }

        let Some(ref token_file) = self.api.access_token_file else {
            return Ok(None);
        };
        let token = std::fs::read_to_string(token_file).map_err(|e| {
            common::Error::Config(format!(
                "failed to read access_token_file {}: {e}",
                token_file.display()
            ))
        })?;
        let token = Secret::new(token.trim().to_owned());
        Ok((!token.is_blank()).then_some(TokenSource::File(token)))
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    ///
    /// The flag says whether the path was named explicitly.
    pub fn resolve_path(cli_path: Option<&Path>) -> (PathBuf, bool) {
        if let Some(p) = cli_path {
            return (p.to_path_buf(), true);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return (PathBuf::from(p), true);
        }
        (PathBuf::from(DEFAULT_CONFIG_FILE), false)
    }
}
