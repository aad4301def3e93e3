//! threads-publish
//!
//! Command-line front end for the Threads publishing client:
//! 1. Loads config and resolves the access token
//! 2. Runs one API command through `ThreadsClient`
//! 3. Prints the result as JSON on stdout
//! 4. Persists the credential if it was refreshed along the way

mod config;
mod error;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use threads_api::ThreadsClient;
use threads_auth::{Credential, CredentialStore, TokenManager, exchange_long_lived, now_millis};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, TokenSource};

#[derive(Parser, Debug)]
#[command(name = "threads-publish")]
#[command(version, about = "Publish posts to Threads and read them back", long_about = None)]
struct Cli {
    /// Config file (default: CONFIG_PATH, then ./threads-publish.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the authenticated account
    Profile,
    /// Create a container, wait until it is ready, and publish it
    Post {
        #[arg(long)]
        text: String,
        /// Publicly reachable image to attach
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Create a media container without publishing it
    Create {
        #[arg(long)]
        text: String,
        #[arg(long)]
        image_url: Option<String>,
    },
    /// Check a container's processing status once
    Status { container_id: String },
    /// Publish a previously created container
    Publish { container_id: String },
    /// Read back a published post
    Get { media_id: String },
    /// Account insight counters
    Insights { user_id: String },
    /// Refresh the long-lived access token now
    Refresh,
    /// Exchange a short-lived token for a long-lived one
    Exchange {
        #[arg(long, env = "THREADS_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,
        /// Short-lived token from the authorization flow
        #[arg(long, env = "THREADS_SHORT_LIVED_TOKEN", hide_env_values = true)]
        token: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support.
    // Logs go to stderr; stdout carries command output only.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::from(error::exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (config_path, explicit) = Config::resolve_path(cli.config.as_deref());
    info!(path = %config_path.display(), explicit, "loading configuration");
    let config = if explicit {
        Config::load(&config_path)
    } else {
        Config::load_or_default(&config_path)
    }
    .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let http = reqwest::Client::builder()
        .timeout(config.api.timeout())
        .build()
        .context("failed to build HTTP client")?;
    let store = config.api.credentials_file.clone().map(CredentialStore::new);

    if let Command::Exchange {
        client_secret,
        token,
    } = &cli.command
    {
        return exchange(&http, &config, store.as_ref(), client_secret, token).await;
    }

    let credential = load_credential(&config, store.as_ref()).await?;
    let tokens = TokenManager::new(http.clone(), credential)
        .with_refresh_endpoint(config.api.refresh_url.clone())
        .with_auto_refresh(config.api.auto_refresh);
    let mut refreshed = tokens.subscribe();

    let client = ThreadsClient::new(http, Arc::new(tokens))
        .with_base_url(config.api.base_url.clone())
        .with_poll_settings(config.poll.settings());

    let outcome = prepare(&client, &cli.command, config.api.refresh_threshold()).await;
    let outcome = match outcome {
        Ok(()) => execute(&client, cli.command).await,
        Err(e) => Err(e),
    };

    // Persist even when the command failed after a successful refresh
    let persisted = persist_if_refreshed(&mut refreshed, store.as_ref()).await;
    settle(outcome, persisted)
}

impl Command {
    /// Commands that create or publish content on the account.
    fn writes_content(&self) -> bool {
        matches!(
            self,
            Command::Post { .. } | Command::Create { .. } | Command::Publish { .. }
        )
    }
}

/// Renew a token close to expiry, then confirm identity before any write so a
/// bad token fails before a container is created.
async fn prepare(client: &ThreadsClient, command: &Command, threshold: Duration) -> Result<()> {
    if !threshold.is_zero() && !matches!(command, Command::Refresh) {
        // The current token may still work; a failed early refresh is not fatal
        if let Err(e) = client.tokens().refresh_if_expiring(threshold).await {
            warn!(error = %e, "proactive token refresh failed, continuing with current token");
        }
    }
    if command.writes_content() {
        client.verify().await?;
    }
    Ok(())
}

/// The command's own failure takes precedence over a failed credential save,
/// which is then only reported.
fn settle(outcome: Result<()>, persisted: Result<()>) -> Result<()> {
    match (outcome, persisted) {
        (Err(e), Err(save)) => {
            error!(error = %format!("{save:#}"), "refreshed credential was not saved");
            eprintln!("Warning: {save:#}");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), persisted) => persisted,
    }
}

async fn execute(client: &ThreadsClient, command: Command) -> Result<()> {
    match command {
        Command::Profile => print_json(&client.verify().await?),
        Command::Post { text, image_url } => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling publish");
                    on_interrupt.cancel();
                }
            });
            let post = client
                .post_thread_cancellable(&text, image_url.as_deref(), cancel)
                .await?;
            print_json(&post)
        }
        Command::Create { text, image_url } => {
            print_json(&client.create_container(&text, image_url.as_deref()).await?)
        }
        Command::Status { container_id } => {
            let status = client.poll_status(&container_id).await?;
            print_json(&serde_json::json!({ "id": container_id, "status": status }))
        }
        Command::Publish { container_id } => print_json(&client.publish(&container_id).await?),
        Command::Get { media_id } => print_json(&client.retrieve_post(&media_id).await?),
        Command::Insights { user_id } => print_json(&client.retrieve_insights(&user_id).await?),
        Command::Refresh => {
            let (credential, profile) = client.refresh_credential().await?;
            print_json(&serde_json::json!({
                "expires_at": credential.expires_at,
                "profile": profile,
            }))
        }
        Command::Exchange { .. } => {
            anyhow::bail!("exchange runs before a credential is loaded")
        }
    }
}

/// THREADS_ACCESS_TOKEN, then the credentials file, then access_token_file.
async fn load_credential(config: &Config, store: Option<&CredentialStore>) -> Result<Credential> {
    if let Some(TokenSource::Env(token)) = &config.token_source {
        info!("using access token from THREADS_ACCESS_TOKEN");
        return Ok(Credential::new(token.clone()));
    }

    if let Some(store) = store {
        if let Some(credential) = store.load().await.with_context(|| {
            format!("failed to read credentials from {}", store.path().display())
        })? {
            return Ok(credential);
        }
    }

    match &config.token_source {
        Some(TokenSource::File(token)) => {
            info!("using access token from access_token_file");
            Ok(Credential::new(token.clone()))
        }
        _ => Err(error::Error::NoAccessToken.into()),
    }
}

async fn persist_if_refreshed(
    refreshed: &mut watch::Receiver<Credential>,
    store: Option<&CredentialStore>,
) -> Result<()> {
    if !refreshed.has_changed().unwrap_or(false) {
        return Ok(());
    }
    let credential = refreshed.borrow_and_update().clone();

    match store {
        Some(store) => {
            store.save(&credential).await.with_context(|| {
                format!("failed to save credentials to {}", store.path().display())
            })?;
            info!(path = %store.path().display(), "refreshed credential saved");
            eprintln!(
                "Access token refreshed and saved to {}",
                store.path().display()
            );
        }
        None => {
            warn!("access token refreshed but no credentials_file is configured");
            eprintln!(
                "Access token refreshed; configure api.credentials_file to keep it across runs"
            );
        }
    }
    Ok(())
}

async fn exchange(
    http: &reqwest::Client,
    config: &Config,
    store: Option<&CredentialStore>,
    client_secret: &str,
    short_lived_token: &str,
) -> Result<()> {
    let response = exchange_long_lived(
        http,
        &config.api.exchange_url,
        client_secret,
        short_lived_token,
    )
    .await?;
    let credential = Credential::from_token_response(response, now_millis());

    match store {
        Some(store) => {
            store.save(&credential).await.with_context(|| {
                format!("failed to save credentials to {}", store.path().display())
            })?;
            info!(path = %store.path().display(), "long-lived credential saved");
            print_json(&serde_json::json!({
                "credentials_file": store.path(),
                "expires_at": credential.expires_at,
            }))
        }
        // Nowhere to keep it, so hand the token to the operator
        None => print_json(&serde_json::json!({
            "access_token": credential.token(),
            "token_type": credential.token_type,
            "expires_at": credential.expires_at,
        })),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("failed to render output")?;
    println!("{rendered}");
    Ok(())
}
