//! CLI error types and exit codes

use thiserror::Error;

/// Failures owned by the binary itself. Library errors pass through
/// `anyhow` untouched and are mapped to exit codes by `exit_code`.
#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "no access token: set THREADS_ACCESS_TOKEN, or configure api.credentials_file or api.access_token_file"
    )]
    NoAccessToken,
}

/// Process exit status for a failed command.
///
/// - 2: configuration
/// - 3: credential missing, expired or not refreshable
/// - 4: container not ready before the poll ceiling
/// - 5: container reached ERROR or EXPIRED
/// - 130: interrupted
/// - 1: anything else
pub fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if cause.downcast_ref::<common::Error>().is_some() {
            return 2;
        }
        if cause.downcast_ref::<Error>().is_some() {
            return 3;
        }
        if let Some(auth) = cause.downcast_ref::<threads_auth::Error>() {
            return auth_exit_code(auth);
        }
        if let Some(api) = cause.downcast_ref::<threads_api::Error>() {
            return match api {
                threads_api::Error::Auth(auth) => auth_exit_code(auth),
                threads_api::Error::PollTimeout { .. } => 4,
                threads_api::Error::ContainerUnpublishable { .. } => 5,
                threads_api::Error::Cancelled { .. } => 130,
                _ => 1,
            };
        }
    }
    1
}

fn auth_exit_code(err: &threads_auth::Error) -> u8 {
    match err {
        threads_auth::Error::CredentialExpired
        | threads_auth::Error::Refresh { .. }
        | threads_auth::Error::TokenExchange(_) => 3,
        _ => 1,
    }
}
