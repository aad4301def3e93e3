//! Threads access-token lifecycle
//!
//! Holds the live bearer credential, detects expiry failures from the Graph
//! API, and refreshes long-lived tokens. Independent of the content API so it
//! can be tested and reused on its own.
//!
//! Credential flow:
//! 1. Operator obtains a short-lived token and calls `token::exchange_long_lived()`
//! 2. The long-lived token seeds a `TokenManager`
//! 3. API calls run through `TokenManager::ensure_valid()`; an expiry failure
//!    triggers `TokenManager::refresh()` and a single retry
//! 4. Subscribers to `TokenManager::subscribe()` persist the new credential,
//!    e.g. via `CredentialStore::save()`

pub mod classify;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod manager;
pub mod token;

pub use classify::{AuthFailure, FailureReason, GraphError, classify_failure};
pub use constants::*;
pub use credentials::{Credential, CredentialStore, now_millis};
pub use error::{Error, Result};
pub use manager::TokenManager;
pub use token::{TokenResponse, exchange_long_lived, refresh_token};
