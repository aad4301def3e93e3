//! Common types shared by the Threads publisher crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
