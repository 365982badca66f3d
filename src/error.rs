//! Error types for the registration and pairing flows.
//!
//! Every fallible step maps onto one of these variants so callers (and
//! tests) can tell a malformed credential string from a transport failure
//! from exhausted registration retries. The binary converts these into
//! human-readable messages via `anyhow` at the top level.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the registration and pairing flows.
#[derive(Debug, Error)]
pub enum Error {
    /// A credential record string did not parse as `{androidId, securityToken}`.
    #[error("malformed credential record: {0}")]
    Format(String),

    /// Transport failure or malformed response on an HTTP exchange.
    #[error("network failure: {0}")]
    Network(String),

    /// The installation service returned no usable auth token.
    #[error("installation auth missing from response: {0}")]
    Auth(String),

    /// Every registration attempt came back with an error response.
    #[error("registration has failed")]
    Registration,

    /// The pairing wait was interrupted before a token arrived.
    #[error("pairing aborted before a token was received")]
    Aborted,

    /// The config file could not be read, parsed, or written.
    #[error("config file error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
