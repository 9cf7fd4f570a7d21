//! Backend error taxonomy.
//!
//! Configuration problems (bad provider name, missing credential) fail
//! at construction time; transport problems fail the `complete` call
//! that hit them. Absence is never an error here: read paths on the
//! history side use sentinel returns instead.

use std::fmt::Display;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// No backend registered under this name.
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// A required credential was absent at construction time.
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// The backend answered with a non-success HTTP status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never completed (timeout, refused connection, ...).
    #[error("transport error: {0}")]
    Transport(String),

    /// A 2xx response that does not carry the expected reply field.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Wrap a client error without tying this crate to an HTTP library.
    #[must_use]
    pub fn transport(err: impl Display) -> Self {
        Self::Transport(err.to_string())
    }
}
