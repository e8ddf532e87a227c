//! Error types for girder-client operations.

use thiserror::Error;

/// The error type for page fetch operations.
///
/// Variants are split along one axis that matters to callers: whether the
/// failure is transient (worth retrying) or terminal. [`Error::is_retryable`]
/// encodes that split so the retry loop and the fetch coordinator never
/// pattern-match on individual variants.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure (connect, timeout, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server rejected the credentials. Never retried.
    #[error("authentication rejected (status {status})")]
    Auth {
        /// HTTP status code returned by the server (401 or 403).
        status: u16,
    },

    /// The request itself was malformed (bad JQL, bad cursor). Never retried.
    #[error("bad request (status {status}): {body}")]
    BadRequest {
        /// HTTP status code returned by the server.
        status: u16,
        /// Response body, truncated for logging.
        body: String,
    },

    /// The server asked us to slow down.
    #[error("rate limited by remote API")]
    RateLimited,

    /// Server-side failure (5xx).
    #[error("server error (status {status})")]
    Server {
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// The response was 200 but did not deserialize into a search page.
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),

    /// A retryable failure persisted through every allowed attempt.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made before giving up.
        attempts: u32,
        /// The final error observed.
        last: Box<Error>,
    },
}

impl Error {
    /// Whether the failure is transient and the request may be retried.
    ///
    /// Authorization and malformed-request errors are terminal; retrying
    /// them can only burn the rate budget. `RetriesExhausted` is terminal
    /// by construction.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited | Self::Server { .. } => true,
            Self::Auth { .. }
            | Self::BadRequest { .. }
            | Self::UnexpectedBody(_)
            | Self::RetriesExhausted { .. } => false,
        }
    }

    /// Whether this is a terminal wrapper around exhausted retries, as
    /// opposed to a failure that was never retryable in the first place.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::RetriesExhausted { .. })
    }

    /// Classify a non-success HTTP status into an error.
    ///
    /// The body is truncated to keep log lines bounded.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        const MAX_BODY: usize = 500;
        match status {
            401 | 403 => Self::Auth { status },
            429 => Self::RateLimited,
            400..=499 => Self::BadRequest {
                status,
                body: body.chars().take(MAX_BODY).collect(),
            },
            _ => Self::Server { status },
        }
    }
}

/// A specialized Result type for girder-client operations.
pub type Result<T> = std::result::Result<T, Error>;
