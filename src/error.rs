//! Error types surfaced by the library.

use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, EstatError>;

/// Failures a caller is expected to handle, usually by substituting the
/// placeholder dataset (see [`crate::report::placeholder_series`]).
#[derive(Error, Debug)]
pub enum EstatError {
    /// Network error, HTTP 5xx, or rate limiting that outlived the retry budget.
    #[error("transient fetch failure after {attempts} attempt(s): {message}")]
    TransientFetch { attempts: u32, message: String },

    /// Non-zero `RESULT.STATUS` inside the payload. Never retried.
    #[error("e-Stat API error (status {status}): {message}")]
    RemoteApi { status: u32, message: String },

    /// No application id could be resolved.
    #[error(
        "no e-Stat application id configured (explicit key, session, secrets file, or ESTAT_APP_ID)"
    )]
    AuthenticationMissing,

    /// Non-retryable HTTP status (4xx other than 429).
    #[error("request failed with HTTP {status}")]
    Http { status: u16 },

    /// Body was not the JSON document we expected.
    #[error("decode response: {0}")]
    Decode(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup: {0}")]
    ClientSetup(String),

    /// Table presets could not be read.
    #[error("presets: {0}")]
    Presets(String),

    /// Industry seed catalog could not be read.
    #[error("industry catalog: {0}")]
    Catalog(#[from] csv::Error),
}

/// Errors produced by a [`crate::api::Transport`] for a single attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("decode json: {0}")]
    Decode(String),
}

impl TransportError {
    /// Network errors, 5xx, and 429 are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Status(s) => *s >= 500 || *s == 429,
            Self::Decode(_) => false,
        }
    }
}

impl From<TransportError> for EstatError {
    fn from(e: TransportError) -> Self {
        match e {
            TransportError::Status(status) if status < 500 && status != 429 => {
                Self::Http { status }
            }
            TransportError::Decode(msg) => Self::Decode(msg),
            other => Self::TransientFetch {
                attempts: 1,
                message: other.to_string(),
            },
        }
    }
}
