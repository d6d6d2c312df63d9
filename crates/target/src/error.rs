//! Typed error enum for the target backend.

use thiserror::Error;

/// Target-side error with variants covering every expected failure mode.
#[derive(Debug, Error)]
pub enum TargetError {
    /// Transport failure, including request timeouts.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Non-success response from an HTTP API.
    #[error("HTTP status {code}: {body}")]
    HttpStatus { code: u16, body: String },

    /// Unique constraint violation.
    #[error("duplicate: {0}")]
    Duplicate(String),

    /// SQL / connection / timeout failure.
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// Response body could not be decoded.
    #[error("decode error in {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Call did not finish within the enforced deadline.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("client initialization failed: {0}")]
    ClientInit(String),
}

impl TargetError {
    /// Whether this error is likely transient (worth retrying).
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpRequest(_) | Self::Timeout(_) => true,
            Self::HttpStatus { code, .. } => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Database(e) => matches!(e, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)),
            _ => false,
        }
    }
}

/// SQLSTATE 23505 maps to `Duplicate`; everything else to `Database`.
impl From<sqlx::Error> for TargetError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.code().is_some_and(|c| c == "23505") => {
                Self::Duplicate(db_err.message().to_owned())
            },
            _ => Self::Database(err),
        }
    }
}
