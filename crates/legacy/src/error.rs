//! Typed error enum for the legacy reader.

use thiserror::Error;

/// Errors from legacy backend queries.
#[derive(Debug, Error)]
pub enum LegacyError {
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),
    #[error("HTTP status {code}: {body}")]
    HttpStatus { code: u16, body: String },
    #[error("JSON parse error in {context}: {source}")]
    JsonParse {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("response for {0} carried no count")]
    MissingCount(String),
    #[error("client initialization failed: {0}")]
    ClientInit(String),
    #[error("all retries exhausted, last error: {0}")]
    RetriesExhausted(Box<LegacyError>),
}

impl LegacyError {
    /// Whether this error is transient and should be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpRequest(_) => true,
            Self::HttpStatus { code, .. } => matches!(code, 429 | 500 | 502 | 503 | 504),
            _ => false,
        }
    }

    /// Whether the backend rejected our credentials.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::HttpStatus { code, .. } => matches!(code, 401 | 403),
            Self::RetriesExhausted(inner) => inner.is_auth(),
            _ => false,
        }
    }
}
