use thiserror::Error;

/// Errors raised while building core types (configuration, selectors).
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("missing configuration: {0} must be set")]
    MissingConfig(&'static str),

    #[error("invalid configuration for {var}: {reason}")]
    InvalidConfig { var: &'static str, reason: String },

    #[error("unknown stage: {0} (expected all, users, foods or foodlogs)")]
    UnknownStage(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
