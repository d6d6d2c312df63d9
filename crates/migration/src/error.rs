//! Typed error enum for the migration engine.
//!
//! Only `SourceUnavailable` and `TargetUnavailable` abort a run; every other
//! variant is converted into an [`ErrorRecord`] where it occurs.

use std::future::Future;
use std::time::Duration;

use nutrilog_core::{EntityKind, ErrorKind, ErrorRecord};
use nutrilog_legacy::LegacyError;
use nutrilog_target::TargetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    /// Legacy backend unreachable or rejecting credentials.
    #[error("legacy backend unavailable ({context}): {source}")]
    SourceUnavailable {
        context: String,
        #[source]
        source: LegacyError,
    },

    /// Target backend failed a connectivity check, or could not list what a
    /// map rebuild needs. `context` tells the two apart.
    #[error("target backend unavailable ({context}): {source}")]
    TargetUnavailable {
        context: String,
        #[source]
        source: TargetError,
    },

    #[error("{} {legacy_id} is missing required field `{field}`", kind.as_str())]
    MissingRequiredField { kind: EntityKind, legacy_id: String, field: &'static str },

    #[error(
        "{} {legacy_id} references {} {}, which has no migrated counterpart",
        kind.as_str(),
        reference.as_str(),
        reference_id.as_deref().unwrap_or("<none>")
    )]
    UnresolvedReference {
        kind: EntityKind,
        legacy_id: String,
        reference: EntityKind,
        reference_id: Option<String>,
    },

    /// One record of a batch whose insert failed; every record of the batch
    /// gets its own entry.
    #[error("{} {legacy_id} not written: batch {batch} ({size} records) failed: {reason}", kind.as_str())]
    BatchWriteFailure { kind: EntityKind, legacy_id: String, batch: usize, size: usize, reason: String },

    #[error("identity write for user {legacy_id} failed: {source}")]
    IdentityWrite {
        legacy_id: String,
        #[source]
        source: TargetError,
    },

    #[error("photo of food log {legacy_id} kept at {url}: {reason}")]
    AssetMigrationFailure { legacy_id: String, url: String, reason: String },
}

impl MigrationError {
    pub(crate) fn source_unavailable(context: impl Into<String>, source: LegacyError) -> Self {
        Self::SourceUnavailable { context: context.into(), source }
    }

    pub(crate) fn target_unavailable(context: impl Into<String>, source: TargetError) -> Self {
        Self::TargetUnavailable { context: context.into(), source }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::TargetUnavailable { .. } => ErrorKind::TargetUnavailable,
            Self::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            Self::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Self::BatchWriteFailure { .. } => ErrorKind::BatchWriteFailure,
            Self::IdentityWrite { .. } => ErrorKind::IdentityWriteFailure,
            Self::AssetMigrationFailure { .. } => ErrorKind::AssetMigrationFailure,
        }
    }

    /// Whether this error stops the whole run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. } | Self::TargetUnavailable { .. })
    }

    /// Report entry for a per-record failure in `stage`.
    #[must_use]
    pub fn to_record(&self, stage: EntityKind) -> ErrorRecord {
        let record = match self {
            Self::AssetMigrationFailure { .. } => ErrorRecord::warning(stage, self.kind(), self.to_string()),
            _ => ErrorRecord::error(stage, self.kind(), self.to_string()),
        };
        match self {
            Self::MissingRequiredField { legacy_id, field, .. } => {
                record.with_context("legacy_id", legacy_id.as_str()).with_context("field", *field)
            },
            Self::UnresolvedReference { legacy_id, reference, reference_id, .. } => record
                .with_context("legacy_id", legacy_id.as_str())
                .with_context("reference", reference.as_str())
                .with_context("reference_id", reference_id.clone().unwrap_or_default()),
            Self::BatchWriteFailure { legacy_id, batch, size, .. } => record
                .with_context("legacy_id", legacy_id.as_str())
                .with_context("batch", batch.to_string())
                .with_context("batch_size", size.to_string()),
            Self::IdentityWrite { legacy_id, .. } => record.with_context("legacy_id", legacy_id.as_str()),
            Self::AssetMigrationFailure { legacy_id, url, .. } => {
                record.with_context("legacy_id", legacy_id.as_str()).with_context("source_url", url.as_str())
            },
            Self::SourceUnavailable { context, .. } | Self::TargetUnavailable { context, .. } => {
                record.with_context("during", context.as_str())
            },
        }
    }
}

/// Runs a target call under `timeout`; elapsing counts as a failed call.
pub(crate) async fn within<T, F>(timeout: Duration, call: F) -> Result<T, TargetError>
where
    F: Future<Output = Result<T, TargetError>>,
{
    tokio::time::timeout(timeout, call).await.map_err(|_| TargetError::Timeout(timeout))?
}
