use async_trait::async_trait;
use nutrilog_core::{EntityKind, LegacyRecord};

use crate::error::LegacyError;

/// Read-only access to legacy entities.
///
/// Each `fetch` returns a finite, fully materialised sequence of at most
/// `limit` records; foreign references are expanded inline where the backend
/// supports it.
#[async_trait]
pub trait LegacySource: Send + Sync {
    /// Fetches up to `limit` records of one entity type, oldest first.
    async fn fetch(&self, kind: EntityKind, limit: usize)
    -> Result<Vec<LegacyRecord>, LegacyError>;

    /// Total number of records of one entity type.
    async fn count(&self, kind: EntityKind) -> Result<usize, LegacyError>;

    /// Cheap reachability check run before any stage.
    async fn ping(&self) -> Result<(), LegacyError> {
        self.count(EntityKind::User).await.map(|_| ())
    }
}
