//! Dedup-aware identity writer. Re-running the user stage never creates a
//! second identity for the same email.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nutrilog_core::constants::MIGRATED_MARKER;
use nutrilog_core::{TargetIdentity, TargetUser, normalize_email};
use nutrilog_target::{IdentityStore, NewIdentity, TargetError};
use serde_json::{Map, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{MigrationError, within};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: Uuid,
    /// A new identity was created (otherwise an existing one was reused).
    pub created: bool,
    /// Provenance metadata was merged into an existing identity.
    pub metadata_merged: bool,
}

/// Provenance attached to every migrated identity.
#[must_use]
pub fn provenance_metadata(user: &TargetUser) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert(MIGRATED_MARKER.to_owned(), Value::Bool(true));
    metadata.insert("legacy_id".to_owned(), Value::String(user.legacy_id.clone()));
    if let Some(username) = &user.username {
        metadata.insert("username".to_owned(), Value::String(username.clone()));
    }
    metadata.insert("migrated_at".to_owned(), Value::String(Utc::now().to_rfc3339()));
    metadata
}

fn has_marker(metadata: &Map<String, Value>) -> bool {
    metadata.get(MIGRATED_MARKER).and_then(Value::as_bool).unwrap_or(false)
}

/// Upserts users by case-insensitive email.
///
/// Existing identities are loaded once, on first use, and kept current as
/// identities are created.
pub struct UserWriter {
    store: Arc<dyn IdentityStore>,
    timeout: Duration,
    index: Option<HashMap<String, TargetIdentity>>,
}

impl UserWriter {
    #[must_use]
    pub fn new(store: Arc<dyn IdentityStore>, timeout: Duration) -> Self {
        Self { store, timeout, index: None }
    }

    async fn index(&mut self) -> Result<&mut HashMap<String, TargetIdentity>, MigrationError> {
        if self.index.is_none() {
            // Paged listing: each page request carries the client timeout.
            let identities = self
                .store
                .list_identities()
                .await
                .map_err(|e| MigrationError::target_unavailable("loading existing identities for the user stage", e))?;
            let mut index = HashMap::with_capacity(identities.len());
            for identity in identities {
                if let Some(key) = identity.email_key() {
                    index.entry(key).or_insert(identity);
                }
            }
            info!(count = index.len(), "Loaded existing identities");
            self.index = Some(index);
        }
        Ok(self.index.get_or_insert_with(HashMap::new))
    }

    /// Reuses the identity with the same email or creates one.
    ///
    /// # Errors
    /// `TargetUnavailable` when existing identities cannot be listed;
    /// `IdentityWrite` when this user's create or metadata merge fails.
    pub async fn upsert(&mut self, user: &TargetUser) -> Result<UpsertOutcome, MigrationError> {
        let key = normalize_email(&user.email);
        let existing = self.index().await?.get(&key).cloned();
        if let Some(identity) = existing {
            return self.reuse(identity, user).await;
        }

        let new_identity = NewIdentity {
            id: user.id,
            email: user.email.clone(),
            email_verified: user.email_verified,
            metadata: provenance_metadata(user),
        };
        match within(self.timeout, self.store.create_identity(&new_identity)).await {
            Ok(created) => {
                debug!(legacy_id = %user.legacy_id, id = %created.id, "Created identity");
                let id = created.id;
                self.index().await?.insert(key, created);
                Ok(UpsertOutcome { id, created: true, metadata_merged: false })
            },
            Err(TargetError::Duplicate(reason)) => {
                debug!(legacy_id = %user.legacy_id, %reason, "Identity appeared concurrently, reusing");
                let found = self
                    .store
                    .find_by_email(&user.email)
                    .await
                    .map_err(|source| identity_write(user, source))?;
                let Some(identity) = found else {
                    return Err(identity_write(user, TargetError::Duplicate(reason)));
                };
                self.index().await?.insert(key, identity.clone());
                self.reuse(identity, user).await
            },
            Err(source) => Err(identity_write(user, source)),
        }
    }

    async fn reuse(
        &mut self,
        identity: TargetIdentity,
        user: &TargetUser,
    ) -> Result<UpsertOutcome, MigrationError> {
        if has_marker(&identity.metadata) {
            return Ok(UpsertOutcome { id: identity.id, created: false, metadata_merged: false });
        }

        let mut merged = identity.metadata.clone();
        merged.extend(provenance_metadata(user));
        within(self.timeout, self.store.update_metadata(identity.id, &merged))
            .await
            .map_err(|source| identity_write(user, source))?;
        debug!(legacy_id = %user.legacy_id, id = %identity.id, "Merged provenance into existing identity");

        let key = normalize_email(&user.email);
        let id = identity.id;
        self.index().await?.insert(key, TargetIdentity { metadata: merged, ..identity });
        Ok(UpsertOutcome { id, created: false, metadata_merged: true })
    }
}

fn identity_write(user: &TargetUser, source: TargetError) -> MigrationError {
    MigrationError::IdentityWrite { legacy_id: user.legacy_id.clone(), source }
}
