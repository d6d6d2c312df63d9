//! Target backend trait abstraction.

use async_trait::async_trait;
use nutrilog_core::{FoodKey, TargetFood, TargetFoodLog, TargetIdentity, normalize_email};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::TargetError;

/// Identity to be created in the target identity store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewIdentity {
    pub id: Uuid,
    pub email: String,
    pub email_verified: bool,
    pub metadata: Map<String, Value>,
}

/// Identity store (users).
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Every identity currently in the store. Paged implementations bound
    /// each page request, not the listing as a whole.
    async fn list_identities(&self) -> Result<Vec<TargetIdentity>, TargetError>;

    /// Identity whose email matches case-insensitively.
    async fn find_by_email(&self, email: &str) -> Result<Option<TargetIdentity>, TargetError> {
        let wanted = normalize_email(email);
        Ok(self
            .list_identities()
            .await?
            .into_iter()
            .find(|identity| identity.email_key().as_deref() == Some(wanted.as_str())))
    }

    async fn create_identity(&self, identity: &NewIdentity) -> Result<TargetIdentity, TargetError>;

    /// Replaces the identity's metadata with `metadata`.
    async fn update_metadata(
        &self,
        id: Uuid,
        metadata: &Map<String, Value>,
    ) -> Result<(), TargetError>;

    async fn ping(&self) -> Result<(), TargetError>;
}

/// Structured-record collections (`foods`, `food_logs`).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Inserts all rows in one statement; either every row lands or none does.
    async fn insert_foods(&self, foods: &[TargetFood]) -> Result<(), TargetError>;

    /// Inserts all rows in one statement; either every row lands or none does.
    async fn insert_food_logs(&self, logs: &[TargetFoodLog]) -> Result<(), TargetError>;

    /// Natural keys of every stored food.
    async fn list_food_keys(&self) -> Result<Vec<FoodKey>, TargetError>;

    async fn ping(&self) -> Result<(), TargetError>;
}

/// Blob storage bound to a single bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Uploads `bytes` under `name`, overwriting any existing object.
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<(), TargetError>;

    /// Publicly resolvable URL of the object `name`.
    fn public_url(&self, name: &str) -> String;
}
