//! Identity store backed by the target's auth admin API.

use std::time::Duration;

use async_trait::async_trait;
use nutrilog_core::{IDENTITY_PAGE_SIZE, TargetConfig, TargetIdentity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::TargetError;
use crate::http::{authorize, build_client, decode, ensure_success};
use crate::traits::{IdentityStore, NewIdentity};

#[derive(Deserialize)]
struct AuthUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<Map<String, Value>>,
}

impl From<AuthUser> for TargetIdentity {
    fn from(user: AuthUser) -> Self {
        Self { id: user.id, email: user.email, metadata: user.user_metadata.unwrap_or_default() }
    }
}

#[derive(Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<AuthUser>,
}

#[derive(Serialize)]
struct CreateUserRequest<'a> {
    id: Uuid,
    email: &'a str,
    email_confirm: bool,
    user_metadata: &'a Map<String, Value>,
}

#[derive(Serialize)]
struct UpdateUserRequest<'a> {
    user_metadata: &'a Map<String, Value>,
}

/// Admin client for the target identity store.
pub struct AuthAdminClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl std::fmt::Debug for AuthAdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthAdminClient")
            .field("base_url", &self.base_url)
            .field("service_key", &"***")
            .finish()
    }
}

impl AuthAdminClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &TargetConfig, timeout: Duration) -> Result<Self, TargetError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            service_key: config.service_key.clone(),
        })
    }

    fn users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }
}

#[async_trait]
impl IdentityStore for AuthAdminClient {
    async fn list_identities(&self) -> Result<Vec<TargetIdentity>, TargetError> {
        let mut identities = Vec::new();
        let mut page: usize = 1;
        loop {
            let response = authorize(self.client.get(self.users_url()), &self.service_key)
                .query(&[("page", page.to_string()), ("per_page", IDENTITY_PAGE_SIZE.to_string())])
                .send()
                .await?;
            let batch: UserPage = decode(ensure_success(response).await?, "identity page").await?;
            let fetched = batch.users.len();
            identities.extend(batch.users.into_iter().map(TargetIdentity::from));
            if fetched < IDENTITY_PAGE_SIZE {
                break;
            }
            page = page.saturating_add(1);
        }
        tracing::debug!(count = identities.len(), "listed target identities");
        Ok(identities)
    }

    async fn create_identity(&self, identity: &NewIdentity) -> Result<TargetIdentity, TargetError> {
        let request = CreateUserRequest {
            id: identity.id,
            email: &identity.email,
            email_confirm: identity.email_verified,
            user_metadata: &identity.metadata,
        };
        let response = authorize(self.client.post(self.users_url()), &self.service_key)
            .json(&request)
            .send()
            .await?;
        let response = match ensure_success(response).await {
            Err(TargetError::HttpStatus { code: 422, body }) if body.contains("already") => {
                return Err(TargetError::Duplicate(body));
            },
            other => other?,
        };
        let user: AuthUser = decode(response, "created identity").await?;
        Ok(user.into())
    }

    async fn update_metadata(
        &self,
        id: Uuid,
        metadata: &Map<String, Value>,
    ) -> Result<(), TargetError> {
        let url = format!("{}/{id}", self.users_url());
        let response = authorize(self.client.put(url), &self.service_key)
            .json(&UpdateUserRequest { user_metadata: metadata })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), TargetError> {
        let url = format!("{}/auth/v1/health", self.base_url);
        let response = authorize(self.client.get(url), &self.service_key).send().await?;
        ensure_success(response).await?;
        Ok(())
    }
}
