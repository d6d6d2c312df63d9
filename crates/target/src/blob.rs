//! Blob store backed by the target's storage API.

use std::time::Duration;

use async_trait::async_trait;
use nutrilog_core::TargetConfig;

use crate::error::TargetError;
use crate::http::{authorize, build_client, ensure_success};
use crate::traits::BlobStore;

/// Storage API client bound to one bucket.
pub struct BucketClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl std::fmt::Debug for BucketClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketClient")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .field("service_key", &"***")
            .finish()
    }
}

impl BucketClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &TargetConfig, timeout: Duration) -> Result<Self, TargetError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            service_key: config.service_key.clone(),
            bucket: config.asset_bucket.clone(),
        })
    }

    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl BlobStore for BucketClient {
    async fn upload(
        &self,
        name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), TargetError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, name);
        let size = bytes.len();
        let response = authorize(self.client.post(url), &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes)
            .send()
            .await?;
        ensure_success(response).await?;
        tracing::debug!(bucket = %self.bucket, name, size, "uploaded asset");
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, self.bucket, name)
    }
}
