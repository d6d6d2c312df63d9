//! Best-effort transfer of food log photos into target blob storage.

use std::sync::Arc;
use std::time::Duration;

use nutrilog_target::BlobStore;
use reqwest::Url;
use tracing::debug;

use crate::error::within;

const KNOWN_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "heic", "webp"];
const DEFAULT_EXTENSION: &str = "jpg";

/// Result of one transfer. `Fallback` keeps the legacy URL so the owning
/// record can still be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetOutcome {
    Migrated { url: String },
    Fallback { url: String, reason: String },
}

impl AssetOutcome {
    /// URL to persist on the record.
    #[must_use]
    pub fn url(&self) -> &str {
        match self {
            Self::Migrated { url } | Self::Fallback { url, .. } => url,
        }
    }

    #[must_use]
    pub const fn is_migrated(&self) -> bool {
        matches!(self, Self::Migrated { .. })
    }
}

/// MIME type derived from a target object name's extension.
#[must_use]
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("heic") => "image/heic",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Deterministic object name for a food log's photo:
/// `food-logs/{legacy_id}.{ext}`, with `ext` taken from the source URL path.
#[must_use]
pub fn asset_name(legacy_id: &str, source_url: &str) -> String {
    let path = Url::parse(source_url).map_or_else(|_| source_url.to_owned(), |url| url.path().to_owned());
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| KNOWN_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_owned());
    format!("food-logs/{legacy_id}.{ext}")
}

/// Downloads legacy assets over HTTP(S) and re-uploads them to a blob store.
pub struct AssetMigrator {
    client: reqwest::Client,
    store: Arc<dyn BlobStore>,
    timeout: Duration,
}

impl std::fmt::Debug for AssetMigrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetMigrator").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}

impl AssetMigrator {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(store: Arc<dyn BlobStore>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, store, timeout })
    }

    /// Moves `source_url` to `target_name`. Never fails: any error yields
    /// [`AssetOutcome::Fallback`] carrying `source_url` verbatim.
    pub async fn migrate(&self, source_url: &str, target_name: &str) -> AssetOutcome {
        match self.transfer(source_url, target_name).await {
            Ok(url) => {
                debug!(source_url, target_name, "asset migrated");
                AssetOutcome::Migrated { url }
            },
            Err(reason) => AssetOutcome::Fallback { url: source_url.to_owned(), reason },
        }
    }

    async fn transfer(&self, source_url: &str, target_name: &str) -> Result<String, String> {
        let url = Url::parse(source_url).map_err(|e| format!("invalid source URL: {e}"))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!("unsupported scheme '{}'", url.scheme()));
        }
        let response = self.client.get(url).send().await.map_err(|e| format!("download failed: {e}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("download returned HTTP {}", status.as_u16()));
        }
        let bytes = response.bytes().await.map_err(|e| format!("download failed: {e}"))?;

        let content_type = content_type_for(target_name);
        within(self.timeout, self.store.upload(target_name, bytes.to_vec(), content_type))
            .await
            .map_err(|e| format!("upload failed: {e}"))?;
        Ok(self.store.public_url(target_name))
    }
}
