use std::time::Duration;

use async_trait::async_trait;
use nutrilog_core::{EntityKind, LegacyConfig, LegacyRecord};
use serde::Deserialize;
use serde_json::Value;

use crate::error::LegacyError;
use crate::source::LegacySource;

const MAX_RETRIES: usize = 3;
const RETRY_DELAYS_SECS: [u64; 4] = [0, 1, 2, 4];

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Value>,
    count: Option<usize>,
}

/// REST client for the legacy backend, authenticated with the master key.
pub struct LegacyClient {
    client: reqwest::Client,
    base_url: String,
    app_id: String,
    master_key: String,
    retry_delays: Vec<Duration>,
}

impl std::fmt::Debug for LegacyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyClient")
            .field("base_url", &self.base_url)
            .field("app_id", &self.app_id)
            .field("master_key", &"***")
            .finish()
    }
}

impl LegacyClient {
    /// Creates a client with the given per-request timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (TLS backend failure).
    pub fn new(config: &LegacyConfig, timeout: Duration) -> Result<Self, LegacyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LegacyError::ClientInit(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.server_url.trim_end_matches('/').to_owned(),
            app_id: config.app_id.clone(),
            master_key: config.master_key.clone(),
            retry_delays: RETRY_DELAYS_SECS.iter().map(|s| Duration::from_secs(*s)).collect(),
        })
    }

    /// Overrides the backoff schedule. Entry `n` is the wait before attempt `n`.
    #[must_use]
    pub fn with_retry_delays(mut self, delays: Vec<Duration>) -> Self {
        self.retry_delays = delays;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(kind: EntityKind) -> &'static str {
        match kind {
            EntityKind::User => "users",
            EntityKind::Food => "classes/Food",
            EntityKind::FoodLog => "classes/FoodLog",
        }
    }

    fn include(kind: EntityKind) -> Option<&'static str> {
        match kind {
            EntityKind::FoodLog => Some("user,food"),
            EntityKind::User | EntityKind::Food => None,
        }
    }

    async fn query(&self, kind: EntityKind, params: &[(&str, String)]) -> Result<QueryResponse, LegacyError> {
        let url = format!("{}/{}", self.base_url, Self::endpoint(kind));
        let mut last_error: Option<LegacyError> = None;

        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = self.retry_delays.get(attempt).copied().unwrap_or(Duration::from_secs(4));
                tracing::warn!(%kind, "legacy query retry attempt {attempt}/{MAX_RETRIES} after {delay:?}");
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .get(&url)
                .header("X-Parse-Application-Id", &self.app_id)
                .header("X-Parse-Master-Key", &self.master_key)
                .query(params)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LegacyError::HttpRequest(e));
                    continue;
                },
            };

            let status = response.status();
            if status.is_success() {
                let body = match response.text().await {
                    Ok(b) => b,
                    Err(e) => {
                        last_error = Some(LegacyError::HttpRequest(e));
                        continue;
                    },
                };
                return serde_json::from_str(&body).map_err(|e| LegacyError::JsonParse {
                    context: format!("{kind} query (body: {})", truncate(&body, 200)),
                    source: e,
                });
            }

            let body =
                response.text().await.unwrap_or_else(|_| "Could not read error body".to_owned());
            let err = LegacyError::HttpStatus { code: status.as_u16(), body };
            if err.is_transient() {
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(LegacyError::RetriesExhausted(Box::new(
            last_error.unwrap_or(LegacyError::MissingCount(kind.to_string())),
        )))
    }
}

#[async_trait]
impl LegacySource for LegacyClient {
    async fn fetch(
        &self,
        kind: EntityKind,
        limit: usize,
    ) -> Result<Vec<LegacyRecord>, LegacyError> {
        let mut params = vec![("limit", limit.to_string()), ("order", "createdAt".to_owned())];
        if let Some(include) = Self::include(kind) {
            params.push(("include", include.to_owned()));
        }
        let response = self.query(kind, &params).await?;

        let fetched = response.results.len();
        let records: Vec<LegacyRecord> = response
            .results
            .into_iter()
            .filter_map(|value| LegacyRecord::from_json(kind, value))
            .collect();
        if records.len() < fetched {
            tracing::warn!(
                %kind,
                dropped = fetched - records.len(),
                "legacy rows without objectId ignored"
            );
        }
        tracing::debug!(%kind, count = records.len(), limit, "fetched legacy records");
        Ok(records)
    }

    async fn count(&self, kind: EntityKind) -> Result<usize, LegacyError> {
        let params = [("limit", "0".to_owned()), ("count", "1".to_owned())];
        let response = self.query(kind, &params).await?;
        response.count.ok_or_else(|| LegacyError::MissingCount(kind.to_string()))
    }
}

/// Truncates a string to the given maximum length at a char boundary.
fn truncate(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        s
    } else {
        let mut end = max_len;
        while end > 0 && !s.is_char_boundary(end) {
            end = end.saturating_sub(1);
        }
        s.get(..end).unwrap_or("")
    }
}
