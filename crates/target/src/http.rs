//! Shared plumbing for the target's HTTP APIs.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::TargetError;

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, TargetError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| TargetError::ClientInit(e.to_string()))
}

/// Adds the service-key headers every target API expects.
pub(crate) fn authorize(builder: reqwest::RequestBuilder, key: &str) -> reqwest::RequestBuilder {
    builder.header("apikey", key).bearer_auth(key)
}

/// Turns a non-2xx response into `TargetError::HttpStatus`.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, TargetError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_else(|_| "Could not read error body".to_owned());
    Err(TargetError::HttpStatus { code: status.as_u16(), body })
}

pub(crate) async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, TargetError> {
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|source| TargetError::Decode { context: context.to_owned(), source })
}
