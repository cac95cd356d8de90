//! Shared HTTP plumbing for the Google REST adapters.

use std::time::Duration;

use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AdapterError, Result};

/// Build the HTTP client used by every REST backend.
pub(crate) fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent("biseo/0.1")
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

/// Parse a base URL, tolerating a trailing slash.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| AdapterError::Config(format!("invalid base url `{raw}`: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(AdapterError::Config(format!("`{raw}` cannot be a base url")));
    }
    Ok(url)
}

/// Append path segments to `base`, percent-encoding each one.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|()| AdapterError::Config(format!("`{base}` cannot be a base url")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Map non-success statuses to errors; 404 and 410 become `NotFound`.
pub(crate) async fn ensure_success(response: Response, resource: &str) -> Result<Response> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
        return Err(AdapterError::NotFound {
            resource: resource.to_string(),
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AdapterError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

/// Check the status, then decode the body as `T`.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response, resource: &str) -> Result<T> {
    let response = ensure_success(response, resource).await?;
    let body = response.text().await?;
    serde_json::from_str(&body)
        .map_err(|e| AdapterError::InvalidResponse(format!("{resource}: {e}")))
}
