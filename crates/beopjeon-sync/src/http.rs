//! Plain HTTP source adapter.

use std::time::Duration;

use async_trait::async_trait;
use beopjeon_core::{Format, RawPayload, SourceRef};
use chrono::Utc;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use tracing::{debug, info};

use crate::adapter::{declared_format, SourceAdapter};
use crate::error::{FetchError, SourceError};

/// Longest error body kept in a `Rejected` error.
const MAX_ERROR_BODY: usize = 200;

/// Shared client for every HTTP-backed adapter.
pub fn build_client(connect_timeout: Duration) -> Result<reqwest::Client, SourceError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("beopjeon/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(connect_timeout)
        .build()?)
}

/// Map a non-success HTTP status onto the fetch error taxonomy.
pub fn classify_status(status: u16, retry_after: Option<Duration>, body: String) -> FetchError {
    match status {
        404 | 410 => FetchError::NotFound(format!("HTTP {status}")),
        408 => FetchError::Timeout(format!("HTTP {status}")),
        429 => FetchError::RateLimited { retry_after },
        500..=599 => FetchError::TransientNetworkError(format!("HTTP {status}")),
        _ => FetchError::Rejected {
            status,
            body: body.chars().take(MAX_ERROR_BODY).collect(),
        },
    }
}

/// Map a transport-level reqwest error.
pub fn classify_transport(err: &reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(err.to_string())
    } else if err.is_builder() {
        FetchError::InvalidTarget(err.to_string())
    } else {
        FetchError::TransientNetworkError(err.to_string())
    }
}

/// `Retry-After` in delta-seconds form.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// GET the URL and return the body bytes, classifying failures.
pub(crate) async fn get_bytes(
    request: reqwest::RequestBuilder,
) -> Result<Vec<u8>, FetchError> {
    let resp = request.send().await.map_err(|e| classify_transport(&e))?;
    let status = resp.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(resp.headers());
        let body = resp.text().await.unwrap_or_default();
        return Err(classify_status(status.as_u16(), retry_after, body));
    }
    let bytes = resp.bytes().await.map_err(|e| classify_transport(&e))?;
    Ok(bytes.to_vec())
}

/// Fetches targets relative to a base URL.
pub struct HttpSource {
    id: String,
    client: reqwest::Client,
    base_url: String,
    auth: Option<String>,
    format: Option<Format>,
}

impl HttpSource {
    /// `base_url` should be like `https://example.org/laws` (no trailing slash needed).
    pub fn new(
        id: impl Into<String>,
        client: reqwest::Client,
        base_url: &str,
        auth: Option<String>,
        format: Option<Format>,
    ) -> Self {
        Self {
            id: id.into(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            format,
        }
    }

    /// Absolute targets are used as-is; anything else is joined to the base.
    pub fn url_for(&self, target: &SourceRef) -> String {
        let uri = target.uri.trim();
        if uri.starts_with("http://") || uri.starts_with("https://") {
            uri.to_string()
        } else {
            format!("{}/{}", self.base_url, uri.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl SourceAdapter for HttpSource {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, target: &SourceRef) -> Result<RawPayload, FetchError> {
        let url = self.url_for(target);
        debug!(source_id = %self.id, url = %url, "fetching");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.auth {
            request = request.bearer_auth(token);
        }
        let bytes = get_bytes(request).await?;

        info!(source_id = %self.id, url = %url, bytes = bytes.len(), "fetched");
        Ok(RawPayload {
            source: target.stamped(&bytes, Utc::now()),
            format: declared_format(self.format, target),
            bytes,
        })
    }
}
