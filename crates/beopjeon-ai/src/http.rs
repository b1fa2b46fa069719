//! Enricher backed by an Ollama-compatible `/api/generate` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{EnrichError, EnrichRequest, EnrichResponse, Enricher};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

pub struct HttpEnricher {
    endpoint: String,
    model: String,
    client: reqwest::Client,
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl HttpEnricher {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Result<Self, EnrichError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| EnrichError::Communication(e.to_string()))?;
        Ok(Self::with_client(client, endpoint, model))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }
}

fn classify(status: reqwest::StatusCode, body: String, model: &str) -> EnrichError {
    match status.as_u16() {
        404 => EnrichError::ModelNotAvailable(model.to_string()),
        429 => EnrichError::RateLimited,
        _ => EnrichError::Communication(format!("HTTP {status}: {body}")),
    }
}

fn is_retryable(err: &EnrichError) -> bool {
    matches!(err, EnrichError::Communication(_) | EnrichError::RateLimited)
}

#[async_trait]
impl Enricher for HttpEnricher {
    async fn enrich(&self, request: &EnrichRequest) -> Result<EnrichResponse, EnrichError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt: request.prompt(),
            stream: false,
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            let result = match self.client.post(self.url()).json(&body).send().await {
                Ok(response) if response.status().is_success() => response
                    .json::<GenerateResponse>()
                    .await
                    .map(|r| EnrichResponse { text: r.response })
                    .map_err(|e| EnrichError::InvalidResponse(e.to_string())),
                Ok(response) => {
                    let status = response.status();
                    let text = response.text().await.unwrap_or_default();
                    Err(classify(status, text, &self.model))
                }
                Err(e) => Err(EnrichError::Communication(e.to_string())),
            };

            match result {
                Err(e) if is_retryable(&e) && attempts < self.max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempts - 1));
                    debug!(attempt = attempts, delay_s = delay.as_secs(), error = %e, "enrichment retry");
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Instruction;

    #[test]
    fn status_classification() {
        assert_eq!(
            classify(reqwest::StatusCode::NOT_FOUND, String::new(), "qwen"),
            EnrichError::ModelNotAvailable("qwen".into())
        );
        assert_eq!(
            classify(reqwest::StatusCode::TOO_MANY_REQUESTS, String::new(), "qwen"),
            EnrichError::RateLimited
        );
        assert!(matches!(
            classify(reqwest::StatusCode::BAD_GATEWAY, "down".into(), "qwen"),
            EnrichError::Communication(_)
        ));
        assert!(!is_retryable(&EnrichError::ModelNotAvailable("qwen".into())));
    }

    #[test]
    fn endpoint_is_normalised() {
        let enricher = HttpEnricher::with_client(reqwest::Client::new(), "http://localhost:11434/", "qwen");
        assert_eq!(enricher.url(), "http://localhost:11434/api/generate");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_communication_error() {
        let enricher = HttpEnricher::with_client(reqwest::Client::new(), "http://127.0.0.1:9", "qwen").with_max_retries(1);
        let request = EnrichRequest {
            document_excerpt: "도로법".into(),
            instruction: Instruction::Summarize,
        };
        let err = enricher.enrich(&request).await.unwrap_err();
        assert!(matches!(err, EnrichError::Communication(_)));
    }
}
