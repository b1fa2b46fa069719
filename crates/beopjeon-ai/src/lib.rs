//! AI enrichment: an optional, best-effort step applied after extraction.
//!
//! The corpus never depends on it. [`NoopEnricher`] is used when no model
//! endpoint is configured and in offline tests.

mod enrich;
#[cfg(feature = "http")]
mod http;

use async_trait::async_trait;
use beopjeon_core::StatuteDocument;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use enrich::{enrich_documents, EnrichStats};
#[cfg(feature = "http")]
pub use http::HttpEnricher;

/// Characters of statute text sent to the model by default.
pub const DEFAULT_EXCERPT_CHARS: usize = 4_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    Summarize,
    Reformat,
}

impl Instruction {
    /// Prompt preamble placed before the excerpt.
    pub fn prompt_prefix(&self) -> &'static str {
        match self {
            Self::Summarize => "다음 법령의 목적과 핵심 내용을 세 문장 이내로 요약하세요.",
            Self::Reformat => "다음 법령 본문을 조문 구조를 유지한 채 읽기 쉬운 형식으로 정리하세요.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichRequest {
    pub document_excerpt: String,
    pub instruction: Instruction,
}

impl EnrichRequest {
    /// Build a request from a document: title, preamble and article text,
    /// truncated to `max_chars` characters.
    pub fn for_document(doc: &StatuteDocument, instruction: Instruction, max_chars: usize) -> Self {
        let mut excerpt = doc.title.clone();
        if !doc.preamble.is_empty() {
            excerpt.push('\n');
            excerpt.push_str(&doc.preamble);
        }
        for article in doc.articles() {
            excerpt.push('\n');
            excerpt.push_str(&article.number_label);
            if let Some(h) = &article.heading {
                excerpt.push('(');
                excerpt.push_str(h);
                excerpt.push(')');
            }
            if !article.text.is_empty() {
                excerpt.push(' ');
                excerpt.push_str(&article.text);
            }
        }
        let document_excerpt = match excerpt.char_indices().nth(max_chars) {
            Some((cut, _)) => excerpt[..cut].to_string(),
            None => excerpt,
        };
        Self {
            document_excerpt,
            instruction,
        }
    }

    pub fn prompt(&self) -> String {
        format!("{}\n\n{}", self.instruction.prompt_prefix(), self.document_excerpt)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichResponse {
    pub text: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnrichError {
    #[error("communication error: {0}")]
    Communication(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("model not available: {0}")]
    ModelNotAvailable(String),
}

/// A model that can summarise or reformat statute text.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, request: &EnrichRequest) -> Result<EnrichResponse, EnrichError>;
}

/// Returns an empty response; documents pass through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnricher;

#[async_trait]
impl Enricher for NoopEnricher {
    async fn enrich(&self, _request: &EnrichRequest) -> Result<EnrichResponse, EnrichError> {
        Ok(EnrichResponse { text: String::new() })
    }
}
