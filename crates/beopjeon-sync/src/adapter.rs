//! The source-adapter seam and source descriptors.

use async_trait::async_trait;
use beopjeon_core::{Format, RawPayload, SourceRef};
use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// Fetches raw payloads from one named source.
///
/// Implementations perform network or filesystem I/O only and never mutate
/// shared state. The returned payload carries a stamped copy of `target`
/// (fetch time, byte length and content hash).
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// The `source_id` this adapter serves.
    fn id(&self) -> &str;

    async fn fetch(&self, target: &SourceRef) -> Result<RawPayload, FetchError>;
}

/// How a source is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `base` is a URL prefix; targets are paths or absolute URLs.
    Http,
    /// `base` is a directory; targets are relative paths.
    File,
    /// `base` is a zip file; targets are entry names.
    Archive,
    /// law.go.kr Open API; targets are law serial numbers (MST), `auth` is the OC key.
    LawApi,
}

/// One `[[sources]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub id: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub base: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    /// Higher wins merge ties.
    #[serde(default)]
    pub trust_priority: i32,
}

/// Declared format for a target: the source's configured format, else the
/// target's extension. `None` leaves detection to the parser.
pub(crate) fn declared_format(configured: Option<Format>, target: &SourceRef) -> Option<Format> {
    configured.or_else(|| Format::from_extension(&target.uri))
}
