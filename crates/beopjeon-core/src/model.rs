//! Canonical statute model shared by every pipeline stage.
//!
//! `SourceRef`, `RawPayload` and `TextLine` live for a single fetch-parse
//! cycle. `StatuteDocument` is produced by the structure extractor and is
//! never mutated afterwards: later stages build new values from it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::ordinal;
use crate::warning::StructuralWarning;

// ── Provenance ──

/// Where a payload came from.
///
/// A descriptor (`fetched_at`, `content_hash` and `byte_len` unset) names the
/// target to fetch. Source adapters return a stamped copy via
/// [`SourceRef::stamped`]; the descriptor itself is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub source_id: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub byte_len: Option<u64>,
}

impl SourceRef {
    pub fn new(source_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            uri: uri.into(),
            fetched_at: None,
            content_hash: None,
            byte_len: None,
        }
    }

    /// A new `SourceRef` carrying the fetch time, byte length and content hash.
    pub fn stamped(&self, bytes: &[u8], fetched_at: DateTime<Utc>) -> Self {
        Self {
            source_id: self.source_id.clone(),
            uri: self.uri.clone(),
            fetched_at: Some(fetched_at),
            content_hash: Some(content_hash(bytes)),
            byte_len: Some(bytes.len() as u64),
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.content_hash.is_some()
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source_id, self.uri)
    }
}

/// `sha256:<hex>` digest of a payload.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

// ── Payloads ──

/// Payload formats the pipeline knows how to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Xml,
    Xlsx,
}

#[derive(Debug, Error)]
#[error("unknown payload format: {0}")]
pub struct UnknownFormat(pub String);

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xml => "xml",
            Self::Xlsx => "xlsx",
        }
    }

    /// Format implied by a path or URL extension, ignoring any query string.
    pub fn from_extension(uri: &str) -> Option<Self> {
        let path = uri.split(['?', '#']).next().unwrap_or(uri);
        let ext = path.rsplit_once('.')?.1;
        ext.parse().ok()
    }
}

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "xml" => Ok(Self::Xml),
            "xlsx" | "xlsm" => Ok(Self::Xlsx),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes returned by a source adapter, plus provenance.
///
/// `format` is the declared format (from configuration or the URI
/// extension). `None` means "detect from the byte signature".
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub source: SourceRef,
    pub format: Option<Format>,
    pub bytes: Vec<u8>,
}

impl RawPayload {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

// ── Text lines ──

/// Reading-order position of a line: `(page or sheet, row or line, column)`.
///
/// XML lines use `(0, document_order, 0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rank(pub u32, pub u32, pub u32);

/// One line (or spreadsheet cell, or XML leaf) of extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    pub page: u32,
    pub rank: Rank,
    /// Enclosing element name for XML leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl TextLine {
    pub fn new(text: impl Into<String>, page: u32, rank: Rank) -> Self {
        Self {
            text: text.into(),
            page,
            rank,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// Output of a format parser: ordered lines plus parse-time warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedText {
    pub lines: Vec<TextLine>,
    pub warnings: Vec<StructuralWarning>,
}

// ── Statute hierarchy ──

/// Hierarchy levels, shallowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    /// 장
    Chapter,
    /// 절
    Section,
    /// 조
    Article,
    /// 항 (①, ②, …)
    Paragraph,
    /// 호 (1., 2., …)
    Item,
    /// 목 (가., 나., …)
    SubItem,
}

impl Level {
    pub fn depth(&self) -> u8 {
        match self {
            Self::Chapter => 0,
            Self::Section => 1,
            Self::Article => 2,
            Self::Paragraph => 3,
            Self::Item => 4,
            Self::SubItem => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chapter => "chapter",
            Self::Section => "section",
            Self::Article => "article",
            Self::Paragraph => "paragraph",
            Self::Item => "item",
            Self::SubItem => "sub_item",
        }
    }
}

/// A node of the statute hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub level: Level,
    /// Marker as it appeared in the source, e.g. `제3조의2` or `②`.
    pub number_label: String,
    /// Normalised number; `None` when the marker could not be normalised.
    pub ordinal: Option<u32>,
    /// Branch number for inserted provisions (`제3조의2` → 2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Synthesised container for articles that appear outside any chapter.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub implicit: bool,
}

impl Node {
    pub fn new(level: Level, number_label: impl Into<String>, ordinal: Option<u32>) -> Self {
        Self {
            level,
            number_label: number_label.into(),
            ordinal,
            branch: None,
            heading: None,
            text: String::new(),
            children: Vec::new(),
            implicit: false,
        }
    }

    /// Unlabelled chapter holding articles that precede any chapter marker.
    pub fn implicit_chapter() -> Self {
        Self {
            implicit: true,
            ..Self::new(Level::Chapter, "", None)
        }
    }

    /// Lexicographically sortable key, e.g. `0003.002` for `제3조의2`.
    pub fn sort_key(&self) -> Option<String> {
        self.ordinal.map(|o| ordinal::sort_key(o, self.branch))
    }

    /// Append a line of body text, joining with a single space.
    pub fn push_text(&mut self, line: &str) {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(line);
    }

    /// Depth-first iterator over this node and its descendants.
    pub fn walk(&self) -> Vec<&Node> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.walk());
        }
        out
    }
}

/// Supplementary provisions (부칙) appended after the main body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Addendum {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promulgation_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

/// A single revision of a statute, normalised into the canonical hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatuteDocument {
    /// Natural key, stable across revisions.
    pub statute_code: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub law_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promulgation_date: Option<NaiveDate>,
    /// Distinguishes versions of the same statute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub preamble: String,
    /// Ordered chapters (possibly one implicit chapter).
    pub hierarchy: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addenda: Vec<Addendum>,
    /// Ids of the sources that supplied this revision.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<StructuralWarning>,
}

impl StatuteDocument {
    pub fn new(statute_code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            statute_code: statute_code.into(),
            title: title.into(),
            law_type: None,
            promulgation_date: None,
            revision_date: None,
            preamble: String::new(),
            hierarchy: Vec::new(),
            addenda: Vec::new(),
            sources: Vec::new(),
            summary: None,
            warnings: Vec::new(),
        }
    }

    /// All article nodes in document order.
    pub fn articles(&self) -> Vec<&Node> {
        self.hierarchy
            .iter()
            .flat_map(|c| c.walk())
            .filter(|n| n.level == Level::Article)
            .collect()
    }

    pub fn article_count(&self) -> usize {
        self.articles().len()
    }

    /// Digest of the hierarchy and addenda, used to compare bodies cheaply.
    pub fn body_digest(&self) -> String {
        let body = serde_json::to_vec(&(&self.hierarchy, &self.addenda)).unwrap_or_default();
        content_hash(&body)
    }
}
