//! Client for the Korean Ministry of Government Legislation Open API
//! (law.go.kr `DRF` endpoints).
//!
//! `lawSearch.do` lists statutes matching a name; `lawService.do` returns one
//! statute revision as XML, addressed by its serial number (`MST`). The OC
//! key is passed as a query parameter and never recorded in provenance.

use async_trait::async_trait;
use beopjeon_core::date::parse_date;
use beopjeon_core::{Format, RawPayload, SourceRef};
use chrono::{NaiveDate, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapter::SourceAdapter;
use crate::error::FetchError;
use crate::http::get_bytes;

pub const DEFAULT_BASE_URL: &str = "http://www.law.go.kr/DRF";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One `<law>` record from a search response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LawSummary {
    pub law_id: String,
    /// Serial number of this revision (`법령일련번호`), the detail key.
    pub law_msn: String,
    pub law_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub law_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promulgation_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enforcement_date: Option<NaiveDate>,
}

impl LawSummary {
    /// Descriptor for fetching this revision through a `law_api` source.
    pub fn source_ref(&self, source_id: &str) -> SourceRef {
        SourceRef::new(source_id, self.law_msn.clone())
    }
}

/// Anything that can answer a statute-name search.
#[async_trait]
pub trait LawSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<LawSummary>, FetchError>;
}

pub struct LawApiClient {
    id: String,
    client: reqwest::Client,
    base_url: String,
    oc: String,
}

impl LawApiClient {
    pub fn new(id: impl Into<String>, client: reqwest::Client, base_url: &str, oc: impl Into<String>) -> Self {
        let base_url = if base_url.trim().is_empty() {
            DEFAULT_BASE_URL
        } else {
            base_url
        };
        Self {
            id: id.into(),
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            oc: oc.into(),
        }
    }

    fn search_url(&self) -> String {
        format!("{}/lawSearch.do", self.base_url)
    }

    fn detail_url(&self) -> String {
        format!("{}/lawService.do", self.base_url)
    }
}

#[async_trait]
impl LawSearch for LawApiClient {
    async fn search(&self, query: &str) -> Result<Vec<LawSummary>, FetchError> {
        let request = self.client.get(self.search_url()).query(&[
            ("OC", self.oc.as_str()),
            ("target", "law"),
            ("type", "XML"),
            ("query", query),
            ("display", "100"),
            ("page", "1"),
        ]);
        let bytes = get_bytes(request).await?;
        let laws = parse_search_results(&bytes)?;
        info!(query, count = laws.len(), "law search complete");
        Ok(laws)
    }
}

#[async_trait]
impl SourceAdapter for LawApiClient {
    fn id(&self) -> &str {
        &self.id
    }

    async fn fetch(&self, target: &SourceRef) -> Result<RawPayload, FetchError> {
        let mst = target.uri.trim();
        if mst.is_empty() || !mst.chars().all(|c| c.is_ascii_digit()) {
            return Err(FetchError::InvalidTarget(format!(
                "law serial number must be numeric, got {mst:?}"
            )));
        }

        let request = self.client.get(self.detail_url()).query(&[
            ("OC", self.oc.as_str()),
            ("target", "law"),
            ("type", "XML"),
            ("MST", mst),
            ("mobileYn", "N"),
        ]);
        let mut bytes = get_bytes(request).await?;
        if bytes.starts_with(UTF8_BOM) {
            bytes.drain(..UTF8_BOM.len());
        }
        debug!(source_id = %self.id, mst, bytes = bytes.len(), "fetched statute detail");

        Ok(RawPayload {
            source: target.stamped(&bytes, Utc::now()),
            format: Some(Format::Xml),
            bytes,
        })
    }
}

/// Parse a `lawSearch.do` XML response.
///
/// Records without an id or a name are dropped. An error page (HTML or a
/// non-XML body) is reported as `InvalidResponse`.
pub fn parse_search_results(bytes: &[u8]) -> Result<Vec<LawSummary>, FetchError> {
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut reader = Reader::from_reader(body);
    reader.config_mut().trim_text(true);

    let invalid = |e: quick_xml::Error| FetchError::InvalidResponse(e.to_string());
    let mut laws = Vec::new();
    let mut current: Option<LawSummary> = None;
    let mut field: Option<String> = None;
    let mut saw_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(invalid)? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if !saw_root {
                    saw_root = true;
                    if name.eq_ignore_ascii_case("html") {
                        return Err(FetchError::InvalidResponse("received an HTML page".into()));
                    }
                }
                if name == "law" {
                    current = Some(LawSummary::default());
                } else {
                    field = Some(name);
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"law" {
                    if let Some(law) = current.take() {
                        if !law.law_id.is_empty() && !law.law_name.is_empty() {
                            laws.push(law);
                        }
                    }
                }
                field = None;
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(invalid)?;
                apply_field(current.as_mut(), field.as_deref(), &text);
            }
            Event::CData(c) => {
                let raw = c.into_inner();
                apply_field(current.as_mut(), field.as_deref(), &String::from_utf8_lossy(&raw));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !saw_root {
        return Err(FetchError::InvalidResponse("empty response".into()));
    }
    Ok(laws)
}

fn apply_field(law: Option<&mut LawSummary>, field: Option<&str>, text: &str) {
    let (Some(law), Some(field)) = (law, field) else {
        return;
    };
    let text = text.trim();
    match field {
        "법령ID" => law.law_id = text.to_string(),
        "법령일련번호" => law.law_msn = text.to_string(),
        "법령명한글" | "법령명_한글" => law.law_name = text.to_string(),
        "법종구분" | "법령구분명" if law.law_type.is_empty() => law.law_type = text.to_string(),
        "공포일자" => law.promulgation_date = parse_date(text),
        "시행일자" => law.enforcement_date = parse_date(text),
        _ => {}
    }
}
