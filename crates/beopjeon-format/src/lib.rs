//! Format parsers: raw payload bytes → ordered `TextLine` sequences.
//!
//! The set of formats is closed (`Format`), and each variant has exactly one
//! `FormatParser` implementation. [`parse`] reconciles the declared format
//! with the byte signature and dispatches.

pub mod detect;
pub mod error;
#[cfg(feature = "pdf")]
pub mod pdf;
#[cfg(feature = "xlsx")]
pub mod xlsx;
pub mod xml;

use beopjeon_core::{Format, ParsedText, RawPayload};
use tracing::debug;

pub use detect::{resolve_format, sniff};
pub use error::ParseError;
#[cfg(feature = "pdf")]
pub use pdf::PdfParser;
#[cfg(feature = "xlsx")]
pub use xlsx::XlsxParser;
pub use xml::XmlParser;

/// Parser for one payload format. Parsing is pure: identical bytes always
/// yield identical output.
pub trait FormatParser {
    fn format(&self) -> Format;
    fn parse(&self, bytes: &[u8]) -> Result<ParsedText, ParseError>;
}

/// Parse a payload into ordered text lines.
pub fn parse(payload: &RawPayload) -> Result<ParsedText, ParseError> {
    let format = resolve_format(payload)?;
    debug!(source = %payload.source, %format, bytes = payload.size(), "parsing payload");
    match format {
        Format::Pdf => parse_pdf(&payload.bytes),
        Format::Xml => XmlParser.parse(&payload.bytes),
        Format::Xlsx => parse_xlsx(&payload.bytes),
    }
}

#[cfg(feature = "pdf")]
fn parse_pdf(bytes: &[u8]) -> Result<ParsedText, ParseError> {
    PdfParser.parse(bytes)
}

#[cfg(not(feature = "pdf"))]
fn parse_pdf(_bytes: &[u8]) -> Result<ParsedText, ParseError> {
    Err(ParseError::UnsupportedFormat(
        "pdf support not compiled in (enable the `pdf` feature)".into(),
    ))
}

#[cfg(feature = "xlsx")]
fn parse_xlsx(bytes: &[u8]) -> Result<ParsedText, ParseError> {
    XlsxParser.parse(bytes)
}

#[cfg(not(feature = "xlsx"))]
fn parse_xlsx(_bytes: &[u8]) -> Result<ParsedText, ParseError> {
    Err(ParseError::UnsupportedFormat(
        "xlsx support not compiled in (enable the `xlsx` feature)".into(),
    ))
}
