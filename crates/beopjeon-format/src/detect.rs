//! Byte-signature detection and declared-format reconciliation.

use beopjeon_core::{Format, RawPayload};

use crate::error::ParseError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Strip a leading UTF-8 byte-order mark.
pub fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

/// Guess the format from the leading bytes.
///
/// HTML error pages are not recognised as XML.
pub fn sniff(bytes: &[u8]) -> Option<Format> {
    let body = strip_bom(bytes);
    let start = body.iter().position(|b| !b.is_ascii_whitespace())?;
    let body = &body[start..];

    if body.starts_with(b"%PDF-") {
        return Some(Format::Pdf);
    }
    if body.starts_with(b"PK\x03\x04") {
        return Some(Format::Xlsx);
    }
    if body.starts_with(b"<") {
        let head: Vec<u8> = body.iter().take(64).map(u8::to_ascii_lowercase).collect();
        if head.starts_with(b"<!doctype html") || head.starts_with(b"<html") {
            return None;
        }
        return Some(Format::Xml);
    }
    None
}

/// The format to parse `payload` as.
///
/// Fails with `UnsupportedFormat` when the signature is unknown or contradicts
/// the declared format.
pub fn resolve_format(payload: &RawPayload) -> Result<Format, ParseError> {
    let sniffed = sniff(&payload.bytes).ok_or_else(|| {
        ParseError::UnsupportedFormat(format!(
            "unrecognised byte signature for {}",
            payload.source
        ))
    })?;

    match payload.format {
        Some(declared) if declared != sniffed => Err(ParseError::UnsupportedFormat(format!(
            "{} declared as {declared} but content is {sniffed}",
            payload.source
        ))),
        _ => Ok(sniffed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beopjeon_core::SourceRef;

    fn payload(format: Option<Format>, bytes: &[u8]) -> RawPayload {
        RawPayload {
            source: SourceRef::new("test", "mem://payload"),
            format,
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn sniffs_known_signatures() {
        assert_eq!(sniff(b"%PDF-1.7\n..."), Some(Format::Pdf));
        assert_eq!(sniff(b"PK\x03\x04rest"), Some(Format::Xlsx));
        assert_eq!(sniff(b"<?xml version=\"1.0\"?><law/>"), Some(Format::Xml));
        assert_eq!(sniff(b"\xEF\xBB\xBF  \n<LawSearch/>"), Some(Format::Xml));
    }

    #[test]
    fn rejects_html_and_garbage() {
        assert_eq!(sniff(b"<!DOCTYPE html><html></html>"), None);
        assert_eq!(sniff(b"<HTML><body>error</body></HTML>"), None);
        assert_eq!(sniff(b"GIF89a"), None);
        assert_eq!(sniff(b""), None);
    }

    #[test]
    fn declared_format_must_agree() {
        assert_eq!(resolve_format(&payload(Some(Format::Pdf), b"%PDF-1.4")), Ok(Format::Pdf));
        assert_eq!(resolve_format(&payload(None, b"<a/>")), Ok(Format::Xml));
        assert!(matches!(
            resolve_format(&payload(Some(Format::Xlsx), b"%PDF-1.4")),
            Err(ParseError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            resolve_format(&payload(None, b"plain text")),
            Err(ParseError::UnsupportedFormat(_))
        ));
    }
}
