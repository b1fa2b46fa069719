//! PDF text extraction via lopdf.
//!
//! Each page is extracted independently. A page that yields no characters
//! (typically a scanned image) or whose content stream cannot be decoded
//! produces a `LowTextYield` warning and the remaining pages are still parsed.

use beopjeon_core::{Format, ParsedText, Rank, StructuralWarning, TextLine};
use lopdf::Document;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::FormatParser;

#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

impl FormatParser for PdfParser {
    fn format(&self) -> Format {
        Format::Pdf
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParsedText, ParseError> {
        let doc = Document::load_mem(bytes).map_err(|e| ParseError::corrupt(Format::Pdf, e))?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(ParseError::corrupt(Format::Pdf, "document has no pages"));
        }

        let mut out = ParsedText::default();
        for &page in pages.keys() {
            let text = match doc.extract_text(&[page]) {
                Ok(text) => text,
                Err(e) => {
                    warn!(page, error = %e, "page text extraction failed");
                    String::new()
                }
            };

            let before = out.lines.len();
            for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                let row = (out.lines.len() - before) as u32;
                out.lines.push(TextLine::new(line, page, Rank(page, row, 0)));
            }

            if out.lines.len() == before {
                debug!(page, "page yielded no text");
                out.warnings.push(StructuralWarning::LowTextYield { page });
            }
        }

        debug!(pages = pages.len(), lines = out.lines.len(), "parsed pdf");
        Ok(out)
    }
}
