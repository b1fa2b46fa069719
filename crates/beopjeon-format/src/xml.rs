//! XML leaf-text extraction via quick-xml.
//!
//! Every non-blank text (or CDATA) node becomes one line tagged with the
//! name of its enclosing element, ranked by document order.

use beopjeon_core::{Format, ParsedText, Rank, TextLine};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::detect::strip_bom;
use crate::error::ParseError;
use crate::FormatParser;

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlParser;

impl FormatParser for XmlParser {
    fn format(&self) -> Format {
        Format::Xml
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParsedText, ParseError> {
        let mut reader = Reader::from_reader(strip_bom(bytes));
        reader.config_mut().trim_text(true);

        let mut out = ParsedText::default();
        let mut stack: Vec<String> = Vec::new();
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| ParseError::corrupt(Format::Xml, e))?;
            match event {
                Event::Start(e) => {
                    stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Text(t) => {
                    let text = t.unescape().map_err(|e| ParseError::corrupt(Format::Xml, e))?;
                    push_leaf(&mut out, &stack, &text);
                }
                Event::CData(c) => {
                    let raw = c.into_inner();
                    push_leaf(&mut out, &stack, &String::from_utf8_lossy(&raw));
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(ParseError::corrupt(
                Format::Xml,
                format!("unexpected end of document inside <{open}>"),
            ));
        }

        debug!(lines = out.lines.len(), "parsed xml");
        Ok(out)
    }
}

fn push_leaf(out: &mut ParsedText, stack: &[String], text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    let rank = Rank(0, out.lines.len() as u32, 0);
    let mut line = TextLine::new(text, 0, rank);
    if let Some(tag) = stack.last() {
        line = line.with_tag(tag.as_str());
    }
    out.lines.push(line);
}
