//! Spreadsheet extraction via calamine: one line per populated cell.

use std::io::Cursor;

use beopjeon_core::{Format, ParsedText, Rank, TextLine};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use tracing::debug;

use crate::error::ParseError;
use crate::FormatParser;

#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxParser;

impl FormatParser for XlsxParser {
    fn format(&self) -> Format {
        Format::Xlsx
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParsedText, ParseError> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
            .map_err(|e| ParseError::corrupt(Format::Xlsx, e))?;

        let mut out = ParsedText::default();
        for (sheet_index, name) in workbook.sheet_names().into_iter().enumerate() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| ParseError::corrupt(Format::Xlsx, e))?;
            let (row0, col0) = range.start().unwrap_or((0, 0));
            let sheet = sheet_index as u32;

            for (row, col, cell) in range.used_cells() {
                if matches!(cell, Data::Empty) {
                    continue;
                }
                let text = cell.to_string();
                let text = text.trim();
                if text.is_empty() {
                    continue;
                }
                let rank = Rank(sheet, row0 + row as u32, col0 + col as u32);
                out.lines.push(TextLine::new(text, sheet, rank));
            }
            debug!(sheet = %name, "read worksheet");
        }

        debug!(lines = out.lines.len(), "parsed xlsx");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cell(r: &str, text: &str) -> String {
        format!(r#"<c r="{r}" t="inlineStr"><is><t>{text}</t></is></c>"#)
    }

    /// Minimal single-sheet workbook with inline-string cells.
    fn build_xlsx(rows: &[(u32, Vec<String>)]) -> Vec<u8> {
        let sheet_rows: String = rows
            .iter()
            .map(|(r, cells)| format!(r#"<row r="{r}">{}</row>"#, cells.concat()))
            .collect();
        let files = [
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#
                    .to_string(),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                    .to_string(),
            ),
            (
                "xl/workbook.xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="법령목록" sheetId="1" r:id="rId1"/></sheets></workbook>"#
                    .to_string(),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#
                    .to_string(),
            ),
            (
                "xl/worksheets/sheet1.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{sheet_rows}</sheetData></worksheet>"#
                ),
            ),
        ];

        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, body) in files {
            writer.start_file(name, options).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn populated_cells_become_ranked_lines() {
        let bytes = build_xlsx(&[
            (1, vec![cell("A1", "법령명"), cell("B1", "시행일자")]),
            (3, vec![cell("B3", "건축법")]),
        ]);
        let parsed = XlsxParser.parse(&bytes).unwrap();

        let got: Vec<(&str, Rank)> = parsed.lines.iter().map(|l| (l.text.as_str(), l.rank)).collect();
        assert_eq!(
            got,
            vec![
                ("법령명", Rank(0, 0, 0)),
                ("시행일자", Rank(0, 0, 1)),
                ("건축법", Rank(0, 2, 1)),
            ]
        );
    }

    #[test]
    fn reparsing_is_identical() {
        let bytes = build_xlsx(&[
            (1, vec![cell("A1", "제1조(목적)"), cell("C1", "이 법은 건축물의 안전을 정한다.")]),
            (2, vec![cell("A2", "제2조(정의)")]),
        ]);
        let first = XlsxParser.parse(&bytes).unwrap();
        assert_eq!(first.lines.len(), 3);
        assert_eq!(XlsxParser.parse(&bytes).unwrap(), first);
    }

    #[test]
    fn not_a_workbook_is_corrupt() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"hello").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = XlsxParser.parse(&bytes).unwrap_err();
        assert!(matches!(err, ParseError::CorruptPayload { format: Format::Xlsx, .. }));
    }
}
