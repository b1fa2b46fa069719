//! Zip bundle export: the corpus as a downloadable archive.
//!
//! Layout:
//! - `all_laws.json`: collection date, total and every document
//! - `laws/<name>.json` and `laws/<name>.txt` per document
//! - `README.md` listing the bundled laws

use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::{Cursor, Seek, Write};
use std::path::Path;

use beopjeon_core::StatuteDocument;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::StoreError;
use crate::markdown::render_text;
use crate::publish;

#[derive(Serialize)]
struct AllLaws<'a> {
    collection_date: String,
    total_laws: usize,
    laws: &'a [StatuteDocument],
}

/// Replace characters that are unsafe in file names with `_`.
pub fn safe_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '\\' | '/' | '*' | '?' | ':' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// One unique stem per document: the sanitised title, suffixed with the
/// revision date (then a counter) when titles collide.
fn file_stems(documents: &[StatuteDocument]) -> Vec<String> {
    let mut used = HashSet::new();
    documents
        .iter()
        .map(|doc| {
            let base = safe_file_name(&doc.title);
            let mut stem = base.clone();
            if used.contains(&stem) {
                if let Some(rev) = doc.revision_date {
                    stem = format!("{base}_{rev}");
                }
            }
            let mut n = 2;
            while used.contains(&stem) {
                stem = format!("{base}_{n}");
                n += 1;
            }
            used.insert(stem.clone());
            stem
        })
        .collect()
}

fn readme(documents: &[StatuteDocument], collected: &str) -> String {
    let mut out = String::from("# 법령 수집 결과\n\n");
    let _ = writeln!(out, "수집 일시: {collected}");
    let _ = writeln!(out, "총 법령 수: {}개\n", documents.len());
    out.push_str("## 파일 구조\n\n");
    out.push_str("- `all_laws.json`: 전체 법령 데이터 (JSON)\n");
    out.push_str("- `laws/`: 개별 법령 파일 디렉토리\n");
    out.push_str("  - `*.json`: 법령별 상세 데이터\n");
    out.push_str("  - `*.txt`: 법령별 텍스트 형식\n");
    out.push_str("- `README.md`: 이 파일\n\n");
    out.push_str("## 수집된 법령 목록\n\n");
    for doc in documents {
        match &doc.law_type {
            Some(t) => {
                let _ = writeln!(out, "- {} ({t})", doc.title);
            }
            None => {
                let _ = writeln!(out, "- {}", doc.title);
            }
        }
    }
    out
}

fn add_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    bytes: &[u8],
    options: SimpleFileOptions,
) -> Result<(), StoreError> {
    zip.start_file(name, options)?;
    zip.write_all(bytes).map_err(|e| StoreError::io(name, e))?;
    Ok(())
}

/// Write the bundle into `writer` and return it.
pub fn write_bundle<W: Write + Seek>(
    writer: W,
    documents: &[StatuteDocument],
    collected_at: DateTime<Utc>,
) -> Result<W, StoreError> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let collected = collected_at.format("%Y-%m-%d %H:%M:%S").to_string();
    let mut zip = ZipWriter::new(writer);

    let all = AllLaws {
        collection_date: collected.clone(),
        total_laws: documents.len(),
        laws: documents,
    };
    add_file(&mut zip, "all_laws.json", &serde_json::to_vec_pretty(&all)?, options)?;

    for (doc, stem) in documents.iter().zip(file_stems(documents)) {
        add_file(
            &mut zip,
            &format!("laws/{stem}.json"),
            &serde_json::to_vec_pretty(doc)?,
            options,
        )?;
        add_file(&mut zip, &format!("laws/{stem}.txt"), render_text(doc).as_bytes(), options)?;
    }

    add_file(&mut zip, "README.md", readme(documents, &collected).as_bytes(), options)?;
    Ok(zip.finish()?)
}

/// Build the bundle in memory and publish it atomically to `path`.
pub fn export_bundle(
    path: &Path,
    documents: &[StatuteDocument],
    collected_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let bytes = write_bundle(Cursor::new(Vec::new()), documents, collected_at)?.into_inner();
    publish::publish(path, &bytes)?;
    info!(path = %path.display(), laws = documents.len(), bytes = bytes.len(), "bundle exported");
    Ok(())
}
