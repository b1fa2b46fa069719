//! Markdown and plain-text projections of statute documents.
//!
//! Both are lossy, write-only renderings: chapters, sections and articles
//! become nested headings, paragraphs and below become indented list items.

use std::fmt::Write;

use beopjeon_core::{Level, Node, StatuteDocument};

use crate::corpus::CorpusArtifact;

const RULE_WIDTH: usize = 60;

fn node_title(node: &Node) -> String {
    match (&node.heading, node.level) {
        (Some(h), Level::Article) => format!("{}({h})", node.number_label),
        (Some(h), _) => format!("{} {h}", node.number_label),
        (None, _) => node.number_label.clone(),
    }
}

fn date_or_blank(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

// ── Markdown ──

/// Whole-corpus rendering: manifest summary followed by every document.
pub fn render_corpus(artifact: &CorpusArtifact) -> String {
    let m = &artifact.manifest;
    let mut out = String::from("# 법령 코퍼스\n\n");
    let _ = writeln!(out, "- 생성 시각: {}", m.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out, "- 문서 수: {}", m.document_count);
    let _ = writeln!(out, "- 출처 수: {}", m.source_count);
    let _ = writeln!(out, "- 구조 경고: {}\n", m.warning_count);
    for doc in &artifact.documents {
        out.push_str(&render_document(doc, 2));
    }
    out
}

/// Render one document with its title at heading level `base`.
pub fn render_document(doc: &StatuteDocument, base: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}\n", "#".repeat(base), doc.title);
    let _ = writeln!(out, "- 법령 코드: `{}`", doc.statute_code);
    if let Some(law_type) = &doc.law_type {
        let _ = writeln!(out, "- 법종구분: {law_type}");
    }
    if let Some(d) = doc.promulgation_date {
        let _ = writeln!(out, "- 공포일자: {d}");
    }
    if let Some(d) = doc.revision_date {
        let _ = writeln!(out, "- 시행일자: {d}");
    }
    out.push('\n');

    if let Some(summary) = &doc.summary {
        let _ = writeln!(out, "> {}\n", summary.replace('\n', "\n> "));
    }
    if !doc.preamble.is_empty() {
        let _ = writeln!(out, "{}\n", doc.preamble);
    }
    for chapter in &doc.hierarchy {
        markdown_node(&mut out, chapter, base);
    }
    if !doc.addenda.is_empty() {
        let _ = writeln!(out, "{} 부칙\n", "#".repeat(base + 1));
        for addendum in &doc.addenda {
            let _ = writeln!(out, "**{}**\n", addendum.label);
            if !addendum.text.is_empty() {
                let _ = writeln!(out, "{}\n", addendum.text);
            }
        }
    }
    out
}

fn markdown_node(out: &mut String, node: &Node, base: usize) {
    if node.implicit {
        for child in &node.children {
            markdown_node(out, child, base);
        }
        return;
    }

    let depth = usize::from(node.level.depth());
    if node.level <= Level::Article {
        let _ = writeln!(out, "{} {}\n", "#".repeat(base + 1 + depth), node_title(node));
        if !node.text.is_empty() {
            let _ = writeln!(out, "{}\n", node.text);
        }
    } else {
        let indent = "  ".repeat(depth - usize::from(Level::Paragraph.depth()));
        let _ = writeln!(out, "{indent}- {} {}", node.number_label, node.text);
    }
    for child in &node.children {
        markdown_node(out, child, base);
    }
    if node.level == Level::Article && !node.children.is_empty() {
        out.push('\n');
    }
}

// ── Plain text ──

/// Plain-text rendering used for per-law `.txt` files.
pub fn render_text(doc: &StatuteDocument) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}\n{}\n{rule}", doc.title);
    let _ = writeln!(out, "법종구분: {}", doc.law_type.as_deref().unwrap_or_default());
    let _ = writeln!(out, "공포일자: {}", date_or_blank(doc.promulgation_date));
    let _ = writeln!(out, "시행일자: {}", date_or_blank(doc.revision_date));
    let _ = writeln!(out, "{rule}\n");

    if !doc.preamble.is_empty() {
        let _ = writeln!(out, "{}\n", doc.preamble);
    }
    if doc.article_count() > 0 {
        out.push_str("【조문】\n");
        for chapter in &doc.hierarchy {
            text_node(&mut out, chapter);
        }
    }
    if !doc.addenda.is_empty() {
        out.push_str("\n\n【부칙】\n");
        for addendum in &doc.addenda {
            let _ = writeln!(out, "\n{}", addendum.label);
            if !addendum.text.is_empty() {
                let _ = writeln!(out, "{}", addendum.text);
            }
        }
    }
    out
}

fn text_node(out: &mut String, node: &Node) {
    if !node.implicit {
        let depth = usize::from(node.level.depth());
        let indent = "  ".repeat(depth.saturating_sub(usize::from(Level::Article.depth())));
        if node.level <= Level::Article {
            let _ = writeln!(out, "\n{}", node_title(node));
            if !node.text.is_empty() {
                let _ = writeln!(out, "{}", node.text);
            }
        } else {
            let _ = writeln!(out, "{indent}{} {}", node.number_label, node.text);
        }
    }
    for child in &node.children {
        text_node(out, child);
    }
}
