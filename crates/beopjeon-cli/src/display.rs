//! Terminal output: document cards, search tables and run summaries.

use std::collections::BTreeMap;

use beopjeon_core::{Level, StatuteDocument};
use beopjeon_harvest::{Outcome, RunSummary};
use beopjeon_store::{CorpusArtifact, MergeRecord};
use beopjeon_sync::{FamilyMember, LawSummary};

const MAX_LIST_ITEMS: usize = 10;

type Section = (&'static str, Vec<(&'static str, String)>);

// ── Document card ──

fn level_counts(doc: &StatuteDocument) -> BTreeMap<Level, usize> {
    let mut counts = BTreeMap::new();
    for node in doc.hierarchy.iter().flat_map(|c| c.walk()) {
        if !node.implicit {
            *counts.entry(node.level).or_default() += 1;
        }
    }
    counts
}

/// Card contents grouped by section; empty values are omitted.
fn card_sections(doc: &StatuteDocument) -> Vec<Section> {
    let opt = |v: Option<String>| v.unwrap_or_default();
    let identity = vec![
        ("statute_code", doc.statute_code.clone()),
        ("title", doc.title.clone()),
        ("law_type", opt(doc.law_type.clone())),
    ];
    let dates = vec![
        ("promulgation_date", opt(doc.promulgation_date.map(|d| d.to_string()))),
        ("revision_date", opt(doc.revision_date.map(|d| d.to_string()))),
    ];
    let counts = level_counts(doc);
    let structure: Vec<(&'static str, String)> = [
        Level::Chapter,
        Level::Section,
        Level::Article,
        Level::Paragraph,
        Level::Item,
        Level::SubItem,
    ]
    .into_iter()
    .filter_map(|level| counts.get(&level).map(|n| (level.as_str(), n.to_string())))
    .chain([("addenda", doc.addenda.len().to_string())].into_iter().filter(|(_, n)| n != "0"))
    .collect();
    let provenance = vec![("sources", doc.sources.join(", "))];
    let warnings: Vec<(&'static str, String)> = doc
        .warnings
        .iter()
        .take(MAX_LIST_ITEMS)
        .map(|w| (w.kind(), w.to_string()))
        .collect();
    let summary = vec![("summary", opt(doc.summary.clone()))];

    [
        ("Identity", identity),
        ("Dates", dates),
        ("Structure", structure),
        ("Provenance", provenance),
        ("Warnings", warnings),
        ("Summary", summary),
    ]
    .into_iter()
    .map(|(header, rows)| (header, rows.into_iter().filter(|(_, v)| !v.is_empty()).collect::<Vec<_>>()))
    .filter(|(_, rows)| !rows.is_empty())
    .collect()
}

/// Print a single statute document as a vertical card grouped by section.
pub fn print_document_card(doc: &StatuteDocument) {
    println!("=== {} ===", doc.statute_code);
    println!("{}", doc.title);
    println!();

    for (header, rows) in card_sections(doc) {
        println!("{header}");
        for (name, value) in rows {
            println!("  {:<26} {}", name, value);
        }
        println!();
    }
    if doc.warnings.len() > MAX_LIST_ITEMS {
        println!("  ... and {} more warnings", doc.warnings.len() - MAX_LIST_ITEMS);
    }
}

// ── Tables ──

pub fn print_search_results(results: &[LawSummary]) {
    println!("  {:<8} {:<10} {:<12} {:<12} {}", "ID", "MST", "TYPE", "ENFORCED", "NAME");
    for law in results {
        println!(
            "  {:<8} {:<10} {:<12} {:<12} {}",
            law.law_id,
            law.law_msn,
            law.law_type,
            law.enforcement_date.map(|d| d.to_string()).unwrap_or_default(),
            law.law_name
        );
    }
    println!("\n  {} result(s)", results.len());
}

pub fn print_family(members: &[FamilyMember]) {
    println!("  {:<8} {:<8} {:<10} {}", "ROLE", "ID", "MST", "NAME");
    for m in members {
        println!(
            "  {:<8} {:<8} {:<10} {}",
            m.role.to_string(),
            m.law.law_id,
            m.law.law_msn,
            m.law.law_name
        );
    }
}

/// `[[items]]` entries for pasting into `beopjeon.toml`.
pub fn items_toml(source_id: &str, members: &[FamilyMember]) -> String {
    let mut out = String::new();
    for m in members {
        out.push_str(&format!(
            "# {} ({})\n[[items]]\nsource = \"{source_id}\"\ntarget = \"{}\"\nstatute_code = \"{}\"\n\n",
            m.law.law_name, m.role, m.law.law_msn, m.law.law_id
        ));
    }
    out
}

pub fn print_run_summary(summary: &RunSummary, outcomes: &[Outcome]) {
    println!("Harvest");
    println!("  {:<26} {}", "items", summary.total);
    println!("  {:<26} {}", "succeeded", summary.succeeded);
    println!("  {:<26} {}", "skipped", summary.skipped);
    println!("  {:<26} {}", "failed", summary.failed);
    println!("  {:<26} {}", "retries", summary.retries);
    println!("  {:<26} {}", "structural warnings", summary.warnings);
    for (reason, count) in &summary.reasons {
        println!("  {:<26} {}", reason, count);
    }
    let failures: Vec<_> = outcomes
        .iter()
        .filter_map(|o| match o {
            Outcome::Failed { target, error, .. } => Some(format!("{target}: {error}")),
            _ => None,
        })
        .collect();
    for line in failures.iter().take(MAX_LIST_ITEMS) {
        println!("    {line}");
    }
    if failures.len() > MAX_LIST_ITEMS {
        println!("    ... and {} more", failures.len() - MAX_LIST_ITEMS);
    }
    println!();
}

pub fn print_conflicts(records: &[MergeRecord]) {
    let conflicted: Vec<_> = records.iter().filter(|r| r.has_conflicts()).collect();
    if conflicted.is_empty() {
        return;
    }
    println!("Merge conflicts");
    for record in conflicted {
        let fields: Vec<_> = record.conflicts.keys().map(String::as_str).collect();
        println!("  {:<26} {}", record.statute_code, fields.join(", "));
    }
    println!();
}

pub fn print_manifest(artifact: &CorpusArtifact) {
    let m = &artifact.manifest;
    println!("Corpus");
    println!("  {:<26} {}", "generated_at", m.generated_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  {:<26} {}", "documents", m.document_count);
    println!("  {:<26} {}", "sources", m.source_count);
    println!("  {:<26} {}", "warnings", m.warning_count);
    println!();
}

#[cfg(test)]
mod tests {
    use beopjeon_core::{Node, StructuralWarning};
    use beopjeon_sync::FamilyRole;

    use super::*;

    fn doc() -> StatuteDocument {
        let mut doc = StatuteDocument::new("001638", "도로교통법");
        let mut chapter = Node::implicit_chapter();
        let mut article = Node::new(Level::Article, "제1조", Some(1));
        article.children.push(Node::new(Level::Paragraph, "①", Some(1)));
        article.children.push(Node::new(Level::Paragraph, "②", Some(2)));
        chapter.children.push(article);
        doc.hierarchy.push(chapter);
        doc.sources = vec!["law-go-kr".into(), "disk".into()];
        doc.warnings.push(StructuralWarning::LowTextYield { page: 3 });
        doc
    }

    #[test]
    fn card_groups_non_empty_fields() {
        let sections = card_sections(&doc());
        let headers: Vec<_> = sections.iter().map(|(h, _)| *h).collect();
        assert_eq!(headers, vec!["Identity", "Structure", "Provenance", "Warnings"]);

        let structure = &sections[1].1;
        assert_eq!(structure, &vec![("article", "1".to_string()), ("paragraph", "2".to_string())]);
        assert_eq!(sections[2].1[0].1, "law-go-kr, disk");
        assert_eq!(sections[3].1[0].0, "low_text_yield");
    }

    #[test]
    fn family_items_toml_is_parseable() {
        let members = vec![FamilyMember {
            role: FamilyRole::Lower,
            law: LawSummary {
                law_id: "003212".into(),
                law_msn: "250001".into(),
                law_name: "도로교통법 시행령".into(),
                ..Default::default()
            },
        }];
        let text = items_toml("law-go-kr", &members);
        let value: toml::Value = toml::from_str(&text).unwrap();
        let item = &value["items"][0];
        assert_eq!(item["target"].as_str(), Some("250001"));
        assert_eq!(item["statute_code"].as_str(), Some("003212"));
    }
}
