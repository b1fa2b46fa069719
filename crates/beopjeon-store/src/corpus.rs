//! Corpus assembler: merged records → ordered, manifest-stamped artifact.
//!
//! Documents are ordered by statute code ascending, then revision date
//! descending (undated revisions last). Each entry is keyed by
//! `(statute_code, revision_date)`; in incremental mode entries whose key is
//! not touched by the new records are carried over from the prior artifact
//! verbatim. Prior entries that share a key with fresh candidates go back
//! through the merge engine first (see [`CorpusArtifact::competing_candidates`]),
//! so a later run cannot displace a higher-ranked published text.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use beopjeon_core::StatuteDocument;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreError;
use crate::merge::{Candidate, MergeRecord};
use crate::publish;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    /// Distinct source ids across all documents.
    pub source_count: usize,
    pub document_count: usize,
    /// Structural warnings across all documents.
    pub warning_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusArtifact {
    pub manifest: Manifest,
    pub documents: Vec<StatuteDocument>,
}

/// What an incremental assembly did to the prior artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStats {
    pub added: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub carried: usize,
}

type EntryKey = (String, Option<NaiveDate>);

fn entry_key(doc: &StatuteDocument) -> EntryKey {
    (doc.statute_code.clone(), doc.revision_date)
}

fn sort_documents(documents: &mut [StatuteDocument]) {
    documents.sort_by(|a, b| {
        (&a.statute_code, Reverse(a.revision_date)).cmp(&(&b.statute_code, Reverse(b.revision_date)))
    });
}

impl CorpusArtifact {
    /// Build an artifact from documents, ordering them and computing the manifest.
    pub fn from_documents(mut documents: Vec<StatuteDocument>, generated_at: DateTime<Utc>) -> Self {
        sort_documents(&mut documents);
        let sources: BTreeSet<&str> = documents
            .iter()
            .flat_map(|d| d.sources.iter().map(String::as_str))
            .collect();
        let manifest = Manifest {
            generated_at,
            source_count: sources.len(),
            document_count: documents.len(),
            warning_count: documents.iter().map(|d| d.warnings.len()).sum(),
        };
        Self { manifest, documents }
    }

    /// Full assembly: one document per merge record.
    pub fn assemble(records: &[MergeRecord], generated_at: DateTime<Utc>) -> Self {
        let documents = records.iter().map(|r| r.winner.clone()).collect();
        let artifact = Self::from_documents(documents, generated_at);
        info!(
            documents = artifact.manifest.document_count,
            warnings = artifact.manifest.warning_count,
            "corpus assembled"
        );
        artifact
    }

    /// Incremental assembly on top of `prior`.
    ///
    /// A record whose `(statute_code, revision_date)` matches a prior entry
    /// replaces it only when the document differs; every other prior entry
    /// is kept as-is.
    pub fn assemble_incremental(
        prior: &CorpusArtifact,
        records: &[MergeRecord],
        generated_at: DateTime<Utc>,
    ) -> (Self, UpdateStats) {
        let mut entries: BTreeMap<EntryKey, StatuteDocument> = prior
            .documents
            .iter()
            .map(|d| (entry_key(d), d.clone()))
            .collect();
        let prior_len = entries.len();

        let mut stats = UpdateStats::default();
        for record in records {
            let key = entry_key(&record.winner);
            match entries.get(&key) {
                Some(existing) if *existing == record.winner => stats.unchanged += 1,
                Some(_) => {
                    stats.replaced += 1;
                    entries.insert(key, record.winner.clone());
                }
                None => {
                    stats.added += 1;
                    entries.insert(key, record.winner.clone());
                }
            }
        }
        stats.carried = prior_len - stats.unchanged - stats.replaced;

        let artifact = Self::from_documents(entries.into_values().collect(), generated_at);
        info!(
            added = stats.added,
            replaced = stats.replaced,
            unchanged = stats.unchanged,
            carried = stats.carried,
            documents = artifact.manifest.document_count,
            "corpus updated incrementally"
        );
        (artifact, stats)
    }

    /// Published entries that compete with `fresh`: those sharing a
    /// `(statute_code, revision_date)` key with a fresh candidate. Merge them
    /// together with `fresh` before [`Self::assemble_incremental`].
    pub fn competing_candidates(&self, fresh: &[Candidate]) -> Vec<Candidate> {
        let keys: BTreeSet<EntryKey> = fresh.iter().map(|c| entry_key(&c.document)).collect();
        self.documents
            .iter()
            .filter(|d| keys.contains(&entry_key(d)))
            .map(|d| Candidate::published(d.clone()))
            .collect()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, StoreError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let bytes = std::fs::read(path).map_err(|e| StoreError::read(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Load `path` if it exists.
    pub fn load_optional(path: &Path) -> Result<Option<Self>, StoreError> {
        match Self::load(path) {
            Ok(artifact) => Ok(Some(artifact)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialise and publish atomically to `path`.
    pub fn publish(&self, path: &Path) -> Result<(), StoreError> {
        publish::publish(path, &self.to_json()?)
    }

    pub fn find(&self, statute_code: &str) -> impl Iterator<Item = &StatuteDocument> {
        self.documents.iter().filter(move |d| d.statute_code == statute_code)
    }
}

#[cfg(test)]
mod tests {
    use beopjeon_core::{SourceRef, StructuralWarning};
    use chrono::TimeZone;

    use super::*;
    use crate::merge::{MergeEngine, TrustPolicy};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap()
    }

    fn doc(code: &str, revision: Option<&str>, sources: &[&str]) -> StatuteDocument {
        let mut doc = StatuteDocument::new(code, format!("법 {code}"));
        doc.revision_date = revision.and_then(|r| NaiveDate::parse_from_str(r, "%Y-%m-%d").ok());
        doc.sources = sources.iter().map(|s| s.to_string()).collect();
        doc
    }

    fn record(doc: StatuteDocument) -> MergeRecord {
        MergeRecord {
            statute_code: doc.statute_code.clone(),
            contributors: vec![SourceRef::new("test", "x")],
            winner: doc,
            conflicts: Default::default(),
        }
    }

    fn keys(artifact: &CorpusArtifact) -> Vec<(String, Option<String>)> {
        artifact
            .documents
            .iter()
            .map(|d| (d.statute_code.clone(), d.revision_date.map(|r| r.to_string())))
            .collect()
    }

    #[test]
    fn documents_sorted_by_code_then_newest_revision() {
        let artifact = CorpusArtifact::from_documents(
            vec![
                doc("B", Some("2020-01-01"), &["a"]),
                doc("A", Some("2021-01-01"), &["a"]),
                doc("B", None, &["b"]),
                doc("B", Some("2024-01-01"), &["a"]),
            ],
            now(),
        );
        assert_eq!(
            keys(&artifact),
            vec![
                ("A".into(), Some("2021-01-01".into())),
                ("B".into(), Some("2024-01-01".into())),
                ("B".into(), Some("2020-01-01".into())),
                ("B".into(), None),
            ]
        );
        assert_eq!(artifact.manifest.source_count, 2);
        assert_eq!(artifact.manifest.document_count, 4);
    }

    #[test]
    fn manifest_counts_warnings() {
        let mut noisy = doc("A", Some("2024-01-01"), &["a"]);
        noisy.warnings.push(StructuralWarning::LowTextYield { page: 2 });
        noisy.warnings.push(StructuralWarning::LowTextYield { page: 3 });
        let artifact = CorpusArtifact::assemble(&[record(noisy), record(doc("B", None, &["a"]))], now());
        assert_eq!(artifact.manifest.warning_count, 2);
    }

    #[test]
    fn incremental_keeps_untouched_entries_verbatim() {
        let mut untouched = doc("A", Some("2020-01-01"), &["old"]);
        untouched.preamble = "이전 실행에서 수집됨".into();
        let prior = CorpusArtifact::from_documents(
            vec![untouched.clone(), doc("B", Some("2023-01-01"), &["a"])],
            now(),
        );

        let mut changed_b = doc("B", Some("2023-01-01"), &["a"]);
        changed_b.title = "법 B (정정)".into();
        let records = vec![
            record(changed_b),
            record(doc("B", Some("2024-06-01"), &["a"])),
            record(doc("C", Some("2024-01-01"), &["a"])),
        ];

        let (next, stats) = CorpusArtifact::assemble_incremental(&prior, &records, now());
        assert_eq!(
            stats,
            UpdateStats {
                added: 2,
                replaced: 1,
                unchanged: 0,
                carried: 1
            }
        );
        assert_eq!(next.documents[0], untouched);
        assert_eq!(next.find("B").count(), 2);
        assert_eq!(next.find("B").next().unwrap().revision_date.unwrap().to_string(), "2024-06-01");
    }

    #[test]
    fn incremental_with_identical_records_is_a_no_op() {
        let prior = CorpusArtifact::from_documents(vec![doc("A", Some("2024-01-01"), &["a"])], now());
        let (next, stats) =
            CorpusArtifact::assemble_incremental(&prior, &[record(doc("A", Some("2024-01-01"), &["a"]))], now());
        assert_eq!(stats.unchanged, 1);
        assert_eq!(next.documents, prior.documents);
    }

    fn harvest_run(
        prior: Option<&CorpusArtifact>,
        fresh: Vec<Candidate>,
        engine: &MergeEngine,
    ) -> CorpusArtifact {
        let mut candidates = fresh;
        if let Some(prior) = prior {
            let competing = prior.competing_candidates(&candidates);
            candidates.extend(competing);
        }
        let records = engine.merge(&candidates);
        match prior {
            Some(prior) => CorpusArtifact::assemble_incremental(prior, &records, now()).0,
            None => CorpusArtifact::assemble(&records, now()),
        }
    }

    #[test]
    fn later_low_trust_run_does_not_displace_published_text() {
        let engine = MergeEngine::new(TrustPolicy::new().with("official", 10).with("mirror", 1));
        let titled = |title: &str, source: &str| {
            let mut d = doc("A", Some("2024-01-01"), &[]);
            d.title = title.into();
            Candidate::new(SourceRef::new(source, "x"), d)
        };

        let run1 = harvest_run(None, vec![titled("공식 판본", "official")], &engine);
        let run2 = harvest_run(Some(&run1), vec![titled("미러 판본", "mirror")], &engine);
        assert_eq!(run2.documents.len(), 1);
        assert_eq!(run2.documents[0].title, "공식 판본");
        assert_eq!(run2.documents[0].sources, vec!["official".to_string(), "mirror".to_string()]);

        // The same two harvests in the opposite order settle on the same text.
        let run1 = harvest_run(None, vec![titled("미러 판본", "mirror")], &engine);
        let run2 = harvest_run(Some(&run1), vec![titled("공식 판본", "official")], &engine);
        assert_eq!(run2.documents[0].title, "공식 판본");
    }

    #[test]
    fn only_matching_keys_compete() {
        let prior = CorpusArtifact::from_documents(
            vec![doc("A", Some("2020-01-01"), &["a"]), doc("A", Some("2024-01-01"), &["a"]), doc("B", None, &["a"])],
            now(),
        );
        let fresh = vec![Candidate::new(SourceRef::new("b", "x"), doc("A", Some("2024-01-01"), &[]))];
        let competing = prior.competing_candidates(&fresh);
        assert_eq!(competing.len(), 1);
        assert_eq!(competing[0].source.source_id, "a");
        assert_eq!(competing[0].document.revision_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn publish_then_load() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.json");
        let artifact = CorpusArtifact::from_documents(vec![doc("A", Some("2024-01-01"), &["a"])], now());

        artifact.publish(&path).unwrap();
        assert_eq!(CorpusArtifact::load(&path).unwrap(), artifact);
        assert!(CorpusArtifact::load_optional(&tmp.path().join("missing.json")).unwrap().is_none());
    }

    #[test]
    fn crash_during_publish_keeps_previous_corpus() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.json");
        let v1 = CorpusArtifact::from_documents(
            vec![doc("A", Some("2020-01-01"), &["a"]), doc("B", Some("2021-01-01"), &["a"])],
            now(),
        );
        v1.publish(&path).unwrap();

        // Stage the next version, then "crash" before the rename.
        let v2 = CorpusArtifact::from_documents(vec![doc("C", None, &["a"])], now());
        let staged = publish::stage(&path, &v2.to_json().unwrap()).unwrap();
        drop(staged);

        let visible = CorpusArtifact::load(&path).unwrap();
        assert_eq!(visible, v1);
    }

    #[test]
    fn corrupt_corpus_is_a_json_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("corpus.json");
        std::fs::write(&path, b"{\"manifest\":").unwrap();
        assert!(matches!(CorpusArtifact::load(&path), Err(StoreError::Json(_))));
    }
}
