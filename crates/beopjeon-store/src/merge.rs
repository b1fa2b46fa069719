//! Dedup & merge: one authoritative revision per statute code.
//!
//! Candidates are grouped by `statute_code`. Within a group the winner has the
//! latest `revision_date`, then the highest source trust priority, then the
//! fewest structural warnings. Remaining ties are broken by a fingerprint of
//! the document's content and then by provenance, so the winner never depends
//! on the order candidates arrive in, nor on whether some of them were merged
//! before.

use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use beopjeon_core::{content_hash, SourceRef, StatuteDocument};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Source id → trust priority. Unknown sources rank at 0.
#[derive(Debug, Clone, Default)]
pub struct TrustPolicy {
    priorities: HashMap<String, i32>,
}

impl TrustPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source_id: impl Into<String>, priority: i32) -> Self {
        self.priorities.insert(source_id.into(), priority);
        self
    }

    pub fn priority(&self, source_id: &str) -> i32 {
        self.priorities.get(source_id).copied().unwrap_or(0)
    }
}

impl<S: Into<String>> FromIterator<(S, i32)> for TrustPolicy {
    fn from_iter<I: IntoIterator<Item = (S, i32)>>(iter: I) -> Self {
        Self {
            priorities: iter.into_iter().map(|(id, p)| (id.into(), p)).collect(),
        }
    }
}

/// One extracted document plus the stamped provenance of its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source: SourceRef,
    pub document: StatuteDocument,
}

impl Candidate {
    pub fn new(source: SourceRef, document: StatuteDocument) -> Self {
        Self { source, document }
    }

    /// A document already published in a corpus. Its provenance is the
    /// winning source recorded first in `sources`.
    pub fn published(document: StatuteDocument) -> Self {
        let source_id = document.sources.first().cloned().unwrap_or_default();
        Self {
            source: SourceRef::new(source_id, ""),
            document,
        }
    }
}

/// The consolidated view of one statute code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeRecord {
    pub statute_code: String,
    pub winner: StatuteDocument,
    /// Provenance of every candidate in the group, winner included. The
    /// winner's `sources` lists its own source first, then every other
    /// contributing source in order.
    pub contributors: Vec<SourceRef>,
    /// Field name → runner-up values that differ from the winner's.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conflicts: BTreeMap<String, Vec<String>>,
}

impl MergeRecord {
    pub fn revision_date(&self) -> Option<NaiveDate> {
        self.winner.revision_date
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

// ── Ranking ──

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Rank<'a> {
    revision_date: Option<NaiveDate>,
    priority: i32,
    fewer_warnings: Reverse<usize>,
    fingerprint: String,
    source_id: &'a str,
    uri: &'a str,
    content_hash: Option<&'a str>,
}

struct Ranked<'a> {
    rank: Rank<'a>,
    candidate: &'a Candidate,
}

/// Hash of the compared content fields. Merge bookkeeping (`sources`,
/// `summary`) and warnings stay out so a merged winner keeps its fingerprint.
fn fingerprint(document: &StatuteDocument) -> String {
    let mut content = String::new();
    for (field, value) in field_values(document) {
        content.push_str(field);
        content.push('\u{1f}');
        content.push_str(&value);
        content.push('\u{1e}');
    }
    content_hash(content.as_bytes())
}

// ── Engine ──

#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    policy: TrustPolicy,
}

impl MergeEngine {
    pub fn new(policy: TrustPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Merge candidates into one record per statute code, ordered by code.
    pub fn merge(&self, candidates: &[Candidate]) -> Vec<MergeRecord> {
        let mut groups: BTreeMap<&str, Vec<&Candidate>> = BTreeMap::new();
        for candidate in candidates {
            groups
                .entry(candidate.document.statute_code.as_str())
                .or_default()
                .push(candidate);
        }

        let records: Vec<MergeRecord> = groups
            .into_iter()
            .filter_map(|(code, group)| self.merge_group(code, group))
            .collect();

        let conflicted = records.iter().filter(|r| r.has_conflicts()).count();
        info!(
            candidates = candidates.len(),
            statutes = records.len(),
            conflicted,
            "merge complete"
        );
        records
    }

    fn rank<'a>(&self, candidate: &'a Candidate) -> Ranked<'a> {
        let doc = &candidate.document;
        Ranked {
            rank: Rank {
                revision_date: doc.revision_date,
                priority: self.policy.priority(&candidate.source.source_id),
                fewer_warnings: Reverse(doc.warnings.len()),
                fingerprint: fingerprint(doc),
                source_id: &candidate.source.source_id,
                uri: &candidate.source.uri,
                content_hash: candidate.source.content_hash.as_deref(),
            },
            candidate,
        }
    }

    fn merge_group(&self, code: &str, group: Vec<&Candidate>) -> Option<MergeRecord> {
        let mut ranked: Vec<Ranked<'_>> = group.into_iter().map(|c| self.rank(c)).collect();
        // Best first.
        ranked.sort_by(|a, b| b.rank.cmp(&a.rank));

        let (best, runners_up) = ranked.split_first()?;

        let mut winner = best.candidate.document.clone();
        let lead = best.candidate.source.source_id.as_str();
        let mut others: BTreeSet<&str> = ranked
            .iter()
            .flat_map(|r| {
                std::iter::once(r.candidate.source.source_id.as_str())
                    .chain(r.candidate.document.sources.iter().map(String::as_str))
            })
            .filter(|id| !id.is_empty())
            .collect();
        others.remove(lead);
        winner.sources = std::iter::once(lead)
            .filter(|id| !id.is_empty())
            .chain(others)
            .map(str::to_string)
            .collect();

        let conflicts = conflicts(&best.candidate.document, runners_up.iter().map(|r| &r.candidate.document));

        let mut contributors: Vec<SourceRef> = ranked.iter().map(|r| r.candidate.source.clone()).collect();
        contributors.sort_by(provenance_order);
        contributors.dedup();

        debug!(
            statute_code = code,
            candidates = ranked.len(),
            winner = %best.candidate.source,
            conflicts = conflicts.len(),
            "selected revision"
        );

        Some(MergeRecord {
            statute_code: code.to_string(),
            winner,
            contributors,
            conflicts,
        })
    }
}

fn provenance_order(a: &SourceRef, b: &SourceRef) -> Ordering {
    (&a.source_id, &a.uri, &a.content_hash, &a.fetched_at).cmp(&(&b.source_id, &b.uri, &b.content_hash, &b.fetched_at))
}

/// Values compared between winner and runners-up.
fn field_values(doc: &StatuteDocument) -> [(&'static str, String); 6] {
    let date = |d: Option<NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();
    [
        ("title", doc.title.clone()),
        ("law_type", doc.law_type.clone().unwrap_or_default()),
        ("promulgation_date", date(doc.promulgation_date)),
        ("revision_date", date(doc.revision_date)),
        ("preamble", doc.preamble.clone()),
        ("body", doc.body_digest()),
    ]
}

fn conflicts<'a>(
    winner: &StatuteDocument,
    runners_up: impl Iterator<Item = &'a StatuteDocument>,
) -> BTreeMap<String, Vec<String>> {
    let winning = field_values(winner);
    let mut disputed: BTreeMap<&'static str, BTreeSet<String>> = BTreeMap::new();
    for doc in runners_up {
        for ((field, ours), (_, theirs)) in winning.iter().zip(field_values(doc)) {
            if *ours != theirs {
                disputed.entry(*field).or_default().insert(theirs);
            }
        }
    }
    disputed
        .into_iter()
        .map(|(field, values)| (field.to_string(), values.into_iter().collect()))
        .collect()
}
