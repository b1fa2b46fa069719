//! Run-level report: one outcome per input item, in input order.

use std::collections::BTreeMap;

use beopjeon_core::StatuteDocument;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::outcome::Outcome;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HarvestError {
    /// Every item failed or was skipped; there is nothing to publish.
    #[error("harvest produced no documents from {attempted} item(s)")]
    AllItemsFailed { attempted: usize },
    #[error("invalid harvest configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone)]
pub struct HarvestReport {
    /// `outcomes[i]` belongs to input item `i`.
    pub outcomes: Vec<Outcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Counts for logs and the CLI summary line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub warnings: usize,
    pub retries: u32,
    /// Failure and skip reasons by kind.
    pub reasons: BTreeMap<String, usize>,
}

impl HarvestReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn documents(&self) -> impl Iterator<Item = &StatuteDocument> {
        self.outcomes.iter().filter_map(Outcome::document)
    }

    pub fn into_documents(self) -> Vec<StatuteDocument> {
        self.outcomes
            .into_iter()
            .filter_map(|o| match o {
                Outcome::Success { document, .. } => Some(document),
                _ => None,
            })
            .collect()
    }

    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// A non-empty run that produced no document at all.
    pub fn is_fatal(&self) -> bool {
        !self.outcomes.is_empty() && self.success_count() == 0
    }

    pub fn ensure_success(&self) -> Result<(), HarvestError> {
        if self.is_fatal() {
            return Err(HarvestError::AllItemsFailed {
                attempted: self.outcomes.len(),
            });
        }
        Ok(())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            total: self.outcomes.len(),
            ..Default::default()
        };
        for outcome in &self.outcomes {
            summary.warnings += outcome.warnings().len();
            summary.retries += outcome.attempts().saturating_sub(1);
            match outcome {
                Outcome::Success { .. } => summary.succeeded += 1,
                Outcome::Skipped { reason, .. } => {
                    summary.skipped += 1;
                    *summary.reasons.entry(reason.kind().to_string()).or_default() += 1;
                }
                Outcome::Failed { error, .. } => {
                    summary.failed += 1;
                    *summary.reasons.entry(error.kind().to_string()).or_default() += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use beopjeon_core::SourceRef;
    use beopjeon_sync::FetchError;

    use super::*;
    use crate::outcome::{ItemError, SkipReason};

    fn report(outcomes: Vec<Outcome>) -> HarvestReport {
        let now = Utc::now();
        HarvestReport {
            outcomes,
            started_at: now,
            finished_at: now,
        }
    }

    fn failed(uri: &str) -> Outcome {
        Outcome::Failed {
            target: SourceRef::new("web", uri),
            error: ItemError::Fetch(FetchError::NotFound(uri.into())),
            attempts: 1,
        }
    }

    fn success(code: &str, attempts: u32) -> Outcome {
        Outcome::Success {
            source: SourceRef::new("web", code).stamped(b"x", Utc::now()),
            document: StatuteDocument::new(code, "시험법"),
            attempts,
        }
    }

    #[test]
    fn empty_run_is_not_fatal() {
        let r = report(vec![]);
        assert!(!r.is_fatal());
        assert!(r.ensure_success().is_ok());
    }

    #[test]
    fn all_failed_is_fatal() {
        let r = report(vec![failed("a"), failed("b")]);
        assert_eq!(
            r.ensure_success(),
            Err(HarvestError::AllItemsFailed { attempted: 2 })
        );
    }

    #[test]
    fn all_skipped_is_fatal() {
        let r = report(vec![Outcome::Skipped {
            target: SourceRef::new("web", "a"),
            reason: SkipReason::Cancelled,
        }]);
        assert!(r.is_fatal());
    }

    #[test]
    fn summary_counts_and_reasons() {
        let r = report(vec![success("001", 3), failed("b"), failed("c"), success("002", 1)]);
        assert!(!r.is_fatal());
        let s = r.summary();
        assert_eq!(s.total, 4);
        assert_eq!(s.succeeded, 2);
        assert_eq!(s.failed, 2);
        assert_eq!(s.retries, 2);
        assert_eq!(s.reasons.get("not_found"), Some(&2));
        assert_eq!(r.documents().count(), 2);
        assert_eq!(r.into_documents()[1].statute_code, "002");
    }
}
