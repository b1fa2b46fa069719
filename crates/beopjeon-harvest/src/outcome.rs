//! Work items and their terminal outcomes.

use beopjeon_core::{Format, SourceRef, StatuteDocument, StructuralWarning};
use beopjeon_format::ParseError;
use beopjeon_sync::FetchError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One statute revision to harvest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub target: SourceRef,
    /// Overrides the source's declared format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    /// Overrides the extracted statute code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statute_code: Option<String>,
}

impl WorkItem {
    pub fn new(target: SourceRef) -> Self {
        Self {
            target,
            format: None,
            statute_code: None,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_statute_code(mut self, code: impl Into<String>) -> Self {
        self.statute_code = Some(code.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The run was cancelled before this item finished.
    Cancelled,
    /// The payload parsed but did not look like a statute.
    NotAStatute(StructuralWarning),
}

impl SkipReason {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::NotAStatute(_) => "not_a_statute",
        }
    }
}

/// Why an item failed for good.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    /// The worker task died before reporting.
    #[error("worker aborted: {0}")]
    Aborted(String),
}

impl ItemError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Fetch(e) => e.kind(),
            Self::Parse(ParseError::UnsupportedFormat(_)) => "unsupported_format",
            Self::Parse(ParseError::CorruptPayload { .. }) => "corrupt_payload",
            Self::Aborted(_) => "aborted",
        }
    }
}

/// Terminal state of one work item. Every item ends in exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success {
        /// Provenance stamped by the adapter.
        source: SourceRef,
        document: StatuteDocument,
        attempts: u32,
    },
    Skipped {
        target: SourceRef,
        reason: SkipReason,
    },
    Failed {
        target: SourceRef,
        error: ItemError,
        attempts: u32,
    },
}

impl Outcome {
    pub fn target(&self) -> &SourceRef {
        match self {
            Self::Success { source, .. } => source,
            Self::Skipped { target, .. } | Self::Failed { target, .. } => target,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn document(&self) -> Option<&StatuteDocument> {
        match self {
            Self::Success { document, .. } => Some(document),
            _ => None,
        }
    }

    /// Fetch attempts made; zero for skipped items.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Success { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
            Self::Skipped { .. } => 0,
        }
    }

    /// Structural warnings carried by this outcome.
    pub fn warnings(&self) -> &[StructuralWarning] {
        match self {
            Self::Success { document, .. } => &document.warnings,
            Self::Skipped {
                reason: SkipReason::NotAStatute(w),
                ..
            } => std::slice::from_ref(w),
            _ => &[],
        }
    }
}
