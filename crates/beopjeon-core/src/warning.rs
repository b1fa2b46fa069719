//! Structural warnings: problems that never block document emission.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A non-fatal structural finding attached to a document (or, for
/// `NoStatuteDetected`, the reason no document was produced).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuralWarning {
    /// A PDF page produced no extractable characters (likely a scanned image).
    LowTextYield { page: u32 },
    /// Sibling numbering skipped one or more values.
    OrdinalGap {
        path: String,
        expected: u32,
        found: u32,
    },
    /// Sibling numbering repeated or went backwards.
    OrdinalRegression {
        path: String,
        previous: String,
        found: String,
    },
    /// A marker whose number could not be converted to an integer.
    UnnormalizableOrdinal { label: String },
    /// The payload did not start with a title or metadata line.
    NoStatuteDetected { first_line: String },
}

impl StructuralWarning {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LowTextYield { .. } => "low_text_yield",
            Self::OrdinalGap { .. } => "ordinal_gap",
            Self::OrdinalRegression { .. } => "ordinal_regression",
            Self::UnnormalizableOrdinal { .. } => "unnormalizable_ordinal",
            Self::NoStatuteDetected { .. } => "no_statute_detected",
        }
    }
}

impl fmt::Display for StructuralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowTextYield { page } => write!(f, "page {page} yielded no text"),
            Self::OrdinalGap {
                path,
                expected,
                found,
            } => write!(f, "{path}: expected ordinal {expected}, found {found}"),
            Self::OrdinalRegression {
                path,
                previous,
                found,
            } => write!(f, "{path}: ordinal {found} does not follow {previous}"),
            Self::UnnormalizableOrdinal { label } => {
                write!(f, "could not normalise marker {label:?}")
            }
            Self::NoStatuteDetected { first_line } => {
                write!(f, "no statute title found (first line: {first_line:?})")
            }
        }
    }
}
