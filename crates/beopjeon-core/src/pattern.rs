//! Numbering-pattern table used to classify lines into hierarchy markers.
//!
//! Classification is data-driven: an ordered list of
//! `(regex, level, normaliser)` entries. Each regex may define the named
//! groups `label` (the marker as written), `num`, `branch`, `heading`, and
//! `rest`/`body` (text following the marker).

use regex::{Captures, Regex};

use crate::model::Level;
use crate::ordinal;

/// Chapter and article numbers: Arabic, full-width, or Sino-Korean numerals.
const NUM: &str = r"[0-9０-９一二三四五六七八九十百千壹貳參일이삼사오육륙칠팔구십백천]+";

/// How the `num` group of a pattern is turned into an ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Arabic or Sino-Korean numerals.
    Numeral,
    /// Circled digits (①, ②, ...).
    Circled,
    /// Hangul syllable sequence (가, 나, 다, ...).
    HangulSyllable,
}

impl Normalizer {
    fn apply(&self, token: &str) -> Option<u32> {
        match self {
            Self::Numeral => ordinal::normalize_numeral(token),
            Self::Circled => single_char(token).and_then(ordinal::circled_number),
            Self::HangulSyllable => single_char(token).and_then(ordinal::hangul_ordinal),
        }
    }
}

fn single_char(token: &str) -> Option<char> {
    let mut chars = token.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

/// One entry of the pattern table.
#[derive(Debug, Clone)]
pub struct MarkerPattern {
    pub level: Level,
    regex: Regex,
    normalizer: Normalizer,
}

impl MarkerPattern {
    pub fn new(level: Level, pattern: &str, normalizer: Normalizer) -> Result<Self, regex::Error> {
        Ok(Self {
            level,
            regex: Regex::new(pattern)?,
            normalizer,
        })
    }

    fn matches(&self, line: &str) -> Option<Marker> {
        let caps = self.regex.captures(line)?;
        let label = caps
            .name("label")
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let ordinal = caps
            .name("num")
            .and_then(|m| self.normalizer.apply(m.as_str()));
        let branch = caps
            .name("branch")
            .and_then(|m| ordinal::normalize_numeral(m.as_str()));
        let heading = non_empty(&caps, &["heading"]);
        let rest = non_empty(&caps, &["rest", "body"]).unwrap_or_default();

        Some(Marker {
            level: self.level,
            label,
            ordinal,
            branch,
            heading,
            rest,
        })
    }
}

fn non_empty(caps: &Captures<'_>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| caps.name(n))
        .map(|m| m.as_str().trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// A line classified as a hierarchy marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub level: Level,
    pub label: String,
    /// `None` when the number could not be normalised.
    pub ordinal: Option<u32>,
    pub branch: Option<u32>,
    pub heading: Option<String>,
    /// Text on the same line after the marker (and heading).
    pub rest: String,
}

/// Ordered pattern table.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<MarkerPattern>,
}

impl PatternSet {
    /// Build a table; entries are kept ordered shallowest level first.
    pub fn new(mut patterns: Vec<MarkerPattern>) -> Self {
        patterns.sort_by_key(|p| p.level.depth());
        Self { patterns }
    }

    /// Patterns for statutes published by the Korean Ministry of Government Legislation.
    pub fn korean_statute() -> Self {
        let table = [
            (
                Level::Chapter,
                format!(
                    r"^(?P<label>제\s*(?P<num>{NUM})\s*장(?:\s*의\s*(?P<branch>[0-9]+))?)(?:\s+(?P<heading>.+)|)$"
                ),
                Normalizer::Numeral,
            ),
            (
                Level::Section,
                format!(
                    r"^(?P<label>제\s*(?P<num>{NUM})\s*절(?:\s*의\s*(?P<branch>[0-9]+))?)(?:\s+(?P<heading>.+)|)$"
                ),
                Normalizer::Numeral,
            ),
            (
                Level::Article,
                format!(
                    r"^(?P<label>제\s*(?P<num>{NUM})\s*조(?:\s*의\s*(?P<branch>[0-9]+))?)(?:\s*\((?P<heading>[^)]*)\)\s*(?P<rest>.*)|\s+(?P<body>.*)|)$"
                ),
                Normalizer::Numeral,
            ),
            (
                Level::Paragraph,
                r"^(?P<label>(?P<num>[\x{2460}-\x{2473}\x{3251}-\x{325F}\x{32B1}-\x{32BF}]))\s*(?P<body>.*)$"
                    .to_string(),
                Normalizer::Circled,
            ),
            (
                Level::Item,
                r"^(?P<label>(?P<num>[0-9]{1,3})(?:\s*의\s*(?P<branch>[0-9]+))?\.)(?:\s+(?P<body>.*)|)$"
                    .to_string(),
                Normalizer::Numeral,
            ),
            (
                Level::SubItem,
                r"^(?P<label>(?P<num>[가-힣])(?:\s*의\s*(?P<branch>[0-9]+))?\.)(?:\s+(?P<body>.*)|)$"
                    .to_string(),
                Normalizer::HangulSyllable,
            ),
        ];

        let patterns = table
            .into_iter()
            .filter_map(|(level, pattern, normalizer)| {
                match MarkerPattern::new(level, &pattern, normalizer) {
                    Ok(p) => Some(p),
                    Err(e) => {
                        tracing::error!(level = level.as_str(), error = %e, "invalid built-in pattern");
                        None
                    }
                }
            })
            .collect();
        Self::new(patterns)
    }

    /// Classify a trimmed line. When several patterns match, the shallowest
    /// level wins.
    pub fn classify(&self, line: &str) -> Option<Marker> {
        self.patterns
            .iter()
            .filter_map(|p| p.matches(line))
            .min_by_key(|m| m.level.depth())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::korean_statute()
    }
}
