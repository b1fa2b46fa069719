//! Structure extractor: flat text lines → statute hierarchy.
//!
//! Lines are scanned in reading order and classified against a
//! [`PatternSet`]. A stack of open nodes tracks the current position in the
//! hierarchy: a marker at depth D closes every open node at depth ≥ D and
//! opens a new one, unmatched lines become text of the innermost open node.
//!
//! XML leaves carry their element name. Metadata elements (`법령ID`,
//! `법령명_한글`, ...) fill document fields, numbering/flag elements are
//! skipped, and everything else is treated as body text.

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use crate::date::parse_date;
use crate::model::{Addendum, Level, Node, ParsedText, StatuteDocument};
use crate::ordinal;
use crate::pattern::{Marker, PatternSet};
use crate::warning::StructuralWarning;

/// Characters of the first line quoted in a `NoStatuteDetected` warning.
const FIRST_LINE_PREVIEW: usize = 80;

/// Longest line still considered a candidate title.
const MAX_TITLE_CHARS: usize = 100;

/// Result of extracting one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A document; its `warnings` include those raised while parsing.
    Document(StatuteDocument),
    /// The payload did not look like a statute and was excluded.
    NoStatute(StructuralWarning),
}

impl Extraction {
    pub fn document(&self) -> Option<&StatuteDocument> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::NoStatute(_) => None,
        }
    }

    pub fn into_document(self) -> Option<StatuteDocument> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::NoStatute(_) => None,
        }
    }

    pub fn warnings(&self) -> &[StructuralWarning] {
        match self {
            Self::Document(doc) => &doc.warnings,
            Self::NoStatute(w) => std::slice::from_ref(w),
        }
    }
}

// ── XML element roles ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaField {
    Code,
    Title,
    LawType,
    Promulgation,
    Enforcement,
    AddendumDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagRole {
    Meta(MetaField),
    Skip,
    Body,
}

fn tag_role(tag: &str) -> TagRole {
    match tag {
        "법령ID" => TagRole::Meta(MetaField::Code),
        "법령명_한글" | "법령명한글" => TagRole::Meta(MetaField::Title),
        "법종구분" => TagRole::Meta(MetaField::LawType),
        "공포일자" => TagRole::Meta(MetaField::Promulgation),
        "시행일자" => TagRole::Meta(MetaField::Enforcement),
        "부칙공포일자" => TagRole::Meta(MetaField::AddendumDate),
        "조문번호" | "조문가지번호" | "조문여부" | "조문키" | "조문제목" | "조문시행일자"
        | "조문변경여부" | "조문이동이전" | "조문이동이후" | "조문참고자료" | "항번호"
        | "항제개정유형" | "항제개정일자문자열" | "호번호" | "호가지번호" | "목번호"
        | "부칙키" | "부칙번호" | "부칙공포번호" | "개정문내용" | "제개정이유내용" | "공포번호" | "언어"
        | "제개정구분" | "소관부처" | "소관부처명" | "전화번호" | "편장절관" | "법령명약칭"
        | "법령명_한자" | "부서명" | "부서연락처" | "공동부령구분" => TagRole::Skip,
        t if t.starts_with("별표") => TagRole::Skip,
        _ => TagRole::Body,
    }
}

// ── Extractor ──

/// Rebuilds the statute hierarchy from ordered text lines.
#[derive(Debug, Clone)]
pub struct StructureExtractor {
    patterns: PatternSet,
    title: Regex,
    metadata: Regex,
    addendum: Regex,
    furniture: Vec<Regex>,
}

impl StructureExtractor {
    pub fn new(patterns: PatternSet) -> Result<Self, regex::Error> {
        Ok(Self {
            patterns,
            title: Regex::new(
                r"^\S.*?(?:법|령|규칙|규정|고시|훈령|예규|지침|조례)(?:\s*\([^)]*\))?$",
            )?,
            metadata: Regex::new(
                r"^\[\s*시행\s*(?P<enf>[^\]]*)\](?:\s*\[\s*(?P<kind>[^\s\]0-9,]+)\s*(?:제\s*(?P<no>[0-9\-]+)\s*호)?\s*,?\s*(?P<prom>[0-9]{4}\s*\.\s*[0-9]{1,2}\s*\.\s*[0-9]{1,2}\s*\.?)?[^\]]*\])?",
            )?,
            addendum: Regex::new(
                r"^(?P<label>부\s*칙(?:\s*(?P<meta><[^>]*>|\([^)]*\)))?)(?:\s+(?P<rest>.*))?$",
            )?,
            furniture: vec![
                Regex::new(r"^법제처\s+[0-9]+\s+국가법령정보센터$")?,
                Regex::new(r"^-\s*[0-9]+\s*-$")?,
            ],
        })
    }

    /// Extractor using the built-in Korean statute numbering patterns.
    pub fn korean_statute() -> Result<Self, regex::Error> {
        Self::new(PatternSet::korean_statute())
    }

    /// Extract zero or one document from a parsed payload.
    pub fn extract(&self, parsed: &ParsedText) -> Extraction {
        let mut state = State::new(parsed.warnings.clone());

        for line in &parsed.lines {
            let role = line.tag.as_deref().map(tag_role).unwrap_or(TagRole::Body);
            if role == TagRole::Skip {
                continue;
            }
            for raw in line.text.lines() {
                let text = raw.trim();
                if text.is_empty() {
                    continue;
                }
                if state.first_line.is_none() {
                    state.first_line = Some(text.chars().take(FIRST_LINE_PREVIEW).collect());
                }
                if let TagRole::Meta(field) = role {
                    state.apply_meta(field, text);
                    continue;
                }
                if let Some(rejected) = self.feed(&mut state, text) {
                    debug!(first_line = %rejected, "payload does not start with a statute title");
                    return Extraction::NoStatute(StructuralWarning::NoStatuteDetected {
                        first_line: rejected,
                    });
                }
            }
        }

        state.finish()
    }

    /// Process one body line. Returns the line when the payload is rejected.
    fn feed(&self, state: &mut State, text: &str) -> Option<String> {
        if self.furniture.iter().any(|re| re.is_match(text)) {
            return None;
        }

        if let Some(caps) = self.metadata.captures(text) {
            state.started = true;
            if let Some(enf) = caps.name("enf") {
                state.enforcement = state.enforcement.or_else(|| parse_date(enf.as_str()));
            }
            if let Some(kind) = caps.name("kind") {
                state.law_type.get_or_insert_with(|| kind.as_str().to_string());
            }
            if let Some(prom) = caps.name("prom") {
                state.promulgation = state.promulgation.or_else(|| parse_date(prom.as_str()));
            }
            return None;
        }

        let before_body = state.stack.is_empty() && state.chapters.is_empty();
        if state.title.is_none()
            && before_body
            && text.chars().count() <= MAX_TITLE_CHARS
            && self.title.is_match(text)
        {
            state.started = true;
            state.title = Some(text.to_string());
            return None;
        }

        if !state.started {
            return Some(text.chars().take(FIRST_LINE_PREVIEW).collect());
        }

        if let Some(caps) = self.addendum.captures(text) {
            let label = caps.name("label").map_or("부칙", |m| m.as_str()).to_string();
            let date = caps
                .name("meta")
                .and_then(|m| parse_date(m.as_str()))
                .or(state.pending_addendum_date.take());
            let rest = caps.name("rest").map_or("", |m| m.as_str().trim());
            state.open_addendum(label, date, rest);
            return None;
        }

        if state.in_addenda {
            state.push_addendum_text(text);
            return None;
        }

        match self.patterns.classify(text) {
            Some(marker) => self.open_marker(state, marker, text),
            None => state.push_text(text),
        }
        None
    }

    /// Open a marker node. An article whose text starts with a paragraph
    /// marker (`제3조(위원회) ① ...`) opens that paragraph as its first child.
    fn open_marker(&self, state: &mut State, mut marker: Marker, text: &str) {
        let inline = (marker.level == Level::Article)
            .then(|| self.patterns.classify(&marker.rest))
            .flatten()
            .filter(|m| m.level == Level::Paragraph);
        match inline {
            Some(paragraph) => {
                marker.rest.clear();
                state.open(marker, text);
                state.open(paragraph, text);
            }
            None => state.open(marker, text),
        }
    }
}

// ── Extraction state ──

struct State {
    started: bool,
    first_line: Option<String>,
    code: Option<String>,
    title: Option<String>,
    law_type: Option<String>,
    promulgation: Option<NaiveDate>,
    enforcement: Option<NaiveDate>,
    preamble: String,
    chapters: Vec<Node>,
    stack: Vec<Node>,
    in_addenda: bool,
    addenda: Vec<Addendum>,
    pending_addendum_date: Option<NaiveDate>,
    warnings: Vec<StructuralWarning>,
}

impl State {
    fn new(warnings: Vec<StructuralWarning>) -> Self {
        Self {
            started: false,
            first_line: None,
            code: None,
            title: None,
            law_type: None,
            promulgation: None,
            enforcement: None,
            preamble: String::new(),
            chapters: Vec::new(),
            stack: Vec::new(),
            in_addenda: false,
            addenda: Vec::new(),
            pending_addendum_date: None,
            warnings,
        }
    }

    fn apply_meta(&mut self, field: MetaField, value: &str) {
        self.started = true;
        match field {
            MetaField::Code => {
                self.code.get_or_insert_with(|| value.to_string());
            }
            MetaField::Title => {
                self.title.get_or_insert_with(|| value.to_string());
            }
            MetaField::LawType => {
                self.law_type.get_or_insert_with(|| value.to_string());
            }
            MetaField::Promulgation => {
                self.promulgation = self.promulgation.or_else(|| parse_date(value));
            }
            MetaField::Enforcement => {
                self.enforcement = self.enforcement.or_else(|| parse_date(value));
            }
            MetaField::AddendumDate => self.pending_addendum_date = parse_date(value),
        }
    }

    /// Pop the innermost open node and attach it to its parent.
    fn close_top(&mut self) {
        if let Some(node) = self.stack.pop() {
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => self.chapters.push(node),
            }
        }
    }

    fn close_to_depth(&mut self, depth: u8) {
        while self.stack.last().is_some_and(|n| n.level.depth() >= depth) {
            self.close_top();
        }
    }

    fn has_open(&self, level: Level) -> bool {
        self.stack.iter().any(|n| n.level == level)
    }

    fn open(&mut self, marker: Marker, line: &str) {
        let depth = marker.level.depth();
        if depth > Level::Article.depth() && !self.has_open(Level::Article) {
            // Paragraph-like marker outside any article: keep it as text.
            self.push_text(line);
            return;
        }

        if marker.ordinal.is_none() {
            self.warnings.push(StructuralWarning::UnnormalizableOrdinal {
                label: marker.label.clone(),
            });
        }

        self.close_to_depth(depth);
        if marker.level != Level::Chapter && self.stack.is_empty() {
            self.stack.push(Node::implicit_chapter());
        }

        let mut node = Node::new(marker.level, marker.label, marker.ordinal);
        node.branch = marker.branch;
        node.heading = marker.heading;
        node.text = marker.rest;
        self.stack.push(node);
    }

    fn push_text(&mut self, text: &str) {
        match self.stack.last_mut() {
            Some(node) => node.push_text(text),
            None => {
                if !self.preamble.is_empty() {
                    self.preamble.push(' ');
                }
                self.preamble.push_str(text);
            }
        }
    }

    fn open_addendum(&mut self, label: String, date: Option<NaiveDate>, rest: &str) {
        self.close_to_depth(0);
        self.in_addenda = true;
        self.addenda.push(Addendum {
            label,
            promulgation_date: date,
            text: rest.to_string(),
        });
    }

    fn push_addendum_text(&mut self, text: &str) {
        if let Some(addendum) = self.addenda.last_mut() {
            if !addendum.text.is_empty() {
                addendum.text.push('\n');
            }
            addendum.text.push_str(text);
        }
    }

    fn finish(mut self) -> Extraction {
        self.close_to_depth(0);

        let Some(title) = self.title else {
            let first_line = self.first_line.unwrap_or_default();
            return Extraction::NoStatute(StructuralWarning::NoStatuteDetected { first_line });
        };

        let mut warnings = self.warnings;
        check_ordinals(&self.chapters, &mut warnings);

        let code = self
            .code
            .unwrap_or_else(|| title.chars().filter(|c| !c.is_whitespace()).collect());

        let mut doc = StatuteDocument::new(code, title);
        doc.law_type = self.law_type;
        doc.promulgation_date = self.promulgation;
        doc.revision_date = self.enforcement.or(self.promulgation);
        doc.preamble = self.preamble;
        doc.hierarchy = self.chapters;
        doc.addenda = self.addenda;
        doc.warnings = warnings;

        debug!(
            statute_code = %doc.statute_code,
            articles = doc.article_count(),
            warnings = doc.warnings.len(),
            "extracted statute"
        );
        Extraction::Document(doc)
    }
}

// ── Ordinal checks ──

fn child_path(parent: &str, node: &Node) -> String {
    let label = if node.implicit { "(implicit)" } else { node.number_label.as_str() };
    if parent.is_empty() {
        label.to_string()
    } else {
        format!("{parent} > {label}")
    }
}

/// Ordinal bookkeeping for one numbered sequence. Numbering starts at 1, so
/// a sequence opening at 3 reports a gap.
struct Sequence<'a> {
    previous: (u32, u32),
    label: Option<&'a str>,
}

impl<'a> Sequence<'a> {
    fn new() -> Self {
        Self {
            previous: (0, 0),
            label: None,
        }
    }

    fn check(&mut self, path: &str, node: &'a Node, warnings: &mut Vec<StructuralWarning>) {
        let Some(ord) = node.ordinal else { return };
        let key = ordinal::compare_key(ord, node.branch);
        let expected = self.previous.0.saturating_add(1);

        match self.label {
            Some(previous) if key <= self.previous => {
                warnings.push(StructuralWarning::OrdinalRegression {
                    path: path.to_string(),
                    previous: previous.to_string(),
                    found: node.number_label.clone(),
                });
            }
            _ if node.branch.is_none() && ord > expected => {
                warnings.push(StructuralWarning::OrdinalGap {
                    path: path.to_string(),
                    expected,
                    found: ord,
                });
            }
            _ => {}
        }
        self.previous = key;
        self.label = Some(&node.number_label);
    }
}

/// Record gaps and regressions. Articles are numbered continuously through
/// the whole statute; every other level restarts under each parent.
fn check_ordinals(chapters: &[Node], warnings: &mut Vec<StructuralWarning>) {
    let mut articles = Vec::new();
    check_siblings(chapters, "", &mut articles, warnings);

    let mut sequence = Sequence::new();
    for (path, article) in &articles {
        sequence.check(path, article, warnings);
    }
}

fn check_siblings<'a>(
    nodes: &'a [Node],
    path: &str,
    articles: &mut Vec<(String, &'a Node)>,
    warnings: &mut Vec<StructuralWarning>,
) {
    let group = if path.is_empty() { "(root)" } else { path };
    let mut sequence = Sequence::new();

    for node in nodes {
        if node.implicit {
            continue;
        }
        if node.level == Level::Article {
            articles.push((group.to_string(), node));
        } else {
            sequence.check(group, node, warnings);
        }
    }

    for node in nodes {
        if !node.children.is_empty() {
            check_siblings(&node.children, &child_path(path, node), articles, warnings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Rank, TextLine};

    fn extractor() -> StructureExtractor {
        StructureExtractor::korean_statute().unwrap()
    }

    fn lines(texts: &[&str]) -> ParsedText {
        ParsedText {
            lines: texts
                .iter()
                .enumerate()
                .map(|(i, t)| TextLine::new(*t, 1, Rank(1, i as u32, 0)))
                .collect(),
            warnings: Vec::new(),
        }
    }

    fn extract_doc(texts: &[&str]) -> StatuteDocument {
        extractor()
            .extract(&lines(texts))
            .into_document()
            .expect("expected a document")
    }

    fn ordinals(nodes: &[&Node]) -> Vec<Option<u32>> {
        nodes.iter().map(|n| n.ordinal).collect()
    }

    #[test]
    fn two_page_pdf_yields_two_articles() {
        let parsed = ParsedText {
            lines: vec![
                TextLine::new("민법", 1, Rank(1, 0, 0)),
                TextLine::new("[시행 2023. 6. 1.] [법률 제19000호, 2023. 1. 3., 일부개정]", 1, Rank(1, 1, 0)),
                TextLine::new("제1조 (목적) 이 법은 민사에 관한 사항을 규정한다.", 1, Rank(1, 2, 0)),
                TextLine::new("법제처 1 국가법령정보센터", 1, Rank(1, 3, 0)),
                TextLine::new("제2조 (정의) 이 법에서 사용하는 용어의 뜻은 다음과 같다.", 2, Rank(2, 0, 0)),
            ],
            warnings: Vec::new(),
        };
        let doc = extractor().extract(&parsed).into_document().unwrap();

        assert_eq!(doc.title, "민법");
        assert_eq!(doc.statute_code, "민법");
        assert_eq!(doc.law_type.as_deref(), Some("법률"));
        assert_eq!(doc.revision_date, NaiveDate::from_ymd_opt(2023, 6, 1));
        assert_eq!(doc.promulgation_date, NaiveDate::from_ymd_opt(2023, 1, 3));

        let articles = doc.articles();
        assert_eq!(ordinals(&articles), vec![Some(1), Some(2)]);
        assert_eq!(articles[0].heading.as_deref(), Some("목적"));
        assert_eq!(articles[1].text, "이 법에서 사용하는 용어의 뜻은 다음과 같다.");
        assert_eq!(doc.hierarchy.len(), 1);
        assert!(doc.hierarchy[0].implicit);
        assert!(doc.warnings.is_empty());
    }

    #[test]
    fn body_text_first_is_not_a_statute() {
        let result = extractor().extract(&lines(&["이 문서는 회의록입니다.", "제1조 (목적) 본문"]));
        assert_eq!(
            result,
            Extraction::NoStatute(StructuralWarning::NoStatuteDetected {
                first_line: "이 문서는 회의록입니다.".into()
            })
        );
        assert!(result.document().is_none());
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn empty_payload_is_not_a_statute() {
        let result = extractor().extract(&ParsedText::default());
        assert!(matches!(result, Extraction::NoStatute(_)));
    }

    #[test]
    fn full_hierarchy_nests_by_depth() {
        let doc = extract_doc(&[
            "개인정보 보호법",
            "제1장 총칙",
            "제1조(목적) 이 법은 개인정보의 처리에 관한 사항을 정한다.",
            "제2조(정의) 이 법에서 사용하는 용어의 뜻은 다음과 같다.",
            "1. \"개인정보\"란 다음 각 목의 정보를 말한다.",
            "가. 성명",
            "나. 주민등록번호",
            "2. \"처리\"란 수집, 생성을 말한다.",
            "제2장 개인정보 보호정책",
            "제1절 보호위원회",
            "제3조(위원회) ① 위원회를 둔다.",
            "② 위원회는 독립하여 업무를 수행한다.",
        ]);

        assert_eq!(doc.hierarchy.len(), 2);
        let ch1 = &doc.hierarchy[0];
        assert_eq!(ch1.heading.as_deref(), Some("총칙"));
        assert_eq!(ch1.children.len(), 2);

        let art2 = &ch1.children[1];
        assert_eq!(art2.children.len(), 2);
        assert_eq!(art2.children[0].level, Level::Item);
        assert_eq!(art2.children[0].children.len(), 2);
        assert_eq!(art2.children[0].children[1].text, "주민등록번호");

        let ch2 = &doc.hierarchy[1];
        assert_eq!(ch2.children[0].level, Level::Section);
        let art3 = &ch2.children[0].children[0];
        assert_eq!(art3.number_label, "제3조");
        assert_eq!(art3.heading.as_deref(), Some("위원회"));
        assert!(art3.text.is_empty());
        let paragraphs: Vec<_> = art3.children.iter().map(|n| (n.level, n.ordinal)).collect();
        assert_eq!(paragraphs, vec![(Level::Paragraph, Some(1)), (Level::Paragraph, Some(2))]);
        assert_eq!(art3.children[0].text, "위원회를 둔다.");
        assert!(doc.warnings.is_empty(), "{:?}", doc.warnings);
    }

    #[test]
    fn first_paragraph_on_article_line_is_a_paragraph() {
        let doc = extract_doc(&["도로법", "제1조 ① 도로를 관리한다.", "② 관리청은 국토교통부장관으로 한다.", "제2조 다음 조"]);
        let first = doc.articles()[0];
        assert!(first.text.is_empty());
        assert_eq!(first.children.len(), 2);
        assert_eq!(first.children[0].number_label, "①");
        assert_eq!(first.children[0].text, "도로를 관리한다.");
        assert!(doc.warnings.is_empty(), "{:?}", doc.warnings);
    }

    #[test]
    fn article_text_with_item_marker_stays_text() {
        let doc = extract_doc(&["도로법", "제1조(목적) 1. 도로를 관리한다."]);
        let first = doc.articles()[0];
        assert_eq!(first.text, "1. 도로를 관리한다.");
        assert!(first.children.is_empty());
    }

    #[test]
    fn sequences_are_checked_from_one() {
        let doc = extract_doc(&["건축법", "제3조 본문", "② 둘째 항", "③ 셋째 항"]);
        assert_eq!(
            doc.warnings,
            vec![
                StructuralWarning::OrdinalGap {
                    path: "(implicit) > 제3조".into(),
                    expected: 1,
                    found: 2
                },
                StructuralWarning::OrdinalGap {
                    path: "(implicit)".into(),
                    expected: 1,
                    found: 3
                },
            ]
        );
    }

    #[test]
    fn article_numbering_continues_across_chapters() {
        let doc = extract_doc(&["건축법", "제1장 총칙", "제1조 가", "제2조 나", "제2장 허가", "제3조 다", "제4조 라"]);
        assert_eq!(doc.article_count(), 4);
        assert!(doc.warnings.is_empty(), "{:?}", doc.warnings);
    }

    #[test]
    fn huge_ordinal_does_not_overflow() {
        let doc = extract_doc(&["건축법", "제1조 가", "제4294967295조 나", "제4294967295조 다"]);
        assert_eq!(doc.article_count(), 3);
        assert!(matches!(doc.warnings[0], StructuralWarning::OrdinalGap { expected: 2, .. }));
        assert!(matches!(doc.warnings[1], StructuralWarning::OrdinalRegression { .. }));
    }

    #[test]
    fn continuation_lines_join_innermost_node() {
        let doc = extract_doc(&["도로법", "제1조(목적) 이 법은 도로망의", "계획수립을 규정한다."]);
        assert_eq!(doc.articles()[0].text, "이 법은 도로망의 계획수립을 규정한다.");
    }

    #[test]
    fn text_before_first_article_is_preamble() {
        let doc = extract_doc(&["헌법", "유구한 역사와 전통에 빛나는", "우리 대한국민은", "제1조 대한민국은 민주공화국이다."]);
        assert_eq!(doc.preamble, "유구한 역사와 전통에 빛나는 우리 대한국민은");
        assert_eq!(doc.article_count(), 1);
    }

    #[test]
    fn paragraph_marker_outside_article_is_text() {
        let doc = extract_doc(&["도로법", "① 머리말"]);
        assert_eq!(doc.preamble, "① 머리말");
        assert!(doc.hierarchy.is_empty());
    }

    #[test]
    fn branch_articles_keep_order_without_gap_warning() {
        let doc = extract_doc(&["건축법", "제1조 본문", "제1조의2 삽입된 조", "제2조 다음 조"]);
        let articles = doc.articles();
        assert_eq!(articles[1].branch, Some(2));
        assert_eq!(articles[1].sort_key().as_deref(), Some("0001.002"));
        assert!(doc.warnings.is_empty(), "{:?}", doc.warnings);
    }

    #[test]
    fn gap_and_regression_are_warnings() {
        let doc = extract_doc(&["건축법", "제1조 가", "제4조 나", "제4조 다", "제5조 라"]);
        assert_eq!(doc.article_count(), 4);
        assert_eq!(
            doc.warnings,
            vec![
                StructuralWarning::OrdinalGap {
                    path: "(implicit)".into(),
                    expected: 2,
                    found: 4
                },
                StructuralWarning::OrdinalRegression {
                    path: "(implicit)".into(),
                    previous: "제4조".into(),
                    found: "제4조".into()
                },
            ]
        );
    }

    #[test]
    fn unnormalizable_ordinal_does_not_block_siblings() {
        let doc = extract_doc(&["건축법", "제1조 가", "제십십조 나", "제2조 다"]);
        assert_eq!(ordinals(&doc.articles()), vec![Some(1), None, Some(2)]);
        assert_eq!(
            doc.warnings,
            vec![StructuralWarning::UnnormalizableOrdinal {
                label: "제십십조".into()
            }]
        );
    }

    #[test]
    fn parse_warnings_are_carried_into_document() {
        let mut parsed = lines(&["건축법", "제1조 본문"]);
        parsed.warnings.push(StructuralWarning::LowTextYield { page: 2 });
        let doc = extractor().extract(&parsed).into_document().unwrap();
        assert_eq!(doc.warnings, vec![StructuralWarning::LowTextYield { page: 2 }]);
    }

    #[test]
    fn addenda_collect_trailing_provisions() {
        let doc = extract_doc(&[
            "건축법",
            "제1조 본문",
            "부칙 <법률 제19000호, 2023. 1. 3.>",
            "제1조(시행일) 이 법은 공포 후 6개월이 경과한 날부터 시행한다.",
            "부칙 <법률 제18000호, 2021. 7. 20.>",
            "이 법은 공포한 날부터 시행한다.",
        ]);
        assert_eq!(doc.article_count(), 1);
        assert_eq!(doc.addenda.len(), 2);
        assert_eq!(doc.addenda[0].promulgation_date, NaiveDate::from_ymd_opt(2023, 1, 3));
        assert!(doc.addenda[0].text.starts_with("제1조(시행일)"));
        assert_eq!(doc.addenda[1].text, "이 법은 공포한 날부터 시행한다.");
    }

    #[test]
    fn xml_tags_fill_metadata_and_skip_numbering() {
        let tagged = |text: &str, tag: &str, i: u32| TextLine::new(text, 0, Rank(0, i, 0)).with_tag(tag);
        let parsed = ParsedText {
            lines: vec![
                tagged("001706", "법령ID", 0),
                tagged("20230103", "공포일자", 1),
                tagged("법률", "법종구분", 2),
                tagged("민법", "법령명_한글", 3),
                tagged("20230601", "시행일자", 4),
                tagged("법무부", "소관부처", 5),
                tagged("0001", "조문번호", 6),
                tagged("목적", "조문제목", 7),
                tagged("제1조(목적) 민사에 관하여 법률에 규정이 없으면\n관습법에 의한다.", "조문내용", 8),
                tagged("20230103", "부칙공포일자", 9),
                tagged("부칙 <제19000호>\n이 법은 공포한 날부터 시행한다.", "부칙내용", 10),
            ],
            warnings: Vec::new(),
        };
        let doc = extractor().extract(&parsed).into_document().unwrap();

        assert_eq!(doc.statute_code, "001706");
        assert_eq!(doc.title, "민법");
        assert_eq!(doc.law_type.as_deref(), Some("법률"));
        assert_eq!(doc.revision_date, NaiveDate::from_ymd_opt(2023, 6, 1));
        assert!(doc.preamble.is_empty());
        assert_eq!(doc.articles()[0].text, "민사에 관하여 법률에 규정이 없으면 관습법에 의한다.");
        assert_eq!(doc.addenda[0].promulgation_date, NaiveDate::from_ymd_opt(2023, 1, 3));
    }

    #[test]
    fn revision_falls_back_to_promulgation() {
        let parsed = ParsedText {
            lines: vec![
                TextLine::new("소득세법", 0, Rank(0, 0, 0)),
                TextLine::new("20200101", 0, Rank(0, 1, 0)).with_tag("공포일자"),
                TextLine::new("제1조 본문", 0, Rank(0, 2, 0)),
            ],
            warnings: Vec::new(),
        };
        let doc = extractor().extract(&parsed).into_document().unwrap();
        assert_eq!(doc.revision_date, NaiveDate::from_ymd_opt(2020, 1, 1));
    }

    #[test]
    fn extraction_is_deterministic() {
        let parsed = lines(&["건축법", "제1장 총칙", "제1조 가", "제3조 나"]);
        let ex = extractor();
        assert_eq!(ex.extract(&parsed), ex.extract(&parsed));
    }
}
