//! Ordinal normalisation for Korean statute numbering.
//!
//! Converts numbering markers into plain integers and lexicographically
//! sortable keys so that `ORDER BY sort_key` recovers document order.
//!
//! # Korean statute numbering conventions
//!
//! - Articles: 제1조, 제2조, ..., 제10조
//! - Branch articles (inserted by amendment): 제3조의2 sits between 제3조 and 제4조
//! - Paragraphs: circled digits ①, ②, ... ㊿
//! - Items: 1., 2., 1의2.
//! - Sub-items: 가., 나., 다., ... 하.
//! - Older texts spell numbers out: 제십이조 / 第十二條

/// Hangul syllables used as sub-item markers, in order.
const HANGUL_ORDINALS: &str = "가나다라마바사아자차카타파하";

/// Normalise a numbering token into a positive integer.
///
/// Accepts ASCII or full-width digits ("12", "１２") and Sino-Korean numerals
/// written in Hangul or Hanja ("십이", "十二"). Returns `None` for anything
/// else, including zero.
pub fn normalize_numeral(token: &str) -> Option<u32> {
    let token: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    if token.is_empty() {
        return None;
    }

    let mut value: u32 = 0;
    for c in token.chars() {
        let digit = if c.is_ascii_digit() {
            c as u32 - '0' as u32
        } else if ('０'..='９').contains(&c) {
            c as u32 - '０' as u32
        } else {
            return sino_korean(&token);
        };
        value = value.checked_mul(10)?.checked_add(digit)?;
    }
    (value > 0).then_some(value)
}

/// Parse a Sino-Korean numeral ("이십삼" → 23, "百一" → 101).
///
/// Units must strictly decrease left to right and digits may not repeat
/// without an intervening unit, so malformed tokens like "십십" are rejected.
fn sino_korean(token: &str) -> Option<u32> {
    let mut total = 0u32;
    let mut pending: Option<u32> = None;
    let mut last_unit = u32::MAX;

    for c in token.chars() {
        if let Some(d) = sino_digit(c) {
            if pending.is_some() {
                return None;
            }
            pending = Some(d);
        } else if let Some(unit) = sino_unit(c) {
            if unit >= last_unit {
                return None;
            }
            total += pending.take().unwrap_or(1) * unit;
            last_unit = unit;
        } else {
            return None;
        }
    }

    total += pending.unwrap_or(0);
    (total > 0).then_some(total)
}

fn sino_digit(c: char) -> Option<u32> {
    match c {
        '일' | '一' | '壹' => Some(1),
        '이' | '二' | '貳' => Some(2),
        '삼' | '三' | '參' => Some(3),
        '사' | '四' => Some(4),
        '오' | '五' => Some(5),
        '육' | '륙' | '六' => Some(6),
        '칠' | '七' => Some(7),
        '팔' | '八' => Some(8),
        '구' | '九' => Some(9),
        _ => None,
    }
}

fn sino_unit(c: char) -> Option<u32> {
    match c {
        '십' | '十' => Some(10),
        '백' | '百' => Some(100),
        '천' | '千' => Some(1000),
        _ => None,
    }
}

/// Value of a circled-digit paragraph marker (① → 1, ㉑ → 21, ㊿ → 50).
pub fn circled_number(c: char) -> Option<u32> {
    let cp = c as u32;
    match cp {
        0x2460..=0x2473 => Some(cp - 0x2460 + 1),
        0x3251..=0x325F => Some(cp - 0x3251 + 21),
        0x32B1..=0x32BF => Some(cp - 0x32B1 + 36),
        _ => None,
    }
}

/// Position of a Hangul sub-item marker (가 → 1, 나 → 2, ... 하 → 14).
pub fn hangul_ordinal(c: char) -> Option<u32> {
    HANGUL_ORDINALS
        .chars()
        .position(|h| h == c)
        .map(|i| i as u32 + 1)
}

/// Sortable key for a numbered node.
///
/// "3" → "0003.000", "3의2" → "0003.002". Four digits for the base number
/// because codes such as the Civil Act run past 제1000조.
pub fn sort_key(ordinal: u32, branch: Option<u32>) -> String {
    format!("{:04}.{:03}", ordinal, branch.unwrap_or(0))
}

/// Comparison key for sibling ordering checks.
pub fn compare_key(ordinal: u32, branch: Option<u32>) -> (u32, u32) {
    (ordinal, branch.unwrap_or(0))
}
