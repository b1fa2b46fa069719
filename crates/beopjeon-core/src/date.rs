//! Date parsing for the notations used in Korean statute texts.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

static NOTATIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^(?P<y>[0-9]{4})(?P<m>[0-9]{2})(?P<d>[0-9]{2})$",
        r"(?P<y>[0-9]{4})\s*[.\-/]\s*(?P<m>[0-9]{1,2})\s*[.\-/]\s*(?P<d>[0-9]{1,2})",
        r"(?P<y>[0-9]{4})\s*년\s*(?P<m>[0-9]{1,2})\s*월\s*(?P<d>[0-9]{1,2})\s*일",
    ]
    .into_iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

/// Parse the first date found in `s`.
///
/// Accepts `2023. 6. 1.`, `2023-06-01`, `2023년 6월 1일` and the compact
/// `20230601` used by the law.go.kr API. Impossible dates yield `None`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let caps = NOTATIONS.iter().find_map(|re| re.captures(s))?;

    let y = caps["y"].parse().ok()?;
    let m = caps["m"].parse().ok()?;
    let d = caps["d"].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}
