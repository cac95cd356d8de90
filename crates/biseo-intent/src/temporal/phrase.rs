//! Locating and removing temporal words inside a whole utterance.

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, MatchKind};
use regex::Regex;

/// Named period words, with the spaced spellings people actually type.
const PERIOD_TOKENS: &[&str] = &[
    "다다음주말",
    "다다음 주말",
    "다음주말",
    "다음 주말",
    "이번주말",
    "이번 주말",
    "지난주말",
    "지난 주말",
    "저번주말",
    "저번 주말",
    "다다음주",
    "다다음 주",
    "차차주",
    "다음주",
    "다음 주",
    "차주",
    "담주",
    "이번주",
    "이번 주",
    "지난주",
    "지난 주",
    "저번주",
    "저번 주",
    "주말",
    "이번달",
    "이번 달",
    "다음달",
    "다음 달",
    "지난달",
    "지난 달",
    "저번달",
    "저번 달",
    "내일모레",
    "내일 모레",
    "그저께",
    "그제",
    "모레",
    "글피",
    "내일",
    "오늘",
    "어제",
    "월요일",
    "화요일",
    "수요일",
    "목요일",
    "금요일",
    "토요일",
    "일요일",
];

/// Words that only qualify a time and carry no content on their own.
const MARKER_WORDS: &[&str] = &[
    "오전", "아침", "새벽", "오후", "저녁", "밤", "종일", "하루", "몇시", "시", "에", "부터",
    "까지",
];

static PERIODS: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(PERIOD_TOKENS)
        .expect("static period table")
});

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\d{4}[-./]\d{1,2}[-./]\d{1,2}|\d{1,2}월\s*\d{1,2}일|\d{1,2}/\d{1,2}|\d{1,2}\s*[주일]\s*[후뒤]|\d{1,2}일",
    )
    .expect("literal regex")
});

/// Patterns removed by [`strip_temporal`], applied in order.  Durations go
/// first so "2시간" is not half-eaten as "2시".
static STRIP_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{1,2}\s*시간(?:\s*\d{1,2}\s*분)?(?:\s*(?:동안|간))?",
        r"\d{1,3}\s*분\s*(?:동안|간)",
        r"\d{1,2}\s*일\s*(?:동안|간)",
        r"(?:(?:오전|아침|새벽|오후|저녁|밤)\s*)?\d{1,2}\s*시(?:\s*\d{1,2}\s*분|\s*반)?(?:에|부터|까지)?",
        r"(?:(?:오전|오후)\s*)?\d{1,2}:[0-5]\d(?:에|부터|까지)?",
        r"(?:\d{4}[-./]\d{1,2}[-./]\d{1,2}|\d{1,2}월\s*\d{1,2}일|\d{1,2}/\d{1,2}|\d{1,2}\s*[주일]\s*[후뒤]|\d{1,2}일)(?:에|부터|까지)?",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("literal regex"))
    .collect()
});

/// The period sub-phrase of `text`.
///
/// The first named period token wins, extended over tokens that follow it
/// separated only by whitespace ("다음주 월요일").  Failing that, the first
/// date-like pattern; failing that, the whole trimmed text.
pub fn extract_period_phrase(text: &str) -> String {
    let mut matches = PERIODS.find_iter(text);
    if let Some(first) = matches.next() {
        let start = first.start();
        let mut end = first.end();
        for next in matches {
            if text[end..next.start()].trim().is_empty() {
                end = next.end();
            } else {
                break;
            }
        }
        return text[start..end].to_string();
    }

    if let Some(found) = DATE_PATTERN.find(text) {
        return found.as_str().to_string();
    }

    text.trim().to_string()
}

fn remove_periods(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for found in PERIODS.find_iter(text) {
        out.push_str(&text[last..found.start()]);
        out.push(' ');
        last = found.end();
    }
    out.push_str(&text[last..]);
    out
}

/// `text` with every date, time, duration, and period word removed and the
/// remaining whitespace collapsed.
pub fn strip_temporal(text: &str) -> String {
    let mut rest = text.to_string();
    for pattern in STRIP_PATTERNS.iter() {
        rest = pattern.replace_all(&rest, " ").into_owned();
    }
    let rest = remove_periods(&rest);

    rest.split_whitespace()
        .filter(|token| !MARKER_WORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}
