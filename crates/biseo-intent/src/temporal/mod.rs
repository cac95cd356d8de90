//! Korean date and time expressions.
//!
//! | Piece                       | Input                    | Output                 |
//! |-----------------------------|--------------------------|------------------------|
//! | [`parse_relative_expression`] | one event's phrase     | date + optional time   |
//! | [`to_calendar_range`]       | a period ("이번주")       | half-open instant range |
//! | [`RangeResolver`]           | a period, model-assisted | half-open instant range |
//! | [`extract_period_phrase`]   | a whole utterance        | the period sub-phrase  |
//!
//! Weeks run Monday (0) to Sunday (6) throughout.

mod expression;
mod phrase;
mod range;
mod resolver;

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, TimeDelta};
use regex::Regex;

pub use expression::{TemporalExpression, parse_relative_expression};
pub use phrase::{extract_period_phrase, strip_temporal};
pub use range::{CalendarRange, to_calendar_range};
pub use resolver::{DeterministicRangeResolver, ModelRangeResolver, RangeResolver};
pub(crate) use resolver::parse_instant;

/// Week shifts in days.  Longer tokens precede their substrings.
const WEEK_OFFSETS: &[(&str, i64)] = &[
    ("다다음주", 14),
    ("차차주", 14),
    ("다음주", 7),
    ("차주", 7),
    ("담주", 7),
    ("이번주", 0),
    ("지난주", -7),
    ("저번주", -7),
];

/// Day shifts.  Longer tokens precede their substrings.
const DAY_OFFSETS: &[(&str, i64)] = &[
    ("내일모레", 2),
    ("그저께", -2),
    ("그제", -2),
    ("모레", 2),
    ("글피", 3),
    ("내일", 1),
    ("오늘", 0),
    ("어제", -1),
];

const WEEKDAY_NAMES: [&str; 7] = ["월", "화", "수", "목", "금", "토", "일"];

static N_WEEKS_LATER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})주(?:후|뒤)").expect("literal regex"));
static N_DAYS_LATER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})일(?:후|뒤)").expect("literal regex"));
static WEEKDAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([월화수목금토일])요일").expect("literal regex"));
static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[-./](\d{1,2})[-./](\d{1,2})").expect("literal regex")
});
static MONTH_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})월(\d{1,2})일").expect("literal regex"));
static SLASH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})").expect("literal regex"));
static DAY_OF_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})일").expect("literal regex"));

/// Remove all whitespace so "다음 주" and "다음주" read the same.
pub(crate) fn compact(text: &str) -> String {
    text.split_whitespace().collect()
}

pub(crate) fn shift(date: NaiveDate, days: i64) -> NaiveDate {
    date.checked_add_signed(TimeDelta::days(days))
        .unwrap_or(date)
}

pub(crate) fn monday_of(date: NaiveDate) -> NaiveDate {
    shift(date, -i64::from(date.weekday().num_days_from_monday()))
}

pub(crate) fn weekday_label(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

/// Relative week shift named in `compact`, if any.
pub(crate) fn week_offset(compact: &str) -> Option<i64> {
    if let Some(caps) = N_WEEKS_LATER.captures(compact) {
        let weeks: i64 = caps[1].parse().ok()?;
        return Some(weeks * 7);
    }
    WEEK_OFFSETS
        .iter()
        .find(|(token, _)| compact.contains(token))
        .map(|(_, days)| *days)
}

/// Relative day shift named in `compact`, if any.
pub(crate) fn day_offset(compact: &str) -> Option<i64> {
    if let Some(caps) = N_DAYS_LATER.captures(compact) {
        return caps[1].parse().ok();
    }
    DAY_OFFSETS
        .iter()
        .find(|(token, _)| compact.contains(token))
        .map(|(_, days)| *days)
}

/// Monday-based index of the weekday named in `compact`.
pub(crate) fn weekday_index(compact: &str) -> Option<i64> {
    let caps = WEEKDAY.captures(compact)?;
    WEEKDAY_NAMES
        .iter()
        .position(|name| *name == &caps[1])
        .map(|idx| idx as i64)
}

/// `month`/`day` in the current year, or next year if already past.
fn upcoming_month_day(today: NaiveDate, month: u32, day: u32) -> Option<NaiveDate> {
    let this_year = NaiveDate::from_ymd_opt(today.year(), month, day);
    match this_year {
        Some(date) if date >= today => Some(date),
        _ => NaiveDate::from_ymd_opt(today.year() + 1, month, day),
    }
}

/// `day` of the current month, or of the next month if already past.
fn upcoming_day_of_month(today: NaiveDate, day: u32) -> Option<NaiveDate> {
    if let Some(date) = today.with_day(day)
        && date >= today
    {
        return Some(date);
    }
    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// An explicitly written calendar date in `compact`.
pub(crate) fn explicit_date(compact: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE.captures(compact) {
        let (y, m, d) = (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
        return NaiveDate::from_ymd_opt(y, m, d);
    }
    if let Some(caps) = MONTH_DAY.captures(compact) {
        return upcoming_month_day(today, caps[1].parse().ok()?, caps[2].parse().ok()?);
    }
    if let Some(caps) = SLASH_DATE.captures(compact) {
        return upcoming_month_day(today, caps[1].parse().ok()?, caps[2].parse().ok()?);
    }
    for caps in DAY_OF_MONTH.captures_iter(compact) {
        let whole = caps.get(0)?;
        let rest = &compact[whole.end()..];
        if rest.starts_with(['후', '뒤', '간']) || rest.starts_with("동안") {
            continue;
        }
        return upcoming_day_of_month(today, caps[1].parse().ok()?);
    }
    None
}

/// Resolve the date named in `compact` relative to `today`.
///
/// Priority: explicit date, then weekday (anchored to the week named, if
/// any), then week shift, then day shift, then today.
pub(crate) fn resolve_date(compact: &str, today: NaiveDate) -> NaiveDate {
    if let Some(date) = explicit_date(compact, today) {
        return date;
    }
    let week = week_offset(compact);
    if let Some(idx) = weekday_index(compact) {
        let date = shift(monday_of(today), week.unwrap_or(0) + idx);
        if week.is_none() && date < today {
            return shift(date, 7);
        }
        return date;
    }
    if let Some(days) = week {
        return shift(today, days);
    }
    if let Some(days) = day_offset(compact) {
        return shift(today, days);
    }
    today
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // 2026-03-04 is a Wednesday.
    const WED: (i32, u32, u32) = (2026, 3, 4);

    fn wed() -> NaiveDate {
        date(WED.0, WED.1, WED.2)
    }

    #[test]
    fn monday_anchor() {
        assert_eq!(monday_of(wed()), date(2026, 3, 2));
        assert_eq!(monday_of(date(2026, 3, 8)), date(2026, 3, 2));
        assert_eq!(monday_of(date(2026, 3, 2)), date(2026, 3, 2));
    }

    #[test]
    fn longer_tokens_win() {
        assert_eq!(week_offset("다다음주"), Some(14));
        assert_eq!(week_offset("차차주"), Some(14));
        assert_eq!(week_offset("3주후"), Some(21));
        assert_eq!(day_offset("내일모레"), Some(2));
        assert_eq!(day_offset("5일뒤"), Some(5));
    }

    #[test]
    fn weekday_without_week_rolls_forward() {
        // Monday already passed this week.
        assert_eq!(resolve_date("월요일", wed()), date(2026, 3, 9));
        assert_eq!(resolve_date("금요일", wed()), date(2026, 3, 6));
        assert_eq!(resolve_date("이번주월요일", wed()), date(2026, 3, 2));
        assert_eq!(resolve_date("다음주일요일", wed()), date(2026, 3, 15));
    }

    #[test]
    fn explicit_dates_roll_into_future() {
        assert_eq!(resolve_date("3월15일", wed()), date(2026, 3, 15));
        assert_eq!(resolve_date("1월2일", wed()), date(2027, 1, 2));
        assert_eq!(resolve_date("2/1", wed()), date(2027, 2, 1));
        assert_eq!(resolve_date("2일", wed()), date(2026, 4, 2));
        assert_eq!(resolve_date("2025-12-31", wed()), date(2025, 12, 31));
    }

    #[test]
    fn days_later_is_not_a_day_of_month() {
        assert_eq!(resolve_date("3일후", wed()), date(2026, 3, 7));
    }

    #[test]
    fn day_counts_are_not_a_day_of_month() {
        assert_eq!(resolve_date("내일부터3일동안출장", wed()), date(2026, 3, 5));
        assert_eq!(resolve_date("모레부터2일간휴가", wed()), date(2026, 3, 6));
        assert_eq!(explicit_date("3일동안", wed()), None);
    }

    #[test]
    fn offsets_cross_month_and_year() {
        assert_eq!(resolve_date("내일", date(2026, 12, 31)), date(2027, 1, 1));
        assert_eq!(resolve_date("다음주", date(2026, 2, 25)), date(2026, 3, 4));
        assert_eq!(resolve_date("15일", date(2026, 12, 20)), date(2027, 1, 15));
    }
}
