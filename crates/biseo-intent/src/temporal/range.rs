//! Period phrases to half-open instant ranges for list queries.

use biseo_adapters::midnight;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{
    compact, day_offset, explicit_date, monday_of, resolve_date, shift, week_offset, weekday_index,
    weekday_label,
};

/// Days covered when a period phrase is not understood.
const DEFAULT_SPAN_DAYS: i64 = 7;

/// A half-open range `[start, end)` with a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRange {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub description: String,
}

impl CalendarRange {
    /// `days` whole days starting at `first`.
    pub fn days(first: NaiveDate, days: i64, tz: FixedOffset, label: &str) -> Self {
        let last = shift(first, days - 1);
        let description = if days == 1 {
            format!("{label} ({}, {})", first.format("%m/%d"), weekday_label(first))
        } else {
            format!("{label} ({} ~ {})", first.format("%m/%d"), last.format("%m/%d"))
        };
        Self {
            start: midnight(first, tz),
            end: midnight(shift(first, days), tz),
            description,
        }
    }

    pub fn contains(&self, at: DateTime<FixedOffset>) -> bool {
        self.start <= at && at < self.end
    }
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// First day of the month `delta` months away from `date`'s month.
fn month_start(date: NaiveDate, delta: i32) -> Option<NaiveDate> {
    let index = date.year() * 12 + date.month0() as i32 + delta;
    first_of_month(index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn month_range(today: NaiveDate, delta: i32, tz: FixedOffset, label: &str) -> Option<CalendarRange> {
    let first = month_start(today, delta)?;
    let next = month_start(today, delta + 1)?;
    Some(CalendarRange {
        start: midnight(first, tz),
        end: midnight(next, tz),
        description: format!("{label} ({}월)", first.month()),
    })
}

const MONTH_TOKENS: &[(&str, i32, &str)] = &[
    ("이번달", 0, "이번 달"),
    ("다음달", 1, "다음 달"),
    ("지난달", -1, "지난 달"),
    ("저번달", -1, "지난 달"),
];

const WEEK_LABELS: &[(i64, &str)] = &[(0, "이번 주"), (7, "다음 주"), (14, "다다음 주"), (-7, "지난 주")];

fn week_label(offset: i64) -> String {
    WEEK_LABELS
        .iter()
        .find(|(days, _)| *days == offset)
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| format!("{}주 후", offset / 7))
}

fn day_label(offset: i64) -> String {
    match offset {
        0 => "오늘".into(),
        1 => "내일".into(),
        2 => "모레".into(),
        -1 => "어제".into(),
        -2 => "그저께".into(),
        n if n > 0 => format!("{n}일 후"),
        n => format!("{}일 전", -n),
    }
}

/// Deterministically resolve `period` to a range relative to `now`.
///
/// Checked in order: explicit date, weekday, weekend, week, month, day
/// shift.  Anything else covers the next seven days starting today.
pub fn to_calendar_range(period: &str, now: DateTime<FixedOffset>) -> CalendarRange {
    let tz = *now.offset();
    let today = now.date_naive();
    let squeezed = compact(period);

    if let Some(date) = explicit_date(&squeezed, today) {
        return CalendarRange::days(date, 1, tz, &format!("{}월 {}일", date.month(), date.day()));
    }
    if weekday_index(&squeezed).is_some() {
        let date = resolve_date(&squeezed, today);
        return CalendarRange::days(date, 1, tz, &format!("{}요일", weekday_label(date)));
    }

    let week = week_offset(&squeezed);
    if squeezed.contains("주말") {
        let saturday = shift(monday_of(today), week.unwrap_or(0) + 5);
        return CalendarRange::days(saturday, 2, tz, "주말");
    }
    if let Some(offset) = week {
        let monday = shift(monday_of(today), offset);
        return CalendarRange::days(monday, 7, tz, &week_label(offset));
    }

    if let Some((_, delta, label)) = MONTH_TOKENS.iter().find(|(t, _, _)| squeezed.contains(t))
        && let Some(range) = month_range(today, *delta, tz, label)
    {
        return range;
    }

    if let Some(offset) = day_offset(&squeezed) {
        return CalendarRange::days(shift(today, offset), 1, tz, &day_label(offset));
    }

    CalendarRange::days(today, DEFAULT_SPAN_DAYS, tz, "앞으로 7일")
}
