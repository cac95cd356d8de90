//! Single-event date/time parsing.

use std::sync::LazyLock;

use biseo_adapters::{EventTime, midnight};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use regex::Regex;

use super::{compact, resolve_date};

/// Length of a timed event when no duration is given, in minutes.
const DEFAULT_EVENT_MINUTES: i64 = 60;

/// Hour used when a time is implied but never stated ("몇 시", bare "오후").
const IMPLIED_HOUR: u32 = 13;

static CLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(오전|아침|새벽|오후|저녁|밤)\s*)?(\d{1,2})\s*시(?:\s*(\d{1,2})\s*분|\s*(반))?")
        .expect("literal regex")
});
static COLON_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):([0-5]\d)").expect("literal regex"));
static DURATION_HOURS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2})\s*시간(?:\s*(\d{1,2})\s*분)?").expect("literal regex")
});
static DURATION_MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*분\s*(?:동안|간)").expect("literal regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Am,
    Pm,
}

fn meridiem_of(word: &str) -> Option<Meridiem> {
    match word {
        "오전" | "아침" | "새벽" => Some(Meridiem::Am),
        "오후" | "저녁" | "밤" => Some(Meridiem::Pm),
        _ => None,
    }
}

/// First meridiem word anywhere in `text`.
fn meridiem_in(text: &str) -> Option<Meridiem> {
    ["오전", "아침", "새벽", "오후", "저녁", "밤"]
        .iter()
        .filter_map(|word| text.find(word).map(|pos| (pos, *word)))
        .min_by_key(|(pos, _)| *pos)
        .and_then(|(_, word)| meridiem_of(word))
}

/// Convert a spoken hour to 24-hour time.
///
/// Without a marker, hours 1 through 7 are read as afternoon.
fn to_24h(hour: u32, minute: u32, meridiem: Option<Meridiem>) -> Option<NaiveTime> {
    let hour = match meridiem {
        Some(Meridiem::Pm) if hour < 12 => hour + 12,
        Some(Meridiem::Am) if hour == 12 => 0,
        None if (1..=7).contains(&hour) => hour + 12,
        _ if hour == 24 => 0,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Time of day stated in `text`, if any.
fn parse_clock(text: &str) -> Option<NaiveTime> {
    for caps in CLOCK.captures_iter(text) {
        let whole = caps.get(0)?;
        // "2시간" is a duration.
        if text[whole.end()..].starts_with('간') {
            continue;
        }
        let hour: u32 = caps[2].parse().ok()?;
        let minute: u32 = match (caps.get(3), caps.get(4)) {
            (Some(m), _) => m.as_str().parse().ok()?,
            (None, Some(_)) => 30,
            (None, None) => 0,
        };
        let meridiem = caps
            .get(1)
            .and_then(|m| meridiem_of(m.as_str()))
            .or_else(|| meridiem_in(text));
        if let Some(time) = to_24h(hour, minute, meridiem) {
            return Some(time);
        }
    }

    if let Some(caps) = COLON_TIME.captures(text) {
        let hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        let hour = match meridiem_in(text) {
            Some(Meridiem::Pm) if hour < 12 => hour + 12,
            Some(Meridiem::Am) if hour == 12 => 0,
            _ => hour,
        };
        if let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) {
            return Some(time);
        }
    }

    let squeezed = compact(text);
    let bare_hour_word = squeezed.contains("몇시")
        || text
            .split_whitespace()
            .any(|token| token == "시" || token == "시에");
    if bare_hour_word || squeezed.contains("오후") {
        return NaiveTime::from_hms_opt(IMPLIED_HOUR, 0, 0);
    }
    None
}

fn parse_duration(text: &str) -> Option<TimeDelta> {
    if let Some(caps) = DURATION_HOURS.captures(text) {
        let hours: i64 = caps[1].parse().ok()?;
        let minutes: i64 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0);
        let total = TimeDelta::hours(hours) + TimeDelta::minutes(minutes);
        return (total > TimeDelta::zero()).then_some(total);
    }
    let caps = DURATION_MINUTES.captures(text)?;
    let minutes: i64 = caps[1].parse().ok()?;
    (minutes > 0).then(|| TimeDelta::minutes(minutes))
}

/// A resolved date with an optional time of day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporalExpression {
    pub date: NaiveDate,
    /// `None` for all-day expressions.
    pub time: Option<NaiveTime>,
    /// Explicit length of a timed event.
    pub duration: Option<TimeDelta>,
    pub original_phrase: String,
}

impl TemporalExpression {
    pub fn is_all_day(&self) -> bool {
        self.time.is_none()
    }

    /// Start and end ready for a calendar backend.
    ///
    /// All-day expressions end on the following date (exclusive); timed ones
    /// last `duration`, or one hour.
    pub fn event_times(&self, tz: FixedOffset) -> (EventTime, EventTime) {
        match self.time {
            None => (
                EventTime::all_day(self.date),
                EventTime::all_day(super::shift(self.date, 1)),
            ),
            Some(time) => {
                let start = self.start_instant(tz, time);
                let end = start + self
                    .duration
                    .unwrap_or(TimeDelta::minutes(DEFAULT_EVENT_MINUTES));
                (EventTime::timed(start), EventTime::timed(end))
            }
        }
    }

    fn start_instant(&self, tz: FixedOffset, time: NaiveTime) -> DateTime<FixedOffset> {
        midnight(self.date, tz) + (time - NaiveTime::MIN)
    }
}

/// Parse one event's date/time phrase relative to `now`.
///
/// Never fails: a phrase with no recognisable date resolves to today, and a
/// phrase with no time token (or with "종일") is all-day.
pub fn parse_relative_expression(phrase: &str, now: DateTime<FixedOffset>) -> TemporalExpression {
    let squeezed = compact(phrase);
    let date = resolve_date(&squeezed, now.date_naive());
    let time = if squeezed.contains("종일") {
        None
    } else {
        parse_clock(phrase)
    };
    let duration = time.and_then(|_| parse_duration(phrase));

    TemporalExpression {
        date,
        time,
        duration,
        original_phrase: phrase.trim().to_string(),
    }
}
