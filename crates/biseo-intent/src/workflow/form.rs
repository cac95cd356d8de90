//! The event edit form: building it, reading it back, and applying it.

use std::collections::HashMap;
use std::sync::LazyLock;

use biseo_adapters::{CalendarEvent, EventTime, midnight};
use chrono::{FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use regex::Regex;

use super::reply::{Form, FormField};
use crate::error::{IntentError, Result};

pub const FIELD_TITLE: &str = "title";
pub const FIELD_DATE: &str = "date";
pub const FIELD_TIME: &str = "time";

const DATE_HINT: &str = "날짜는 YYYY-MM-DD 형식으로 입력해 주세요. (예: 2026-03-15)";
const TIME_HINT: &str = "시간은 HH:MM (24시간) 형식으로 입력해 주세요. 종일 일정은 비워 두세요.";

static ISO_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("literal regex"));
static HOUR_MINUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})(?::|\.|시)(\d{1,2})분?$").expect("literal regex")
});
static HOUR_HALF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})시반$").expect("literal regex"));
static HOUR_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})시?$").expect("literal regex"));
static COMPACT_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2})(\d{2})$").expect("literal regex"));

const PM_MARKERS: &[&str] = &["오후", "저녁", "밤"];
const AM_MARKERS: &[&str] = &["오전", "아침", "새벽"];

fn time_error() -> IntentError {
    IntentError::validation(FIELD_TIME, TIME_HINT)
}

/// Normalize an informal time ("9시 20분", "9시 반", "930", "9.20", "9",
/// "오후 3시", "21:05") to a 24-hour time.
///
/// Empty input means all-day and yields `None`.  Hours are read literally
/// unless an AM/PM word is present.
pub fn normalize_time(input: &str) -> Result<Option<NaiveTime>> {
    let mut text: String = input.split_whitespace().collect();
    if text.is_empty() {
        return Ok(None);
    }

    let mut pm = None;
    for (markers, is_pm) in [(PM_MARKERS, true), (AM_MARKERS, false)] {
        if let Some(marker) = markers.iter().find(|m| text.starts_with(**m)) {
            text = text[marker.len()..].to_string();
            pm = Some(is_pm);
            break;
        }
    }

    let number = |caps: &regex::Captures<'_>, idx: usize| -> Result<u32> {
        caps[idx].parse().map_err(|_| time_error())
    };
    let (hour, minute) = if let Some(caps) = HOUR_MINUTE.captures(&text) {
        (number(&caps, 1)?, number(&caps, 2)?)
    } else if let Some(caps) = HOUR_HALF.captures(&text) {
        (number(&caps, 1)?, 30)
    } else if let Some(caps) = HOUR_ONLY.captures(&text) {
        (number(&caps, 1)?, 0)
    } else if let Some(caps) = COMPACT_CLOCK.captures(&text) {
        (number(&caps, 1)?, number(&caps, 2)?)
    } else {
        return Err(time_error());
    };

    let hour = match pm {
        Some(true) if hour < 12 => hour + 12,
        Some(false) if hour == 12 => 0,
        _ => hour,
    };
    NaiveTime::from_hms_opt(hour, minute, 0)
        .map(Some)
        .ok_or_else(time_error)
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn validate_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    if !ISO_DAY.is_match(input) {
        return Err(IntentError::validation(FIELD_DATE, DATE_HINT));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| IntentError::validation(FIELD_DATE, DATE_HINT))
}

/// A validated edit form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEdit {
    /// `None` keeps the current title.
    pub title: Option<String>,
    pub date: NaiveDate,
    /// `None` makes the event all-day.
    pub time: Option<NaiveTime>,
}

impl EventEdit {
    /// Validate submitted fields.  Nothing is sent anywhere on failure.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self> {
        let get = |name: &str| fields.get(name).map(String::as_str).unwrap_or_default();
        let title = get(FIELD_TITLE).trim();
        Ok(Self {
            title: (!title.is_empty()).then(|| title.to_string()),
            date: validate_date(get(FIELD_DATE))?,
            time: normalize_time(get(FIELD_TIME))?,
        })
    }

    /// `event` rewritten with this edit.  The id is kept; a timed event keeps
    /// its length, and an all-day one its number of days.
    pub fn apply(&self, event: &CalendarEvent, tz: FixedOffset) -> CalendarEvent {
        let (start, end) = match self.time {
            None => {
                let days = if event.is_all_day() {
                    (event.end.date() - event.start.date()).num_days().max(1)
                } else {
                    1
                };
                (
                    EventTime::all_day(self.date),
                    EventTime::all_day(self.date + TimeDelta::days(days)),
                )
            }
            Some(time) => {
                let length = if event.is_all_day() {
                    TimeDelta::hours(1)
                } else {
                    let length = event.end.instant(tz) - event.start.instant(tz);
                    if length > TimeDelta::zero() {
                        length
                    } else {
                        TimeDelta::hours(1)
                    }
                };
                let start = midnight(self.date, tz) + (time - NaiveTime::MIN);
                (EventTime::timed(start), EventTime::timed(start + length))
            }
        };
        CalendarEvent {
            id: event.id.clone(),
            summary: self.title.clone().unwrap_or_else(|| event.summary.clone()),
            description: event.description.clone(),
            start,
            end,
        }
    }
}

/// Edit form for `event`, pre-filled with its current values.
pub fn edit_form(event: &CalendarEvent, callback_id: String) -> Form {
    let time = event
        .start
        .time()
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_default();
    Form {
        title: "일정 수정".into(),
        callback_id,
        fields: vec![
            FormField {
                name: FIELD_TITLE.into(),
                label: "제목".into(),
                value: event.summary.clone(),
                placeholder: None,
            },
            FormField {
                name: FIELD_DATE.into(),
                label: "날짜".into(),
                value: event.start.date().format("%Y-%m-%d").to_string(),
                placeholder: Some("YYYY-MM-DD".into()),
            },
            FormField {
                name: FIELD_TIME.into(),
                label: "시간 (비우면 종일)".into(),
                value: time,
                placeholder: Some("HH:MM".into()),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn hm(h: u32, m: u32) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(h, m, 0)
    }

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn timed_event() -> CalendarEvent {
        let start = DateTime::parse_from_rfc3339("2026-03-04T10:00:00+09:00").unwrap();
        CalendarEvent {
            id: "evt-1".into(),
            summary: "팀 회의".into(),
            description: None,
            start: EventTime::timed(start),
            end: EventTime::timed(start + TimeDelta::minutes(90)),
        }
    }

    #[test]
    fn informal_times() {
        assert_eq!(normalize_time("9시 20분").unwrap(), hm(9, 20));
        assert_eq!(normalize_time("9시 반").unwrap(), hm(9, 30));
        assert_eq!(normalize_time("930").unwrap(), hm(9, 30));
        assert_eq!(normalize_time("0930").unwrap(), hm(9, 30));
        assert_eq!(normalize_time("9.20").unwrap(), hm(9, 20));
        assert_eq!(normalize_time("9").unwrap(), hm(9, 0));
        assert_eq!(normalize_time("21:05").unwrap(), hm(21, 5));
        assert_eq!(normalize_time("오후 3시").unwrap(), hm(15, 0));
        assert_eq!(normalize_time("오전 12시").unwrap(), hm(0, 0));
        assert_eq!(normalize_time("  ").unwrap(), None);
    }

    #[test]
    fn bad_times_are_rejected() {
        for bad in ["25:00", "9:75", "아홉시", "12345", "3pm"] {
            let err = normalize_time(bad).unwrap_err();
            assert!(matches!(err, IntentError::Validation { ref field, .. } if field == FIELD_TIME), "{bad}");
        }
    }

    #[test]
    fn dates_must_be_iso() {
        assert_eq!(
            validate_date("2026-03-15").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
        );
        for bad in ["2026/03/15", "26-03-15", "2026-02-30", "내일"] {
            assert!(validate_date(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn retiming_keeps_id_and_length() {
        let mut fields = HashMap::new();
        fields.insert(FIELD_DATE.to_string(), "2026-03-06".to_string());
        fields.insert(FIELD_TIME.to_string(), "14:00".to_string());
        let edited = EventEdit::from_fields(&fields).unwrap().apply(&timed_event(), kst());

        assert_eq!(edited.id, "evt-1");
        assert_eq!(edited.summary, "팀 회의");
        assert_eq!(edited.start.naive_local().to_string(), "2026-03-06 14:00:00");
        assert_eq!(edited.end.naive_local().to_string(), "2026-03-06 15:30:00");
    }

    #[test]
    fn empty_time_makes_all_day() {
        let mut fields = HashMap::new();
        fields.insert(FIELD_TITLE.to_string(), "워크숍".to_string());
        fields.insert(FIELD_DATE.to_string(), "2026-03-07".to_string());
        fields.insert(FIELD_TIME.to_string(), String::new());
        let edited = EventEdit::from_fields(&fields).unwrap().apply(&timed_event(), kst());

        assert!(edited.is_all_day());
        assert_eq!(edited.summary, "워크숍");
        assert_eq!(edited.end.date(), NaiveDate::from_ymd_opt(2026, 3, 8).unwrap());
    }

    #[test]
    fn form_is_prefilled() {
        let form = edit_form(&timed_event(), "schedule_update:s:0".into());
        assert_eq!(form.field(FIELD_DATE).unwrap().value, "2026-03-04");
        assert_eq!(form.field(FIELD_TIME).unwrap().value, "10:00");
    }
}
