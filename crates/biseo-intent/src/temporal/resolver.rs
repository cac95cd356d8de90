//! Pluggable period-to-range strategies.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use biseo_adapters::midnight;
use biseo_agent::{CompletionOptions, CompletionService, extract_json_object};
use biseo_store::TtlCache;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use tracing::{debug, warn};

use super::range::{CalendarRange, to_calendar_range};
use crate::error::{IntentError, Result};

const RANGE_CACHE_CAPACITY: u64 = 256;
const RANGE_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

const RANGE_SYSTEM_PROMPT: &str = "\
당신은 한국어 기간 표현을 ISO 8601 시간 범위로 바꾸는 도우미입니다.
규칙:
- 한 주는 월요일에 시작해 일요일에 끝납니다.
- end 는 범위에 포함되지 않는 다음 시각입니다 (하루라면 다음 날 00:00).
- 현재 시각의 시간대 오프셋을 그대로 사용하세요.
다음 JSON 객체 하나만 답하세요:
{\"start\": \"YYYY-MM-DDTHH:MM:SS+09:00\", \"end\": \"YYYY-MM-DDTHH:MM:SS+09:00\", \"description\": \"짧은 한국어 설명\"}";

/// Turns a period phrase into a half-open range.
#[async_trait]
pub trait RangeResolver: Send + Sync {
    /// Never fails; an unreadable period falls back to a default window.
    async fn resolve(&self, period: &str, now: DateTime<FixedOffset>) -> CalendarRange;
}

/// Rule-based resolution with no I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeterministicRangeResolver;

#[async_trait]
impl RangeResolver for DeterministicRangeResolver {
    async fn resolve(&self, period: &str, now: DateTime<FixedOffset>) -> CalendarRange {
        to_calendar_range(period, now)
    }
}

/// Asks the model for the range and caches answers per day and phrase.
///
/// Any failure (transport, timeout, malformed or inverted range) falls back
/// to [`to_calendar_range`].
pub struct ModelRangeResolver {
    model: Arc<dyn CompletionService>,
    cache: TtlCache<CalendarRange>,
    timeout: Duration,
}

impl ModelRangeResolver {
    pub fn new(model: Arc<dyn CompletionService>, timeout: Duration) -> Self {
        Self {
            model,
            cache: TtlCache::new("calendar-range", RANGE_CACHE_CAPACITY, RANGE_CACHE_TTL),
            timeout,
        }
    }

    pub fn cache(&self) -> &TtlCache<CalendarRange> {
        &self.cache
    }

    async fn ask(&self, period: &str, now: DateTime<FixedOffset>) -> Result<CalendarRange> {
        let user_prompt = format!(
            "현재 시각: {}\n기간 표현: {period}",
            now.format("%Y-%m-%dT%H:%M:%S%:z (%A)")
        );
        let options = CompletionOptions::json().with_timeout(self.timeout);
        let answer = self
            .model
            .complete(RANGE_SYSTEM_PROMPT, &user_prompt, options)
            .await?;
        parse_range_answer(&answer, *now.offset())
    }
}

#[async_trait]
impl RangeResolver for ModelRangeResolver {
    async fn resolve(&self, period: &str, now: DateTime<FixedOffset>) -> CalendarRange {
        let key = format!("{}|{}", now.date_naive(), period.trim());
        match self
            .cache
            .get_or_try_insert_with(&key, || self.ask(period, now))
            .await
        {
            Ok(range) => {
                debug!(period, start = %range.start, end = %range.end, "range resolved by model");
                range
            }
            Err(e) => {
                warn!(period, error = %e, "model range resolution failed, using rules");
                to_calendar_range(period, now)
            }
        }
    }
}

/// Read an instant the way models tend to write one: RFC 3339, a naive
/// local date-time, or a bare date meaning local midnight.
pub(crate) fn parse_instant(value: &str, tz: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let value = value.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant);
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return tz.from_local_datetime(&naive).single();
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|date| midnight(date, tz))
}

fn parse_range_answer(answer: &str, tz: FixedOffset) -> Result<CalendarRange> {
    let object = extract_json_object(answer)
        .ok_or_else(|| IntentError::parse("range answer is not a JSON object"))?;
    let field = |name: &str| {
        object
            .get(name)
            .and_then(|v| v.as_str())
            .and_then(|s| parse_instant(s, tz))
            .ok_or_else(|| IntentError::parse(format!("range answer has no usable `{name}`")))
    };
    let start = field("start")?;
    let end = field("end")?;
    if end <= start {
        return Err(IntentError::parse("range answer ends before it starts"));
    }
    let description = object
        .get("description")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map_or_else(
            || format!("{} ~ {}", start.format("%m/%d"), end.format("%m/%d")),
            str::to_string,
        );
    Ok(CalendarRange {
        start,
        end,
        description,
    })
}
