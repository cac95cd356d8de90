//! Turning schedule utterances into backend payloads and search queries.
//!
//! The model is asked first when one is configured.  Every model path has a
//! rule-based fallback, so a planner without a model still works.

use std::sync::Arc;
use std::time::Duration;

use biseo_adapters::{EventDraft, EventTime};
use biseo_agent::{CompletionOptions, CompletionService, extract_json_object};
use chrono::{DateTime, FixedOffset, TimeDelta};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::keep_content;
use crate::error::{IntentError, Result};
use crate::keywords::{ADD_VERBS, DELETE_VERBS, UPDATE_VERBS};
use crate::temporal::{
    CalendarRange, RangeResolver, parse_instant, parse_relative_expression, strip_temporal,
};

/// Tokens that name the calendar itself rather than an event.
const FILLER_TOKENS: &[&str] = &[
    "일정", "일정을", "일정은", "일정에", "스케줄", "스케줄을", "캘린더", "캘린더에", "달력",
    "달력에", "좀", "다시", "제", "내",
];

const DRAFT_SYSTEM_PROMPT: &str = "\
사용자의 일정 추가 요청에서 캘린더 이벤트를 만드세요.
JSON 객체 하나로만 답하세요:
{\"summary\": \"일정 제목\", \"start\": \"ISO 8601\", \"end\": \"ISO 8601\", \"allDay\": false}
- 시간이 없으면 allDay 를 true 로 하고 start 는 YYYY-MM-DD 로 쓰세요.
- 시작 시간만 있으면 end 는 한 시간 뒤입니다.
- 오전/오후 표시 없이 1~7시는 오후로 해석합니다.";

const DELETE_SYSTEM_PROMPT: &str = "\
사용자의 일정 삭제/수정 요청에서 찾을 일정의 검색어와 기간 표현을 뽑으세요.
JSON 객체 하나로만 답하세요:
{\"keyword\": \"일정 제목 검색어\", \"period\": \"기간 표현 원문 (없으면 빈 문자열)\"}";

/// Event title or search keyword left after removing temporal words,
/// request verbs, filler, and trailing particles.
pub fn content_keyword(utterance: &str) -> String {
    keep_content(
        &strip_temporal(utterance),
        &[DELETE_VERBS, UPDATE_VERBS, ADD_VERBS],
        FILLER_TOKENS,
    )
}

/// Where a draft came from, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Model,
    Rules,
}

/// Builds event drafts and deletion queries for the schedule workflow.
pub struct SchedulePlanner {
    model: Option<Arc<dyn CompletionService>>,
    ranges: Arc<dyn RangeResolver>,
    timeout: Duration,
}

impl SchedulePlanner {
    pub fn new(
        model: Option<Arc<dyn CompletionService>>,
        ranges: Arc<dyn RangeResolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            ranges,
            timeout,
        }
    }

    pub fn ranges(&self) -> &Arc<dyn RangeResolver> {
        &self.ranges
    }

    async fn ask(
        &self,
        system: &str,
        utterance: &str,
        now: DateTime<FixedOffset>,
    ) -> Option<Map<String, Value>> {
        let model = self.model.as_ref()?;
        let prompt = format!(
            "현재 시각: {}\n요청: {}",
            now.format("%Y-%m-%dT%H:%M:%S%:z (%A)"),
            utterance.trim()
        );
        let options = CompletionOptions::json().with_timeout(self.timeout);
        match tokio::time::timeout(self.timeout, model.complete(system, &prompt, options)).await {
            Ok(Ok(answer)) => extract_json_object(&answer).or_else(|| {
                warn!("planner answer is not a JSON object");
                None
            }),
            Ok(Err(e)) => {
                warn!(error = %e, "planner model call failed");
                None
            }
            Err(_) => {
                warn!(seconds = self.timeout.as_secs(), "planner model call timed out");
                None
            }
        }
    }

    /// Event to insert for an add request.
    ///
    /// Fails with [`IntentError::ParseFailed`] when no title can be found.
    pub async fn draft_event(
        &self,
        utterance: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<EventDraft> {
        let from_model = match self.ask(DRAFT_SYSTEM_PROMPT, utterance, now).await {
            Some(answer) => match draft_from_answer(&answer, *now.offset()) {
                Ok(draft) => Some(draft),
                Err(e) => {
                    warn!(error = %e, "unusable draft from model, using rules");
                    None
                }
            },
            None => None,
        };
        let (draft, origin) = match from_model {
            Some(draft) => (draft, Origin::Model),
            None => (draft_by_rules(utterance, now)?, Origin::Rules),
        };
        debug!(summary = %draft.summary, ?origin, "event drafted");
        Ok(draft)
    }

    /// Search keyword and window for a delete or update request.
    pub async fn deletion_query(
        &self,
        utterance: &str,
        period: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<(String, CalendarRange)> {
        let answer = self.ask(DELETE_SYSTEM_PROMPT, utterance, now).await;
        let field = |name: &str| {
            answer
                .as_ref()
                .and_then(|a| a.get(name))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let keyword = field("keyword").unwrap_or_else(|| content_keyword(utterance));
        if keyword.is_empty() {
            return Err(IntentError::parse("no search keyword in request"));
        }
        let period = field("period").unwrap_or_else(|| period.to_string());
        let range = self.ranges.resolve(&period, now).await;
        debug!(keyword = %keyword, range = %range.description, "deletion query planned");
        Ok((keyword, range))
    }
}

fn draft_by_rules(utterance: &str, now: DateTime<FixedOffset>) -> Result<EventDraft> {
    let summary = content_keyword(utterance);
    if summary.is_empty() {
        return Err(IntentError::parse("no event title in request"));
    }
    let expression = parse_relative_expression(utterance, now);
    let (start, end) = expression.event_times(*now.offset());
    Ok(EventDraft {
        summary,
        description: None,
        start,
        end,
    })
}

fn draft_from_answer(answer: &Map<String, Value>, tz: FixedOffset) -> Result<EventDraft> {
    let text = |name: &str| {
        answer
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };
    let summary = text("summary").ok_or_else(|| IntentError::parse("draft has no summary"))?;
    let start = text("start")
        .and_then(|s| parse_instant(s, tz))
        .ok_or_else(|| IntentError::parse("draft has no usable start"))?;
    let all_day = answer.get("allDay").and_then(Value::as_bool).unwrap_or(false);

    let (start, end) = if all_day {
        let first = start.date_naive();
        let last = text("end")
            .and_then(|s| parse_instant(s, tz))
            .map(|end| end.date_naive())
            .filter(|end| *end > first)
            .unwrap_or(first + TimeDelta::days(1));
        (EventTime::all_day(first), EventTime::all_day(last))
    } else {
        let end = text("end")
            .and_then(|s| parse_instant(s, tz))
            .unwrap_or(start + TimeDelta::hours(1));
        if end <= start {
            return Err(IntentError::parse("draft ends before it starts"));
        }
        (EventTime::timed(start), EventTime::timed(end))
    };

    Ok(EventDraft {
        summary: summary.to_string(),
        description: None,
        start,
        end,
    })
}

/// A planner that never calls a model.
pub fn rules_only(ranges: Arc<dyn RangeResolver>) -> SchedulePlanner {
    SchedulePlanner::new(None, ranges, Duration::from_secs(0))
}
