//! Two-tier intent classification.
//!
//! ```text
//! utterance ─► KeywordClassifier ──decided──► Classification{Keyword}
//!                    │ no decision
//!                    ▼
//!              ModelClassifier ────decided──► Classification{Model}
//!                    │ failure / timeout / malformed
//!                    ▼
//!              Intent::General  ────────────► Classification{Fallback}
//! ```
//!
//! [`FallbackClassifier`] composes the tiers and is the only entry point the
//! assistant uses.  It never fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use biseo_agent::{CompletionOptions, CompletionService, extract_json_object};
use biseo_store::{Clock, ContextProvider};
use chrono::TimeDelta;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{IntentError, Result};
use crate::intent::{
    Category, Classification, ClassificationSource, ClassifyRequest, Intent, ScheduleAction,
    TaskAction,
};
use crate::keywords::{self, KeywordTable};
use crate::temporal::extract_period_phrase;

// ═══════════════════════════════════════════════════════════════════════
//  Strategy seam
// ═══════════════════════════════════════════════════════════════════════

/// One classification tier.  `None` means "no decision, ask the next tier".
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, request: ClassifyRequest<'_>) -> Option<Intent>;
}

// ═══════════════════════════════════════════════════════════════════════
//  Keyword tier
// ═══════════════════════════════════════════════════════════════════════

/// Deterministic rules: image short-circuit, then the keyword table.
pub struct KeywordClassifier {
    table: KeywordTable,
    context: Arc<dyn ContextProvider>,
    clock: Arc<dyn Clock>,
    image_window: TimeDelta,
    /// When set, demoted rules (DRIVE, TASK) return no decision.
    defer_demoted: bool,
}

impl KeywordClassifier {
    pub fn new(
        context: Arc<dyn ContextProvider>,
        clock: Arc<dyn Clock>,
        image_window: Duration,
    ) -> Result<Self> {
        Ok(Self {
            table: KeywordTable::standard()?,
            context,
            clock,
            image_window: TimeDelta::from_std(image_window).unwrap_or(TimeDelta::minutes(30)),
            defer_demoted: true,
        })
    }

    /// Decide demoted categories here too.  Used when no model tier exists.
    pub fn deciding_demoted(mut self) -> Self {
        self.defer_demoted = false;
        self
    }

    async fn has_recent_image(&self, user_id: &str) -> bool {
        match self.context.last_image(user_id).await {
            Some(image) => self.clock.now() - image.at <= self.image_window,
            None => false,
        }
    }
}

#[async_trait]
impl Classifier for KeywordClassifier {
    async fn classify(&self, request: ClassifyRequest<'_>) -> Option<Intent> {
        let text = request.text.trim();

        if request.has_image_attachment {
            return Some(Intent::Image {
                prompt: text.to_string(),
                has_attachment: true,
            });
        }
        if keywords::mentions_image_edit(text) && self.has_recent_image(request.user_id).await {
            return Some(Intent::Image {
                prompt: text.to_string(),
                has_attachment: false,
            });
        }

        let hit = self.table.scan(text)?;
        if hit.demoted && self.defer_demoted {
            debug!(category = %hit.category, "demoted keyword hit, deferring");
            return None;
        }

        let intent = match hit.category {
            Category::Schedule => {
                let action = keywords::schedule_action(text);
                let content = matches!(action, ScheduleAction::Add | ScheduleAction::Update)
                    .then(|| text.to_string());
                Intent::Schedule {
                    action,
                    period: extract_period_phrase(text),
                    content,
                }
            }
            Category::Task => Intent::Task {
                action: keywords::task_action(text),
                content: text.to_string(),
            },
            Category::Drive => Intent::Drive {
                search_keyword: Some(text.to_string()),
                document_keyword: None,
            },
            Category::Help => Intent::Help,
            Category::Memory => Intent::Memory {
                query: text.to_string(),
            },
            Category::Image | Category::General => return None,
        };
        Some(intent)
    }
}

// ═══════════════════════════════════════════════════════════════════════
//  Model tier
// ═══════════════════════════════════════════════════════════════════════

const CLASSIFY_SYSTEM_PROMPT: &str = "\
당신은 개인 비서의 의도 분류기입니다. 사용자 메시지를 아래 카테고리 중 하나로 분류하세요.

- SCHEDULE: 캘린더 일정 조회/추가/삭제/수정
- TASK: 할 일 목록 조회/추가/완료
- DRIVE: 드라이브 파일 검색, 문서 내용 찾기
- IMAGE: 이미지 생성 또는 편집
- MEMORY: 예전에 나눈 대화나 기억 조회
- HELP: 사용법 안내
- GENERAL: 그 밖의 일반 대화

JSON 객체 하나로만 답하세요. 필드:
{\"category\": \"SCHEDULE|TASK|DRIVE|IMAGE|MEMORY|HELP|GENERAL\",
 \"scheduleType\": \"query|add|delete|update\",
 \"period\": \"기간 표현 원문\",
 \"content\": \"추가/수정할 내용\",
 \"taskType\": \"query|add|complete\",
 \"searchKeyword\": \"파일 이름 검색어\",
 \"documentKeyword\": \"문서 안에서 찾을 내용\",
 \"query\": \"기억 검색어\"}
해당하지 않는 필드는 생략하세요. 삭제/변경 동사가 분명하지 않으면 scheduleType 은 query 입니다.";

/// Asks a language model, with recent conversation and document/image
/// context in the prompt.
pub struct ModelClassifier {
    model: Arc<dyn CompletionService>,
    context: Arc<dyn ContextProvider>,
    history_limit: usize,
    timeout: Duration,
}

impl ModelClassifier {
    pub fn new(
        model: Arc<dyn CompletionService>,
        context: Arc<dyn ContextProvider>,
        history_limit: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            context,
            history_limit,
            timeout,
        }
    }

    async fn build_prompt(&self, request: &ClassifyRequest<'_>) -> String {
        let mut prompt = String::new();

        let turns = self
            .context
            .recent_conversations(request.user_id, self.history_limit)
            .await;
        if !turns.is_empty() {
            prompt.push_str("최근 대화:\n");
            for turn in &turns {
                prompt.push_str(&format!(
                    "사용자: {}\n비서: {}\n",
                    turn.user_text, turn.assistant_text
                ));
            }
            prompt.push('\n');
        }

        if let Some(doc) = self.context.last_document(request.user_id).await {
            prompt.push_str(&format!("최근 문서: {}", doc.title));
            if let Some(summary) = &doc.summary {
                prompt.push_str(&format!(" ({summary})"));
            }
            prompt.push('\n');
        }
        if let Some(image) = self.context.last_image(request.user_id).await {
            prompt.push_str(&format!("최근 이미지: {}\n", image.description));
        }
        if request.has_image_attachment {
            prompt.push_str("이번 메시지에 이미지가 첨부되어 있습니다.\n");
        }

        prompt.push_str(&format!("\n메시지: {}", request.text.trim()));
        prompt
    }

    async fn ask(&self, request: &ClassifyRequest<'_>) -> Result<Intent> {
        let prompt = self.build_prompt(request).await;
        let options = CompletionOptions::json().with_timeout(self.timeout);
        let call = self.model.complete(CLASSIFY_SYSTEM_PROMPT, &prompt, options);
        let answer = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| IntentError::ModelTimeout {
                seconds: self.timeout.as_secs(),
            })??;
        let object = extract_json_object(&answer)
            .ok_or_else(|| IntentError::parse("classification answer is not a JSON object"))?;
        intent_from_answer(&object, request)
    }
}

#[async_trait]
impl Classifier for ModelClassifier {
    async fn classify(&self, request: ClassifyRequest<'_>) -> Option<Intent> {
        match self.ask(&request).await {
            Ok(intent) => Some(intent),
            Err(e) => {
                warn!(error = %e, "model classification failed");
                None
            }
        }
    }
}

fn text_field(object: &Map<String, Value>, name: &str) -> Option<String> {
    object
        .get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map the model's loosely-typed answer onto an [`Intent`].
fn intent_from_answer(object: &Map<String, Value>, request: &ClassifyRequest<'_>) -> Result<Intent> {
    let text = request.text.trim();
    let category = text_field(object, "category")
        .as_deref()
        .and_then(Category::parse)
        .ok_or_else(|| IntentError::parse("classification answer has no known category"))?;

    let intent = match category {
        Category::Schedule => {
            let action = text_field(object, "scheduleType")
                .as_deref()
                .and_then(ScheduleAction::parse)
                .unwrap_or(ScheduleAction::Query);
            let content = text_field(object, "content").or_else(|| {
                matches!(action, ScheduleAction::Add | ScheduleAction::Update)
                    .then(|| text.to_string())
            });
            Intent::Schedule {
                action,
                period: text_field(object, "period").unwrap_or_else(|| extract_period_phrase(text)),
                content,
            }
        }
        Category::Task => Intent::Task {
            action: text_field(object, "taskType")
                .as_deref()
                .and_then(TaskAction::parse)
                .unwrap_or(TaskAction::Query),
            content: text_field(object, "content").unwrap_or_else(|| text.to_string()),
        },
        Category::Drive => Intent::Drive {
            search_keyword: text_field(object, "searchKeyword"),
            document_keyword: text_field(object, "documentKeyword"),
        },
        Category::Image => Intent::Image {
            prompt: text_field(object, "content").unwrap_or_else(|| text.to_string()),
            has_attachment: request.has_image_attachment,
        },
        Category::Memory => Intent::Memory {
            query: text_field(object, "query").unwrap_or_else(|| text.to_string()),
        },
        Category::Help => Intent::Help,
        Category::General => Intent::General,
    };
    Ok(intent)
}

// ═══════════════════════════════════════════════════════════════════════
//  Composition
// ═══════════════════════════════════════════════════════════════════════

struct Tier {
    source: ClassificationSource,
    classifier: Arc<dyn Classifier>,
}

/// Runs tiers in order; the first decision wins, and no decision at all
/// yields [`Intent::General`].
#[derive(Default)]
pub struct FallbackClassifier {
    tiers: Vec<Tier>,
}

impl FallbackClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(mut self, source: ClassificationSource, classifier: Arc<dyn Classifier>) -> Self {
        self.tiers.push(Tier { source, classifier });
        self
    }

    pub async fn classify(&self, request: ClassifyRequest<'_>) -> Classification {
        for tier in &self.tiers {
            if let Some(intent) = tier.classifier.classify(request).await {
                info!(
                    user_id = request.user_id,
                    category = %intent.category(),
                    source = ?tier.source,
                    "utterance classified"
                );
                return Classification {
                    intent,
                    source: tier.source,
                };
            }
        }
        info!(user_id = request.user_id, "no tier decided, falling back to GENERAL");
        Classification {
            intent: Intent::General,
            source: ClassificationSource::Fallback,
        }
    }
}
