//! The assistant facade: classify an inbound message and run the workflow
//! it names.

use std::sync::Arc;

use biseo_adapters::{CalendarBackend, TaskBackend};
use biseo_agent::CompletionService;
use biseo_store::{Clock, ContextProvider, NoContext, SystemClock};
use serde::Serialize;
use tracing::{debug, info};

use crate::classifier::{Classifier, FallbackClassifier, KeywordClassifier, ModelClassifier};
use crate::config::WorkflowConfig;
use crate::error::Result;
use crate::intent::{Classification, ClassificationSource, ClassifyRequest, Intent, ScheduleAction, TaskAction};
use crate::session::Sessions;
use crate::temporal::{DeterministicRangeResolver, ModelRangeResolver, RangeResolver};
use crate::workflow::{Dispatcher, Reply, SchedulePlanner, ScheduleWorkflow, TaskWorkflow};

pub const HELP_TEXT: &str = "\
무엇을 도와드릴까요? 이렇게 말씀해 보세요.
• 일정: \"이번주 일정 알려줘\", \"내일 오후 3시에 팀 회의 추가해줘\", \"오늘 회의 취소해줘\", \"금요일 회식 시간 변경해줘\"
• 할 일: \"할 일 목록 보여줘\", \"할일 추가: 우유 사기, 운동하기\", \"운동하기 완료 처리해줘\"
• 여러 할 일은 줄마다 하나씩 적어 주셔도 됩니다.";

/// One message from the chat transport.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub user_id: String,
    pub text: String,
    pub has_image_attachment: bool,
}

impl InboundMessage {
    pub fn new(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            has_image_attachment: false,
        }
    }

    fn request(&self) -> ClassifyRequest<'_> {
        let request = ClassifyRequest::new(&self.user_id, &self.text);
        if self.has_image_attachment {
            request.with_image()
        } else {
            request
        }
    }
}

/// What the assistant did with a message.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub classification: Classification,
    /// `None` when the category belongs to a service outside this engine
    /// (drive search, images, memory, general chat).
    pub reply: Option<Reply>,
}

/// Classifier, workflows, and dispatcher wired over shared backends.
pub struct Assistant {
    classifier: FallbackClassifier,
    schedule: Arc<ScheduleWorkflow>,
    tasks: Arc<TaskWorkflow>,
    dispatcher: Dispatcher,
    sessions: Arc<Sessions>,
}

impl Assistant {
    pub fn builder(calendar: Arc<dyn CalendarBackend>, tasks: Arc<dyn TaskBackend>) -> AssistantBuilder {
        AssistantBuilder {
            calendar,
            tasks,
            model: None,
            context: Arc::new(NoContext),
            clock: Arc::new(SystemClock),
            config: WorkflowConfig::default(),
            sessions: None,
        }
    }

    pub async fn classify(&self, message: &InboundMessage) -> Classification {
        self.classifier.classify(message.request()).await
    }

    /// Classify `message` and run the matching workflow.
    pub async fn handle_message(&self, message: &InboundMessage) -> Response {
        let classification = self.classify(message).await;
        let reply = self.route(&classification.intent, message).await;
        if reply.is_none() {
            debug!(category = %classification.category(), "category handled elsewhere");
        }
        Response {
            classification,
            reply,
        }
    }

    async fn route(&self, intent: &Intent, message: &InboundMessage) -> Option<Reply> {
        let user = message.user_id.as_str();
        let text = message.text.as_str();
        let reply = match intent {
            Intent::Schedule {
                action,
                period,
                content,
            } => {
                let content = content.as_deref().unwrap_or(text);
                match action {
                    ScheduleAction::Query => self.schedule.query(user, period).await,
                    ScheduleAction::Add => self.schedule.add(user, content).await,
                    ScheduleAction::Delete => self.schedule.delete(user, text, period).await,
                    ScheduleAction::Update => {
                        self.schedule.find_for_update(user, content, period).await
                    }
                }
            }
            Intent::Task { action, content } => match action {
                TaskAction::Query => self.tasks.query(user).await,
                TaskAction::Add => self.tasks.add(user, content).await,
                TaskAction::Complete => self.tasks.complete(user, content).await,
            },
            Intent::Help => Reply::success(HELP_TEXT),
            Intent::Drive { .. } | Intent::Image { .. } | Intent::Memory { .. } | Intent::General => {
                return None;
            }
        };
        Some(reply)
    }

    /// Entry point for button and form callbacks.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sessions(&self) -> &Arc<Sessions> {
        &self.sessions
    }
}

/// Builder for [`Assistant`].
pub struct AssistantBuilder {
    calendar: Arc<dyn CalendarBackend>,
    tasks: Arc<dyn TaskBackend>,
    model: Option<Arc<dyn CompletionService>>,
    context: Arc<dyn ContextProvider>,
    clock: Arc<dyn Clock>,
    config: WorkflowConfig,
    sessions: Option<Arc<Sessions>>,
}

impl AssistantBuilder {
    /// Enable the model tier, model-assisted ranges, and model drafting.
    pub fn model(mut self, model: Arc<dyn CompletionService>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn context(mut self, context: Arc<dyn ContextProvider>) -> Self {
        self.context = context;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing session store instead of creating one.
    pub fn sessions(mut self, sessions: Arc<Sessions>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn build(self) -> Result<Assistant> {
        let config = self.config;
        let sessions = self
            .sessions
            .unwrap_or_else(|| Arc::new(Sessions::new(Arc::clone(&self.clock))));

        let keyword = KeywordClassifier::new(
            Arc::clone(&self.context),
            Arc::clone(&self.clock),
            config.image_context_window,
        )?;
        let (classifier, ranges): (FallbackClassifier, Arc<dyn RangeResolver>) = match &self.model {
            Some(model) => {
                let model_tier: Arc<dyn Classifier> = Arc::new(ModelClassifier::new(
                    Arc::clone(model),
                    Arc::clone(&self.context),
                    config.history_limit,
                    config.model_timeout,
                ));
                (
                    FallbackClassifier::new()
                        .tier(ClassificationSource::Keyword, Arc::new(keyword))
                        .tier(ClassificationSource::Model, model_tier),
                    Arc::new(ModelRangeResolver::new(Arc::clone(model), config.model_timeout)),
                )
            }
            None => (
                FallbackClassifier::new()
                    .tier(ClassificationSource::Keyword, Arc::new(keyword.deciding_demoted())),
                Arc::new(DeterministicRangeResolver),
            ),
        };

        let planner = SchedulePlanner::new(self.model.clone(), ranges, config.model_timeout);
        let schedule = Arc::new(ScheduleWorkflow::new(
            self.calendar,
            planner,
            Arc::clone(&sessions),
            Arc::clone(&self.clock),
            config.clone(),
        ));
        let tasks = Arc::new(TaskWorkflow::new(
            self.tasks,
            Arc::clone(&sessions),
            self.clock,
            config,
        ));
        info!(model = self.model.is_some(), "assistant ready");

        Ok(Assistant {
            classifier,
            dispatcher: Dispatcher::new(Arc::clone(&schedule), Arc::clone(&tasks)),
            schedule,
            tasks,
            sessions,
        })
    }
}

#[cfg(test)]
mod tests {
    use biseo_adapters::{MemoryCalendar, MemoryTasks};

    use super::*;
    use crate::intent::Category;

    fn offline() -> Assistant {
        Assistant::builder(Arc::new(MemoryCalendar::new()), Arc::new(MemoryTasks::new()))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn help_is_answered_locally() {
        let response = offline()
            .handle_message(&InboundMessage::new("U1", "도움말"))
            .await;
        assert_eq!(response.classification.category(), Category::Help);
        assert_eq!(response.reply.unwrap().message, HELP_TEXT);
    }

    #[tokio::test]
    async fn unrelated_chat_is_left_to_others() {
        let response = offline()
            .handle_message(&InboundMessage::new("U1", "안녕하세요"))
            .await;
        assert_eq!(response.classification.source, ClassificationSource::Fallback);
        assert!(response.reply.is_none());
    }

    #[tokio::test]
    async fn offline_mode_decides_tasks_by_keyword() {
        let response = offline()
            .handle_message(&InboundMessage::new("U1", "할일 목록 보여줘"))
            .await;
        assert_eq!(response.classification.category(), Category::Task);
        assert!(response.reply.unwrap().is_success());
    }
}
