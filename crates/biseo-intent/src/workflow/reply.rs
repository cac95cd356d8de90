//! What a workflow hands back to the transport.

use biseo_store::StoreError;
use serde::Serialize;

use crate::error::IntentError;

pub const SESSION_EXPIRED_MESSAGE: &str = "세션이 만료되었습니다. 다시 시도해 주세요.";
pub const BACKEND_ERROR_MESSAGE: &str = "처리 중 오류가 발생했습니다. 잠시 후 다시 시도해 주세요.";
pub const PARSE_FAILURE_MESSAGE: &str = "요청을 이해하지 못했습니다. 조금 더 구체적으로 말씀해 주세요.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ParseFailure,
    NoMatch,
    SessionExpired,
    Backend,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "kind")]
pub enum Outcome {
    Success,
    Failure(FailureKind),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    #[default]
    Default,
    Primary,
    Danger,
}

/// A labeled action bound to a callback id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub callback_id: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn new(label: impl Into<String>, callback_id: impl ToString, style: ButtonStyle) -> Self {
        Self {
            label: label.into(),
            callback_id: callback_id.to_string(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    /// Pre-filled value.
    pub value: String,
    pub placeholder: Option<String>,
}

/// A modal form submitted back through `callback_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Form {
    pub title: String,
    pub callback_id: String,
    pub fields: Vec<FormField>,
}

impl Form {
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Component {
    Buttons { buttons: Vec<Button> },
    Form(Form),
}

/// A message for the user plus optional interactive components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub outcome: Outcome,
    pub message: String,
    pub components: Vec<Component>,
}

impl Reply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Success,
            message: message.into(),
            components: Vec::new(),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failure(kind),
            message: message.into(),
            components: Vec::new(),
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        if !buttons.is_empty() {
            self.components.push(Component::Buttons { buttons });
        }
        self
    }

    pub fn with_form(mut self, form: Form) -> Self {
        self.components.push(Component::Form(form));
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self.outcome {
            Outcome::Success => None,
            Outcome::Failure(kind) => Some(kind),
        }
    }

    /// All buttons across components, in order.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.components.iter().flat_map(|c| match c {
            Component::Buttons { buttons } => buttons.as_slice(),
            Component::Form(_) => &[][..],
        })
    }

    pub fn form(&self) -> Option<&Form> {
        self.components.iter().find_map(|c| match c {
            Component::Form(form) => Some(form),
            Component::Buttons { .. } => None,
        })
    }

    pub fn session_expired() -> Self {
        Self::failure(FailureKind::SessionExpired, SESSION_EXPIRED_MESSAGE)
    }

    /// Translate an engine error into the reply the user sees.
    pub fn from_error(error: &IntentError) -> Self {
        match error {
            IntentError::Store(
                StoreError::SessionNotFound { .. } | StoreError::ForeignSession { .. },
            ) => Self::session_expired(),
            IntentError::Validation { reason, .. } => {
                Self::failure(FailureKind::Validation, reason.clone())
            }
            IntentError::ParseFailed { .. } => {
                Self::failure(FailureKind::ParseFailure, PARSE_FAILURE_MESSAGE)
            }
            _ => Self::failure(FailureKind::Backend, BACKEND_ERROR_MESSAGE),
        }
    }
}

/// Shorten `title` to at most `max` characters, marking the cut with "…".
pub fn truncate_title(title: &str, max: usize) -> String {
    let title = title.trim();
    if title.chars().count() <= max {
        return title.to_string();
    }
    let kept: String = title.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use biseo_adapters::AdapterError;

    use super::*;

    #[test]
    fn errors_map_to_failure_kinds() {
        let expired = IntentError::Store(StoreError::SessionNotFound { id: "s".into() });
        assert_eq!(Reply::from_error(&expired).message, SESSION_EXPIRED_MESSAGE);

        let backend = IntentError::Adapter(AdapterError::Unavailable("down".into()));
        let reply = Reply::from_error(&backend);
        assert_eq!(reply.failure_kind(), Some(FailureKind::Backend));
        assert!(reply.message.contains("처리 중 오류"));

        let invalid = IntentError::validation("date", "날짜는 YYYY-MM-DD 형식으로 입력해 주세요.");
        let reply = Reply::from_error(&invalid);
        assert_eq!(reply.failure_kind(), Some(FailureKind::Validation));
        assert!(reply.message.contains("YYYY-MM-DD"));
    }

    #[test]
    fn titles_are_cut_by_characters() {
        assert_eq!(truncate_title("팀 회의", 30), "팀 회의");
        let long = "가".repeat(40);
        let cut = truncate_title(&long, 30);
        assert_eq!(cut.chars().count(), 30);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn empty_button_rows_are_skipped() {
        let reply = Reply::success("ok").with_buttons(Vec::new());
        assert!(reply.components.is_empty());
    }
}
