//! Classification results.
//!
//! Each category carries exactly the fields its workflow consumes, so a
//! schedule workflow can never be handed a half-filled task payload.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level category of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Schedule,
    Task,
    Drive,
    Image,
    Memory,
    Help,
    General,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Schedule => "SCHEDULE",
            Self::Task => "TASK",
            Self::Drive => "DRIVE",
            Self::Image => "IMAGE",
            Self::Memory => "MEMORY",
            Self::Help => "HELP",
            Self::General => "GENERAL",
        }
    }

    /// Parse a category name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        let found = match name.trim().to_ascii_uppercase().as_str() {
            "SCHEDULE" => Self::Schedule,
            "TASK" => Self::Task,
            "DRIVE" => Self::Drive,
            "IMAGE" => Self::Image,
            "MEMORY" => Self::Memory,
            "HELP" => Self::Help,
            "GENERAL" => Self::General,
            _ => return None,
        };
        Some(found)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleAction {
    Query,
    Add,
    Delete,
    Update,
}

impl ScheduleAction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "query" => Some(Self::Query),
            "add" => Some(Self::Add),
            "delete" => Some(Self::Delete),
            "update" => Some(Self::Update),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Query,
    Add,
    Complete,
}

impl TaskAction {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "query" => Some(Self::Query),
            "add" => Some(Self::Add),
            "complete" => Some(Self::Complete),
            _ => None,
        }
    }
}

/// What the user wants, with the fields extracted for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Schedule {
        action: ScheduleAction,
        /// Raw natural-language period ("이번주", "3월 15일").
        period: String,
        /// The utterance content for add/update.
        content: Option<String>,
    },
    Task {
        action: TaskAction,
        content: String,
    },
    Drive {
        search_keyword: Option<String>,
        document_keyword: Option<String>,
    },
    Image {
        prompt: String,
        has_attachment: bool,
    },
    Memory {
        query: String,
    },
    Help,
    General,
}

impl Intent {
    pub fn category(&self) -> Category {
        match self {
            Self::Schedule { .. } => Category::Schedule,
            Self::Task { .. } => Category::Task,
            Self::Drive { .. } => Category::Drive,
            Self::Image { .. } => Category::Image,
            Self::Memory { .. } => Category::Memory,
            Self::Help => Category::Help,
            Self::General => Category::General,
        }
    }
}

/// Which tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationSource {
    Keyword,
    Model,
    /// Neither tier decided; the intent is [`Intent::General`].
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub source: ClassificationSource,
}

impl Classification {
    pub fn category(&self) -> Category {
        self.intent.category()
    }
}

/// One utterance to classify.
#[derive(Debug, Clone, Copy)]
pub struct ClassifyRequest<'a> {
    pub user_id: &'a str,
    pub text: &'a str,
    pub has_image_attachment: bool,
}

impl<'a> ClassifyRequest<'a> {
    pub fn new(user_id: &'a str, text: &'a str) -> Self {
        Self {
            user_id,
            text,
            has_image_attachment: false,
        }
    }

    pub fn with_image(mut self) -> Self {
        self.has_image_attachment = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_serializes_with_category_tag() {
        let intent = Intent::Schedule {
            action: ScheduleAction::Add,
            period: "내일".into(),
            content: Some("내일 회의".into()),
        };
        let json = serde_json::to_value(&intent).unwrap();
        assert_eq!(json["category"], "SCHEDULE");
        assert_eq!(json["action"], "add");

        let json = serde_json::to_value(Intent::General).unwrap();
        assert_eq!(json["category"], "GENERAL");
    }

    #[test]
    fn names_parse_loosely() {
        assert_eq!(Category::parse(" task "), Some(Category::Task));
        assert_eq!(Category::parse("weather"), None);
        assert_eq!(ScheduleAction::parse("DELETE"), Some(ScheduleAction::Delete));
        assert_eq!(TaskAction::parse("complete"), Some(TaskAction::Complete));
    }
}
