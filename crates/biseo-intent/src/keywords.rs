//! Declarative keyword rules for the deterministic classification tier.
//!
//! Rules are evaluated in table order; the first category with at least one
//! hit decides.  A rule marked `demoted` still claims the utterance (so later
//! rules do not fire) but asks for the model tier to fill in the fields.

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::error::Result;
use crate::intent::{Category, ScheduleAction, TaskAction};

/// One row of the keyword table.
#[derive(Debug, Clone, Copy)]
pub struct KeywordRule {
    pub category: Category,
    pub keywords: &'static [&'static str],
    /// Hits defer to the model tier instead of deciding directly.
    pub demoted: bool,
}

/// Category rules in priority order.
pub const CATEGORY_RULES: &[KeywordRule] = &[
    KeywordRule {
        category: Category::Schedule,
        keywords: &["일정", "스케줄", "약속", "회의", "미팅", "캘린더", "달력"],
        demoted: false,
    },
    KeywordRule {
        category: Category::Drive,
        keywords: &["드라이브", "파일", "폴더", "문서 찾", "문서찾"],
        demoted: true,
    },
    KeywordRule {
        category: Category::Task,
        keywords: &["할일", "할 일", "투두", "todo", "태스크", "완료"],
        demoted: true,
    },
    KeywordRule {
        category: Category::Help,
        keywords: &["도움말", "사용법", "help"],
        demoted: false,
    },
    KeywordRule {
        category: Category::Memory,
        keywords: &["기억해", "기억나", "메모리"],
        demoted: false,
    },
];

pub const DELETE_VERBS: &[&str] = &["삭제", "취소", "지워", "지우", "빼줘", "없애"];
pub const UPDATE_VERBS: &[&str] = &["수정", "변경", "바꿔", "옮겨", "미뤄", "당겨"];
pub const ADD_VERBS: &[&str] = &["추가", "등록", "잡아", "만들어", "넣어", "생성"];

pub const TASK_COMPLETE_VERBS: &[&str] = &["완료", "끝냈", "끝났", "했어", "처리"];
pub const TASK_ADD_VERBS: &[&str] = &["추가", "등록", "넣어", "만들어"];

/// Words that make a message about a remembered image an editing request.
pub const IMAGE_EDIT_KEYWORDS: &[&str] = &[
    "이미지", "사진", "그림", "배경", "색감", "스타일", "그려", "밝게", "어둡게",
];

fn contains_any(text: &str, words: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    words.iter().any(|w| lowered.contains(w))
}

/// Schedule action named by the verbs in `text`; `Query` when none is.
///
/// Delete is checked before update and update before add, so "회의 취소하고
/// 다시 잡아줘" is never read as an insertion.
pub fn schedule_action(text: &str) -> ScheduleAction {
    if contains_any(text, DELETE_VERBS) {
        ScheduleAction::Delete
    } else if contains_any(text, UPDATE_VERBS) {
        ScheduleAction::Update
    } else if contains_any(text, ADD_VERBS) {
        ScheduleAction::Add
    } else {
        ScheduleAction::Query
    }
}

/// Task action named by the verbs in `text`; `Query` when none is.
pub fn task_action(text: &str) -> TaskAction {
    if contains_any(text, TASK_COMPLETE_VERBS) {
        TaskAction::Complete
    } else if contains_any(text, TASK_ADD_VERBS) {
        TaskAction::Add
    } else {
        TaskAction::Query
    }
}

pub fn mentions_image_edit(text: &str) -> bool {
    contains_any(text, IMAGE_EDIT_KEYWORDS)
}

/// Outcome of scanning an utterance against [`CATEGORY_RULES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordHit {
    pub category: Category,
    pub demoted: bool,
}

/// Compiled form of a rule table.
pub struct KeywordTable {
    rules: &'static [KeywordRule],
    automaton: AhoCorasick,
    /// Pattern index to rule index.
    owners: Vec<usize>,
}

impl std::fmt::Debug for KeywordTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeywordTable")
            .field("rules", &self.rules.len())
            .field("patterns", &self.owners.len())
            .finish()
    }
}

impl KeywordTable {
    pub fn new(rules: &'static [KeywordRule]) -> Result<Self> {
        let mut patterns = Vec::new();
        let mut owners = Vec::new();
        for (idx, rule) in rules.iter().enumerate() {
            for keyword in rule.keywords {
                patterns.push(*keyword);
                owners.push(idx);
            }
        }
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(true)
            .match_kind(MatchKind::LeftmostLongest)
            .build(&patterns)?;
        tracing::debug!(rules = rules.len(), patterns = patterns.len(), "keyword table built");
        Ok(Self {
            rules,
            automaton,
            owners,
        })
    }

    /// The table in [`CATEGORY_RULES`] order.
    pub fn standard() -> Result<Self> {
        Self::new(CATEGORY_RULES)
    }

    /// Highest-priority rule with at least one keyword in `text`.
    pub fn scan(&self, text: &str) -> Option<KeywordHit> {
        let best = self
            .automaton
            .find_iter(text)
            .map(|m| self.owners[m.pattern().as_usize()])
            .min()?;
        let rule = &self.rules[best];
        Some(KeywordHit {
            category: rule.category,
            demoted: rule.demoted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> KeywordTable {
        KeywordTable::standard().unwrap()
    }

    #[test]
    fn schedule_outranks_later_rules() {
        let hit = table().scan("회의 완료했어").unwrap();
        assert_eq!(hit.category, Category::Schedule);
        assert!(!hit.demoted);
    }

    #[test]
    fn drive_and_task_are_demoted() {
        let hit = table().scan("드라이브에서 보고서 파일 찾아줘").unwrap();
        assert_eq!(hit.category, Category::Drive);
        assert!(hit.demoted);

        let hit = table().scan("운동하기 완료 처리해줘").unwrap();
        assert_eq!(hit.category, Category::Task);
        assert!(hit.demoted);
    }

    #[test]
    fn ascii_keywords_ignore_case() {
        assert_eq!(table().scan("HELP").unwrap().category, Category::Help);
        assert_eq!(table().scan("내 TODO 보여줘").unwrap().category, Category::Task);
    }

    #[test]
    fn no_hit() {
        assert!(table().scan("안녕하세요").is_none());
    }

    #[test]
    fn schedule_action_defaults_to_query() {
        assert_eq!(schedule_action("오늘 일정 알려줘"), ScheduleAction::Query);
        assert_eq!(schedule_action("내일 회의 추가해줘"), ScheduleAction::Add);
        assert_eq!(schedule_action("회의 취소해줘"), ScheduleAction::Delete);
        assert_eq!(schedule_action("회의 시간 변경해줘"), ScheduleAction::Update);
        assert_eq!(schedule_action("회의 취소하고 다시 잡아줘"), ScheduleAction::Delete);
    }

    #[test]
    fn task_actions() {
        assert_eq!(task_action("운동하기 완료"), TaskAction::Complete);
        assert_eq!(task_action("할 일 추가: 장보기"), TaskAction::Add);
        assert_eq!(task_action("할 일 보여줘"), TaskAction::Query);
    }
}
