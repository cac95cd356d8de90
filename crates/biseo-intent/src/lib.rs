//! # biseo-intent
//!
//! Korean natural-language intent resolution with interactive confirmation.
//!
//! ```text
//! utterance ─► FallbackClassifier ─► Intent ─► Schedule/TaskWorkflow ─► Reply
//!                                                   │ ambiguous
//!                                                   ▼
//!                                   Sessions ◄── ConfirmationSession
//!                                                   │ button / form
//!                                                   ▼
//!                                   Dispatcher ─► execute ─► Reply
//! ```
//!
//! The [`Assistant`] facade wires everything together.  Backends, the
//! model, conversation context, and the clock are injected.

pub mod assistant;
pub mod classifier;
pub mod config;
pub mod error;
pub mod intent;
pub mod keywords;
pub mod matching;
pub mod session;
pub mod similarity;
pub mod temporal;
pub mod workflow;

pub use assistant::{Assistant, AssistantBuilder, HELP_TEXT, InboundMessage, Response};
pub use classifier::{Classifier, FallbackClassifier, KeywordClassifier, ModelClassifier};
pub use config::{WorkflowConfig, kst};
pub use error::{IntentError, Result};
pub use intent::{
    Category, Classification, ClassificationSource, ClassifyRequest, Intent, ScheduleAction,
    TaskAction,
};
pub use matching::{CandidateMatch, Decision, MatchPolicy, decide, rank};
pub use session::{
    CallbackAction, CallbackId, ConfirmationSession, SessionKind, SessionPayload, Sessions,
};
pub use similarity::{match_score, similarity};
pub use temporal::{
    CalendarRange, DeterministicRangeResolver, ModelRangeResolver, RangeResolver,
    TemporalExpression, extract_period_phrase, parse_relative_expression, to_calendar_range,
};
pub use workflow::{
    Button, ButtonStyle, Component, Dispatcher, FailureKind, Form, FormField, Outcome, Reply,
    ScheduleWorkflow, TaskWorkflow,
};
