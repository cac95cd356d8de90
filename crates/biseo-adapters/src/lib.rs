//! # biseo-adapters
//!
//! Remote persistence for the biseo assistant: a calendar and a to-do
//! service, each behind a narrow async trait.
//!
//! | Backend          | Trait             | Transport              |
//! |------------------|-------------------|------------------------|
//! | `GoogleCalendar` | `CalendarBackend` | Google Calendar v3 REST |
//! | `GoogleTasks`    | `TaskBackend`     | Google Tasks v1 REST    |
//! | `MemoryCalendar` | `CalendarBackend` | in-process              |
//! | `MemoryTasks`    | `TaskBackend`     | in-process              |

pub mod calendar;
pub mod error;
mod http;
pub mod memory;
pub mod tasks;
pub mod types;

pub use calendar::{CalendarBackend, GOOGLE_CALENDAR_BASE_URL, GoogleCalendar};
pub use error::{AdapterError, Result};
pub use memory::{MemoryCalendar, MemoryTasks};
pub use tasks::{GOOGLE_TASKS_BASE_URL, GoogleTasks, TaskBackend};
pub use types::{
    CalendarEvent, EventDraft, EventTime, TaskDraft, TaskItem, TaskList, TaskStatus, midnight,
};
